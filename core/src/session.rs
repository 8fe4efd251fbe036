//! Session token storage.
//!
//! # Design
//! The token lives behind the `TokenStore` trait so hosts can persist it
//! wherever they like; `FileTokenStore` keeps it across process restarts and
//! `MemoryTokenStore` is the in-process fake. `Session` wraps a store with an
//! epoch counter: every write or clear bumps it, and a login only stores its
//! token if the epoch is still the one observed when the login request was
//! built. A logout racing an in-flight login therefore wins.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::ApiError;

/// Get/set/clear access to the single persisted session token.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> io::Result<Option<String>>;
    fn set(&self, token: &str) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;
}

/// Token held in process memory only.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> io::Result<Option<String>> {
        Ok(self.token.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn set(&self, token: &str) -> io::Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Token persisted as the sole content of a file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents.trim().to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write through a temp file in the same directory, fsync, then rename,
    /// so readers see either the old token or the new one. The file is
    /// owner-only on unix.
    fn set(&self, token: &str) -> io::Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file().set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        tmp.write_all(token.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Proof of the session epoch a login request was built against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginTicket {
    epoch: u64,
}

/// Explicit session context passed to the translators and the auth adapter.
pub struct Session {
    store: Box<dyn TokenStore>,
    epoch: Mutex<u64>,
}

impl Session {
    pub fn new(store: impl TokenStore + 'static) -> Self {
        Self::from_store(Box::new(store))
    }

    pub fn from_store(store: Box<dyn TokenStore>) -> Self {
        Self {
            store,
            epoch: Mutex::new(0),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryTokenStore::new())
    }

    /// Stored token, with an empty string treated as absent.
    pub fn token(&self) -> Result<Option<String>, ApiError> {
        let token = self.store.get()?;
        Ok(token.filter(|t| !t.is_empty()))
    }

    pub fn is_authenticated(&self) -> Result<bool, ApiError> {
        Ok(self.token()?.is_some())
    }

    pub fn ticket(&self) -> LoginTicket {
        LoginTicket {
            epoch: *self.epoch.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Store `token` unless the session changed since `ticket` was issued.
    pub fn store_token(&self, ticket: LoginTicket, token: &str) -> Result<(), ApiError> {
        let mut epoch = self.epoch.lock().unwrap_or_else(PoisonError::into_inner);
        if *epoch != ticket.epoch {
            return Err(ApiError::LoginSuperseded);
        }
        self.store.set(token)?;
        *epoch += 1;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), ApiError> {
        let mut epoch = self.epoch.lock().unwrap_or_else(PoisonError::into_inner);
        *epoch += 1;
        self.store.clear()?;
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("epoch", &*self.epoch.lock().unwrap_or_else(PoisonError::into_inner))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_counts_as_absent() {
        let session = Session::new(MemoryTokenStore::with_token(""));
        assert_eq!(session.token().unwrap(), None);
        assert!(!session.is_authenticated().unwrap());
    }

    #[test]
    fn store_then_clear() {
        let session = Session::in_memory();
        let ticket = session.ticket();
        session.store_token(ticket, "abc").unwrap();
        assert_eq!(session.token().unwrap().as_deref(), Some("abc"));

        session.clear().unwrap();
        assert_eq!(session.token().unwrap(), None);
    }

    #[test]
    fn clear_supersedes_outstanding_ticket() {
        let session = Session::in_memory();
        let ticket = session.ticket();
        session.clear().unwrap();

        let err = session.store_token(ticket, "late").unwrap_err();
        assert!(matches!(err, ApiError::LoginSuperseded));
        assert_eq!(session.token().unwrap(), None);
    }

    #[test]
    fn only_one_of_two_concurrent_logins_lands() {
        let session = Session::in_memory();
        let first = session.ticket();
        let second = session.ticket();

        session.store_token(first, "one").unwrap();
        assert!(matches!(session.store_token(second, "two"), Err(ApiError::LoginSuperseded)));
        assert_eq!(session.token().unwrap().as_deref(), Some("one"));
    }

    #[test]
    fn file_store_survives_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("token");

        FileTokenStore::new(&path).set("persisted").unwrap();
        let reopened = FileTokenStore::new(&path);
        assert_eq!(reopened.get().unwrap().as_deref(), Some("persisted"));

        reopened.clear().unwrap();
        assert_eq!(reopened.get().unwrap(), None);
        // clearing twice is fine
        reopened.clear().unwrap();
    }

    #[test]
    fn file_store_overwrites_previous_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token"));
        store.set("first").unwrap();
        store.set("second").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("second"));
        // no temp files left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn file_store_token_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        FileTokenStore::new(&path).set("secret-token").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0, "token file mode {mode:o} is readable by group or others");
    }
}
