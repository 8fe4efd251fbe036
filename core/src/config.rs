//! Client configuration.
//!
//! The backend origin is the only required setting. Hosts either build a
//! `ClientConfig` directly or read it from the environment.

use std::env;
use std::path::PathBuf;

use url::Url;

use crate::error::ApiError;
use crate::session::{FileTokenStore, MemoryTokenStore, Session};

pub const ENV_API_URL: &str = "ADMIN_API_URL";
pub const ENV_REST_PREFIX: &str = "ADMIN_REST_PREFIX";
pub const ENV_AUTH_PATH: &str = "ADMIN_AUTH_PATH";
pub const ENV_TOKEN_FILE: &str = "ADMIN_TOKEN_FILE";

pub const DEFAULT_AUTH_PATH: &str = "/auth";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: Url,
    rest_prefix: String,
    auth_path: String,
    token_file: Option<PathBuf>,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::Config(format!("base url {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Config(format!("base url {base_url} cannot carry a path")));
        }
        Ok(Self {
            base_url,
            rest_prefix: String::new(),
            auth_path: DEFAULT_AUTH_PATH.to_string(),
            token_file: None,
        })
    }

    /// Read `ADMIN_API_URL` (required) and the optional overrides.
    pub fn from_env() -> Result<Self, ApiError> {
        let base_url = env::var(ENV_API_URL)
            .map_err(|_| ApiError::Config(format!("{ENV_API_URL} is not set")))?;
        let mut config = Self::new(&base_url)?;
        if let Ok(prefix) = env::var(ENV_REST_PREFIX) {
            config = config.with_rest_prefix(&prefix);
        }
        if let Ok(path) = env::var(ENV_AUTH_PATH) {
            config = config.with_auth_path(&path);
        }
        if let Ok(file) = env::var(ENV_TOKEN_FILE) {
            config = config.with_token_file(file);
        }
        Ok(config)
    }

    /// Path segments placed between the origin and every resource name,
    /// e.g. `/rest/superadmin`.
    pub fn with_rest_prefix(mut self, prefix: &str) -> Self {
        self.rest_prefix = prefix.to_string();
        self
    }

    pub fn with_auth_path(mut self, path: &str) -> Self {
        self.auth_path = path.to_string();
        self
    }

    pub fn with_token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_file = Some(path.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base for resource paths: the origin plus the rest prefix segments,
    /// without a trailing empty segment.
    pub fn rest_base(&self) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ApiError::Config(format!("base url {} cannot carry a path", self.base_url)))?;
            segments.pop_if_empty();
            segments.extend(self.rest_prefix.split('/').filter(|s| !s.is_empty()));
        }
        Ok(url)
    }

    /// Login endpoint, resolved against the base url the way a relative
    /// reference would be.
    pub fn auth_url(&self) -> Result<Url, ApiError> {
        self.base_url
            .join(&self.auth_path)
            .map_err(|e| ApiError::Config(format!("auth path {:?}: {e}", self.auth_path)))
    }

    /// Session backed by the configured token file, or by memory when none
    /// is configured.
    pub fn session(&self) -> Session {
        match &self.token_file {
            Some(path) => Session::new(FileTokenStore::new(path.clone())),
            None => Session::new(MemoryTokenStore::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unparseable_base_url() {
        assert!(matches!(ClientConfig::new("not a url"), Err(ApiError::Config(_))));
        assert!(matches!(ClientConfig::new("mailto:admin@example.com"), Err(ApiError::Config(_))));
    }

    #[test]
    fn rest_base_appends_prefix_segments() {
        let config = ClientConfig::new("http://localhost:3000/").unwrap().with_rest_prefix("/rest/superadmin/");
        assert_eq!(config.rest_base().unwrap().as_str(), "http://localhost:3000/rest/superadmin");
    }

    #[test]
    fn rest_base_without_prefix_is_origin() {
        let config = ClientConfig::new("http://localhost:3000").unwrap();
        assert_eq!(config.rest_base().unwrap().path(), "/");
    }

    #[test]
    fn auth_path_replaces_base_path() {
        let config = ClientConfig::new("http://localhost:3000/api/").unwrap();
        assert_eq!(config.auth_url().unwrap().as_str(), "http://localhost:3000/auth");
    }

    #[test]
    fn token_file_selects_durable_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        let config = ClientConfig::new("http://localhost:3000").unwrap().with_token_file(&path);

        let session = config.session();
        session.store_token(session.ticket(), "t0k3n").unwrap();

        let reopened = config.session();
        assert_eq!(reopened.token().unwrap().as_deref(), Some("t0k3n"));
    }
}
