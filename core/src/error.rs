//! Error types for the admin REST client.
//!
//! # Design
//! A single `ApiError` covers both the CRUD translators and the auth adapter
//! so the data provider can hand one error type back to the host. The
//! `Unsupported*` variants only arise at the string boundary where host tags
//! are parsed into the typed action enums; past that point dispatch is an
//! exhaustive `match`.

use thiserror::Error;

/// Errors returned by the translators, the auth adapter and the provider.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The host passed a CRUD tag outside the six recognized values.
    #[error("Unsupported fetch action type: {0}")]
    UnsupportedAction(String),

    /// The host passed an auth tag outside the four recognized values.
    #[error("Unsupported auth action type: {0}")]
    UnsupportedAuthAction(String),

    /// The parameter bag did not have the shape the action tag requires.
    #[error("invalid parameters for {action}: {message}")]
    InvalidParams { action: String, message: String },

    /// The backend answered with a status outside `[200, 300)`.
    #[error("HTTP {status}: {status_text}")]
    Server { status: u16, status_text: String },

    /// Login was rejected by the backend.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Session check found no stored token.
    #[error("No token found")]
    NoSession,

    /// A credential failure routed through the auth adapter. The token has
    /// already been cleared when `status` is 401 or 403.
    #[error("request rejected with status {status}")]
    Intercepted {
        status: u16,
        params: serde_json::Value,
    },

    /// The session was cleared or replaced while a login was in flight.
    #[error("login superseded by a later session change")]
    LoginSuperseded,

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be deserialized into the expected shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The HTTP round-trip itself failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// Missing or malformed client configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Reading or writing the token store failed.
    #[error("token store error: {0}")]
    Store(#[from] std::io::Error),
}

impl ApiError {
    /// HTTP status attached to the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } | ApiError::Intercepted { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// 401 and 403 are the statuses that end a session.
pub fn is_credential_failure(status: u16) -> bool {
    status == 401 || status == 403
}
