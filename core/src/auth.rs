//! Token authentication adapter.
//!
//! # Design
//! Login is split like the CRUD operations: `build_login` produces the
//! request plus a `LoginTicket`, `parse_login` consumes the response and
//! stores the token only if the session was not changed in the meantime.
//! Logout, error interception and session check need no network and act on
//! the `Session` directly.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{is_credential_failure, ApiError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::session::{LoginTicket, Session};

/// Login form input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    data: TokenPayload,
}

#[derive(Deserialize)]
struct TokenPayload {
    token: String,
}

#[derive(Deserialize)]
struct ErrorParams {
    status: u16,
}

/// The four auth actions a host can request.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthAction {
    Login(Credentials),
    Logout,
    /// A failed request reported by the host; `params` is echoed back in
    /// the resulting error.
    Error { status: u16, params: Value },
    Check,
}

impl AuthAction {
    pub fn from_parts(tag: &str, params: Value) -> Result<Self, ApiError> {
        match tag {
            "AUTH_LOGIN" => serde_json::from_value(params)
                .map(AuthAction::Login)
                .map_err(|e| invalid(tag, e)),
            "AUTH_LOGOUT" => Ok(AuthAction::Logout),
            "AUTH_ERROR" => {
                let ErrorParams { status } = serde_json::from_value(params.clone()).map_err(|e| invalid(tag, e))?;
                Ok(AuthAction::Error { status, params })
            }
            "AUTH_CHECK" => Ok(AuthAction::Check),
            other => Err(ApiError::UnsupportedAuthAction(other.to_string())),
        }
    }
}

fn invalid(tag: &str, e: serde_json::Error) -> ApiError {
    ApiError::InvalidParams {
        action: tag.to_string(),
        message: e.to_string(),
    }
}

/// Login/logout/check against the backend's auth endpoint.
#[derive(Debug, Clone)]
pub struct AuthClient {
    auth_url: Url,
}

impl AuthClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        Ok(Self {
            auth_url: config.auth_url()?,
        })
    }

    pub fn build_login(&self, credentials: &Credentials, session: &Session) -> Result<(HttpRequest, LoginTicket), ApiError> {
        let body = serde_json::to_string(&LoginBody {
            email: &credentials.username,
            password: &credentials.password,
        })
        .map_err(|e| ApiError::Serialization(e.to_string()))?;
        let request = HttpRequest {
            method: HttpMethod::Post,
            url: self.auth_url.to_string(),
            headers: vec![
                ("accept".to_string(), "application/json".to_string()),
                ("content-type".to_string(), "application/json".to_string()),
            ],
            body: Some(body),
        };
        Ok((request, session.ticket()))
    }

    pub fn parse_login(&self, ticket: LoginTicket, response: HttpResponse, session: &Session) -> Result<(), ApiError> {
        if !response.is_success() {
            return Err(ApiError::Authentication(response.status_text()));
        }
        let LoginResponse { data } =
            serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))?;
        if data.token.is_empty() {
            return Err(ApiError::Deserialization("login response carried an empty token".to_string()));
        }
        match session.store_token(ticket, &data.token) {
            Ok(()) => {
                info!("logged in");
                Ok(())
            }
            Err(ApiError::LoginSuperseded) => {
                warn!("session changed while login was in flight; discarding token");
                Err(ApiError::LoginSuperseded)
            }
            Err(e) => Err(e),
        }
    }

    pub fn logout(&self, session: &Session) -> Result<(), ApiError> {
        session.clear()?;
        info!("logged out");
        Ok(())
    }

    /// Route a failed request through the adapter. Clears the session on 401
    /// and 403 and returns `Intercepted` carrying `params`, or the store error
    /// when the token could not be cleared.
    pub fn intercept(&self, session: &Session, status: u16, params: Value) -> ApiError {
        if is_credential_failure(status) {
            warn!(status, "credentials rejected; clearing session");
            if let Err(e) = session.clear() {
                warn!(error = %e, "failed to clear session token");
                return e;
            }
        }
        ApiError::Intercepted { status, params }
    }

    pub fn check(&self, session: &Session) -> Result<(), ApiError> {
        if session.is_authenticated()? {
            Ok(())
        } else {
            Err(ApiError::NoSession)
        }
    }
}
