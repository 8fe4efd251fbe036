//! Host-facing entry points.
//!
//! `DataProvider` is what an admin front-end plugs in: one function for CRUD
//! actions and one for auth actions, both taking the host's string tag and
//! JSON parameters. The typed variants `dispatch` and `authenticate` skip the
//! tag parsing. A 401 or 403 from a CRUD call is routed through the auth
//! adapter, which clears the session before the failure is returned.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::action::RestAction;
use crate::auth::{AuthAction, AuthClient};
use crate::client::RestClient;
use crate::config::ClientConfig;
use crate::error::{is_credential_failure, ApiError};
use crate::session::Session;
use crate::transport::{Transport, UreqTransport};
use crate::types::RestResult;

pub struct DataProvider<T = UreqTransport> {
    rest: RestClient,
    auth: AuthClient,
    session: Arc<Session>,
    transport: T,
}

impl DataProvider<UreqTransport> {
    /// Provider over HTTP with the session the config describes.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::new(config, Arc::new(config.session()), UreqTransport::new())
    }
}

impl<T: Transport> DataProvider<T> {
    pub fn new(config: &ClientConfig, session: Arc<Session>, transport: T) -> Result<Self, ApiError> {
        Ok(Self {
            rest: RestClient::new(config)?,
            auth: AuthClient::new(config)?,
            session,
            transport,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// REST client entry point: `(tag, resource, params) -> result`.
    pub fn rest_request(&self, tag: &str, resource: &str, params: Value) -> Result<RestResult, ApiError> {
        let action = RestAction::from_parts(tag, params)?;
        self.dispatch(resource, &action)
    }

    pub fn dispatch(&self, resource: &str, action: &RestAction) -> Result<RestResult, ApiError> {
        let request = self.rest.build(resource, action, &self.session)?;
        let response = self.transport.execute(request)?;
        match self.rest.parse(action, response) {
            Err(ApiError::Server { status, status_text }) if is_credential_failure(status) => {
                let params = json!({ "status": status, "message": status_text });
                Err(self.auth.intercept(&self.session, status, params))
            }
            other => other,
        }
    }

    /// Auth client entry point: `(tag, params) -> ()`.
    pub fn auth_request(&self, tag: &str, params: Value) -> Result<(), ApiError> {
        let action = AuthAction::from_parts(tag, params)?;
        self.authenticate(action)
    }

    pub fn authenticate(&self, action: AuthAction) -> Result<(), ApiError> {
        match action {
            AuthAction::Login(credentials) => {
                let (request, ticket) = self.auth.build_login(&credentials, &self.session)?;
                let response = self.transport.execute(request)?;
                self.auth.parse_login(ticket, response, &self.session)
            }
            AuthAction::Logout => self.auth.logout(&self.session),
            AuthAction::Error { status, params } => Err(self.auth.intercept(&self.session, status, params)),
            AuthAction::Check => self.auth.check(&self.session),
        }
    }
}
