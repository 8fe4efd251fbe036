//! REST data provider core for an admin front-end.
//!
//! # Overview
//! Translates the generic CRUD vocabulary (list, get-one, get-many, create,
//! update, delete) into HTTP requests against a REST backend, translates the
//! responses back into normalized results, and handles token authentication.
//!
//! # Design
//! - `RestClient` and `AuthClient` are split into `build_*` (produces a
//!   request) and `parse_*` (consumes a response) so the I/O boundary is
//!   explicit; a `Transport` performs the round-trip in between.
//! - The session token is reached only through an explicit `Session` wrapping
//!   an injected `TokenStore`.
//! - Host tags are parsed once into closed enums (`RestAction`,
//!   `AuthAction`); everything downstream matches exhaustively.

pub mod action;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod provider;
pub mod session;
pub mod transport;
pub mod types;

pub use action::{ActionKind, RestAction};
pub use auth::{AuthAction, AuthClient, Credentials};
pub use client::RestClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use crate::http::{HttpMethod, HttpRequest, HttpResponse};
pub use provider::DataProvider;
pub use session::{FileTokenStore, LoginTicket, MemoryTokenStore, Session, TokenStore};
pub use transport::{Transport, UreqTransport};
pub use types::{Pagination, Record, RecordId, RestResult, Sort, SortOrder};
