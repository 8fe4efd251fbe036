//! Request and response translation for CRUD actions.
//!
//! # Design
//! `RestClient` holds only the resolved REST base url. `build` turns a
//! `RestAction` into an `HttpRequest` and `parse` turns the matching
//! `HttpResponse` into a `RestResult`. The caller executes the HTTP round-trip
//! in between, so both halves stay deterministic and free of I/O apart from
//! reading the session token.

use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::action::RestAction;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::session::Session;
use crate::types::{Record, RecordId, RestResult};

pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Translator between CRUD actions and the backend's REST routes.
#[derive(Debug, Clone)]
pub struct RestClient {
    base: Url,
}

impl RestClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        Ok(Self {
            base: config.rest_base()?,
        })
    }

    /// Build the HTTP request for `action` on `resource`.
    ///
    /// The bearer token is read from `session` now; a request built while
    /// logged out carries no `authorization` header.
    pub fn build(&self, resource: &str, action: &RestAction, session: &Session) -> Result<HttpRequest, ApiError> {
        let (method, url, body) = match action {
            RestAction::GetList { pagination, sort, filter } => {
                let mut url = self.endpoint(resource, None)?;
                let sort_pair = (&sort.field, sort.order);
                let pairs = [
                    ("filter", to_json(filter)?),
                    ("page", to_json(&pagination.page)?),
                    ("perPage", to_json(&pagination.per_page)?),
                    ("sort", to_json(&sort_pair)?),
                ];
                url.query_pairs_mut().extend_pairs(pairs.iter());
                (HttpMethod::Get, url, None)
            }
            RestAction::GetOne { id } => (HttpMethod::Get, self.endpoint(resource, Some(id))?, None),
            RestAction::GetMany { ids } => {
                let mut url = self.endpoint(resource, None)?;
                append_segment(&mut url, "many")?;
                url.query_pairs_mut().append_pair("ids", &to_json(ids)?);
                (HttpMethod::Get, url, None)
            }
            RestAction::Create { data } => (HttpMethod::Post, self.endpoint(resource, None)?, Some(to_json(data)?)),
            RestAction::Update { id, data } => {
                (HttpMethod::Put, self.endpoint(resource, Some(id))?, Some(to_json(data)?))
            }
            RestAction::Delete { id } => (HttpMethod::Delete, self.endpoint(resource, Some(id))?, None),
        };

        let mut headers = vec![("accept".to_string(), "application/json".to_string())];
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        if let Some(token) = session.token()? {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }

        debug!(action = %action.kind(), method = method.as_str(), url = %url, "built request");
        Ok(HttpRequest {
            method,
            url: url.into(),
            headers,
            body,
        })
    }

    /// Interpret the response to `action`.
    pub fn parse(&self, action: &RestAction, response: HttpResponse) -> Result<RestResult, ApiError> {
        check_status(&response)?;
        match action {
            RestAction::GetList { .. } | RestAction::GetMany { .. } => {
                let body = parse_body(&response.body)?;
                let body_total = body.get("total").and_then(Value::as_u64);
                let data: Vec<Record> = from_payload(unwrap_data(body))?;
                let total = header_total(&response)
                    .or(body_total)
                    .unwrap_or(data.len() as u64);
                Ok(RestResult::Many { data, total })
            }
            RestAction::Delete { id } if response.body.trim().is_empty() => {
                let mut data = Record::new();
                data.insert("id".to_string(), to_value(id)?);
                Ok(RestResult::One { data })
            }
            RestAction::GetOne { .. }
            | RestAction::Create { .. }
            | RestAction::Update { .. }
            | RestAction::Delete { .. } => {
                let data: Record = from_payload(unwrap_data(parse_body(&response.body)?))?;
                Ok(RestResult::One { data })
            }
        }
    }

    fn endpoint(&self, resource: &str, id: Option<&RecordId>) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        append_segment(&mut url, resource)?;
        if let Some(id) = id {
            append_segment(&mut url, &id.to_string())?;
        }
        Ok(url)
    }
}

/// Map non-2xx status codes to `ApiError::Server`.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::Server {
        status: response.status,
        status_text: response.status_text(),
    })
}

fn append_segment(url: &mut Url, segment: &str) -> Result<(), ApiError> {
    url.path_segments_mut()
        .map_err(|_| ApiError::Config("rest base url cannot carry a path".to_string()))?
        .pop_if_empty()
        .push(segment);
    Ok(())
}

fn header_total(response: &HttpResponse) -> Option<u64> {
    response.header(TOTAL_COUNT_HEADER)?.trim().parse().ok()
}

/// Payload of a `{"data": ...}` envelope, or the body itself.
fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => map.remove("data").unwrap_or(Value::Null),
        other => other,
    }
}

fn parse_body(body: &str) -> Result<Value, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

fn from_payload<T: serde::de::DeserializeOwned>(payload: Value) -> Result<T, ApiError> {
    serde_json::from_value(payload).map_err(|e| ApiError::Deserialization(e.to_string()))
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string(value).map_err(|e| ApiError::Serialization(e.to_string()))
}

fn to_value<T: serde::Serialize + ?Sized>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Serialization(e.to_string()))
}
