use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "password";

pub type Record = Map<String, Value>;

#[derive(Default)]
pub struct Store {
    accounts: HashMap<String, String>,
    tokens: HashSet<String>,
    resources: HashMap<String, BTreeMap<i64, Record>>,
    next_id: i64,
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Deserialize)]
pub struct Login {
    pub email: String,
    pub password: String,
}

pub fn app() -> Router {
    app_with_account(ADMIN_EMAIL, ADMIN_PASSWORD)
}

pub fn app_with_account(email: &str, password: &str) -> Router {
    let mut store = Store::default();
    store.accounts.insert(email.to_string(), password.to_string());
    let db: Db = Arc::new(RwLock::new(store));
    Router::new()
        .route("/auth", post(login))
        .route("/{resource}", get(list_records).post(create_record))
        .route("/{resource}/many", get(get_many))
        .route(
            "/{resource}/{id}",
            get(get_record).put(update_record).delete(delete_record),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn login(State(db): State<Db>, Json(input): Json<Login>) -> Result<Json<Value>, StatusCode> {
    let mut store = db.write().await;
    if store.accounts.get(&input.email) != Some(&input.password) {
        tracing::info!(email = %input.email, "login rejected");
        return Err(StatusCode::UNAUTHORIZED);
    }
    let token = Uuid::new_v4().simple().to_string();
    store.tokens.insert(token.clone());
    tracing::info!(email = %input.email, "login accepted");
    Ok(Json(json!({ "data": { "token": token } })))
}

/// 401 unless the request carries a bearer token issued by `/auth`.
fn authorize(store: &Store, headers: &HeaderMap) -> Result<(), StatusCode> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;
    if store.tokens.contains(token) {
        Ok(())
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

/// Query values arrive JSON-encoded, one per key.
fn decode_query(query: HashMap<String, String>) -> Result<HashMap<String, Value>, StatusCode> {
    query
        .into_iter()
        .map(|(k, v)| {
            serde_json::from_str(&v)
                .map(|value| (k, value))
                .map_err(|_| StatusCode::BAD_REQUEST)
        })
        .collect()
}

fn list_response(records: Vec<Record>, total: usize) -> Response {
    let mut response = Json(json!({ "data": records, "total": total })).into_response();
    response
        .headers_mut()
        .insert("x-total-count", HeaderValue::from(total));
    response
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

async fn list_records(
    State(db): State<Db>,
    Path(resource): Path<String>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, StatusCode> {
    let store = db.read().await;
    authorize(&store, &headers)?;
    let query = decode_query(query)?;

    let filter = query.get("filter").and_then(Value::as_object).cloned().unwrap_or_default();
    let mut records: Vec<Record> = store
        .resources
        .get(&resource)
        .map(|table| {
            table
                .values()
                .filter(|r| filter.iter().all(|(k, v)| r.get(k) == Some(v)))
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    if let Some(Value::Array(sort)) = query.get("sort") {
        if let [Value::String(field), Value::String(order)] = sort.as_slice() {
            records.sort_by(|a, b| compare(a.get(field), b.get(field)));
            if order.eq_ignore_ascii_case("DESC") {
                records.reverse();
            }
        }
    }

    let total = records.len();
    let page = query.get("page").and_then(Value::as_u64).unwrap_or(1).max(1) as usize;
    let per_page = query.get("perPage").and_then(Value::as_u64).map(|n| n as usize);
    let page_records = match per_page {
        Some(per_page) => records
            .into_iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .collect(),
        None => records,
    };

    tracing::debug!(%resource, total, "list");
    Ok(list_response(page_records, total))
}

async fn get_many(
    State(db): State<Db>,
    Path(resource): Path<String>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, StatusCode> {
    let store = db.read().await;
    authorize(&store, &headers)?;
    let query = decode_query(query)?;

    let ids: Vec<i64> = query
        .get("ids")
        .and_then(Value::as_array)
        .ok_or(StatusCode::BAD_REQUEST)?
        .iter()
        .filter_map(Value::as_i64)
        .collect();
    let records: Vec<Record> = match store.resources.get(&resource) {
        Some(table) => ids.iter().filter_map(|id| table.get(id).cloned()).collect(),
        None => Vec::new(),
    };
    let total = records.len();
    Ok(list_response(records, total))
}

async fn get_record(
    State(db): State<Db>,
    Path((resource, id)): Path<(String, i64)>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    let store = db.read().await;
    authorize(&store, &headers)?;
    store
        .resources
        .get(&resource)
        .and_then(|table| table.get(&id))
        .map(|r| Json(json!({ "data": r })))
        .ok_or(StatusCode::NOT_FOUND)
}

async fn create_record(
    State(db): State<Db>,
    Path(resource): Path<String>,
    headers: HeaderMap,
    Json(mut input): Json<Record>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let mut store = db.write().await;
    authorize(&store, &headers)?;
    store.next_id += 1;
    let id = store.next_id;
    input.insert("id".to_string(), json!(id));
    store.resources.entry(resource).or_default().insert(id, input.clone());
    Ok((StatusCode::CREATED, Json(json!({ "data": input }))))
}

async fn update_record(
    State(db): State<Db>,
    Path((resource, id)): Path<(String, i64)>,
    headers: HeaderMap,
    Json(input): Json<Record>,
) -> Result<Json<Value>, StatusCode> {
    let mut store = db.write().await;
    authorize(&store, &headers)?;
    let record = store
        .resources
        .get_mut(&resource)
        .and_then(|table| table.get_mut(&id))
        .ok_or(StatusCode::NOT_FOUND)?;
    for (k, v) in input {
        if k != "id" {
            record.insert(k, v);
        }
    }
    Ok(Json(json!({ "data": record })))
}

async fn delete_record(
    State(db): State<Db>,
    Path((resource, id)): Path<(String, i64)>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    let mut store = db.write().await;
    authorize(&store, &headers)?;
    store
        .resources
        .get_mut(&resource)
        .and_then(|table| table.remove(&id))
        .map(|r| Json(json!({ "data": r })))
        .ok_or(StatusCode::NOT_FOUND)
}
