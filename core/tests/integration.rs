//! Full login, CRUD and logout lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every provider
//! operation over real HTTP through `UreqTransport`, so request building,
//! the transport and response parsing are checked end-to-end.

use std::sync::Arc;

use admin_rest_core::{ApiError, ClientConfig, DataProvider, FileTokenStore, RestResult, Session, UreqTransport};
use serde_json::{json, Value};

fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn login_params() -> Value {
    json!({"username": mock_server::ADMIN_EMAIL, "password": mock_server::ADMIN_PASSWORD})
}

fn data(result: RestResult) -> Value {
    serde_json::to_value(result).unwrap()["data"].clone()
}

#[test]
fn crud_lifecycle() {
    let base_url = start_server();
    let config = ClientConfig::new(&base_url).unwrap();
    let provider = DataProvider::new(&config, Arc::new(Session::in_memory()), UreqTransport::new()).unwrap();

    // Step 1: logged out — check fails and resource calls are rejected.
    assert!(matches!(provider.auth_request("AUTH_CHECK", json!({})), Err(ApiError::NoSession)));
    let err = provider.rest_request("GET_ONE", "user", json!({"id": 1})).unwrap_err();
    assert!(matches!(err, ApiError::Intercepted { status: 401, .. }));

    // Step 2: wrong password.
    let err = provider
        .auth_request("AUTH_LOGIN", json!({"username": mock_server::ADMIN_EMAIL, "password": "wrong"}))
        .unwrap_err();
    assert!(matches!(err, ApiError::Authentication(ref text) if text == "Unauthorized"));

    // Step 3: login.
    provider.auth_request("AUTH_LOGIN", login_params()).unwrap();
    provider.auth_request("AUTH_CHECK", json!({})).unwrap();

    // Step 4: create two users.
    let created = data(
        provider
            .rest_request(
                "CREATE",
                "user",
                json!({"data": {"email": "user@example.com", "name": "Example User"}}),
            )
            .unwrap(),
    );
    assert_eq!(created["name"], "Example User");
    let id = created["id"].as_i64().unwrap();
    let other = data(
        provider
            .rest_request("CREATE", "user", json!({"data": {"email": "b@example.com", "name": "Another"}}))
            .unwrap(),
    );
    let other_id = other["id"].as_i64().unwrap();

    // Step 5: get one.
    let fetched = data(provider.rest_request("GET_ONE", "user", json!({"id": id})).unwrap());
    assert_eq!(fetched, created);

    // Step 6: update.
    let updated = data(
        provider
            .rest_request("UPDATE", "user", json!({"id": id, "data": {"name": "Renamed"}}))
            .unwrap(),
    );
    assert_eq!(updated["name"], "Renamed");
    assert_eq!(updated["email"], "user@example.com");

    // Step 7: list, sorted descending by name, one per page.
    let result = provider
        .rest_request(
            "GET_LIST",
            "user",
            json!({
                "pagination": {"page": 1, "perPage": 1},
                "sort": {"field": "name", "order": "DESC"},
                "filter": {}
            }),
        )
        .unwrap();
    let (records, total) = result.into_records().unwrap();
    assert_eq!(total, 2);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["name"], "Renamed");

    // Step 8: get many, in request order.
    let (records, total) = provider
        .rest_request("GET_MANY", "user", json!({"ids": [other_id, id]}))
        .unwrap()
        .into_records()
        .unwrap();
    assert_eq!(total, 2);
    assert_eq!(records[0]["id"], other_id);
    assert_eq!(records[1]["id"], id);

    // Step 9: delete, then get after delete is a 404.
    let deleted = data(provider.rest_request("DELETE", "user", json!({"id": id})).unwrap());
    assert_eq!(deleted["name"], "Renamed");
    let err = provider.rest_request("GET_ONE", "user", json!({"id": id})).unwrap_err();
    assert!(matches!(err, ApiError::Server { status: 404, .. }));
    provider.auth_request("AUTH_CHECK", json!({})).unwrap();

    // Step 10: logout; the next call is rejected.
    provider.auth_request("AUTH_LOGOUT", json!({})).unwrap();
    let err = provider.rest_request("GET_ONE", "user", json!({"id": other_id})).unwrap_err();
    assert!(matches!(err, ApiError::Intercepted { status: 401, .. }));
}

#[test]
fn stale_token_is_cleared_on_401() {
    let base_url = start_server();
    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("token");
    std::fs::write(&token_file, "revoked-token").unwrap();

    let config = ClientConfig::new(&base_url).unwrap();
    let session = Arc::new(Session::new(FileTokenStore::new(&token_file)));
    let provider = DataProvider::new(&config, session, UreqTransport::new()).unwrap();
    provider.auth_request("AUTH_CHECK", json!({})).unwrap();

    let err = provider.rest_request("GET_ONE", "user", json!({"id": 1})).unwrap_err();
    assert!(matches!(err, ApiError::Intercepted { status: 401, .. }));
    assert!(!token_file.exists());
    assert!(matches!(provider.auth_request("AUTH_CHECK", json!({})), Err(ApiError::NoSession)));
}

#[test]
fn token_file_keeps_session_across_providers() {
    let base_url = start_server();
    let dir = tempfile::tempdir().unwrap();
    let config = ClientConfig::new(&base_url).unwrap().with_token_file(dir.path().join("token"));

    let first = DataProvider::from_config(&config).unwrap();
    first.auth_request("AUTH_LOGIN", login_params()).unwrap();
    drop(first);

    let second = DataProvider::from_config(&config).unwrap();
    second.auth_request("AUTH_CHECK", json!({})).unwrap();
    let created = data(second.rest_request("CREATE", "post", json!({"data": {"title": "hi"}})).unwrap());
    assert_eq!(created["title"], "hi");
}
