use super::*;
use crate::settings::SqliteSettingsStore;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use mockito::{Matcher, Server};
use serde_json::json;
use std::collections::BTreeMap;

const NOW: i64 = 1_700_000_000_000;
const NAME: &str = "example_api_settings";

fn test_store() -> Arc<SqliteSettingsStore> {
    let key = BASE64.encode([0u8; 32]);
    Arc::new(SqliteSettingsStore::new(":memory:", &key).unwrap())
}

fn settings(host: &str) -> SettingsRecord {
    let mut record = SettingsRecord {
        host: host.to_string(),
        endpoints: BTreeMap::from([
            ("auth".to_string(), "/a".to_string()),
            ("post".to_string(), "/p".to_string()),
        ]),
        ..Default::default()
    };
    record.auth_credentials.insert("user".to_string(), json!("u"));
    record.auth_credentials.insert("pass".to_string(), json!("p"));
    record
}

fn token(value: &str, issued_at: Option<i64>, token_type: &str) -> Token {
    Token {
        value: value.to_string(),
        issued_at,
        token_type: token_type.to_string(),
    }
}

fn manager(record: &SettingsRecord, store: Arc<SqliteSettingsStore>) -> TokenManager {
    TokenManager::new(NAME, record, store, Arc::new(FixedClock(NOW)))
}

#[test]
fn test_validity_window() {
    let t = token("abc", Some(NOW), "Bearer");
    assert!(t.is_valid_at(NOW));
    assert!(t.is_valid_at(NOW + 899_999));
    assert!(!t.is_valid_at(NOW + 900_000));
    assert!(!t.is_valid_at(NOW + 3_600_000));
}

#[test]
fn test_validity_requires_every_field() {
    assert!(!token("", Some(NOW), "Bearer").is_valid_at(NOW));
    assert!(!token("abc", None, "Bearer").is_valid_at(NOW));
    assert!(!token("abc", Some(0), "Bearer").is_valid_at(NOW));
    assert!(!token("abc", Some(NOW), "").is_valid_at(NOW));
}

#[test]
fn test_auth_response_parsing() {
    let parsed =
        Token::from_auth_response(&json!({"access_token": "T", "issued_at": 1000, "token_type": "Bearer"}))
            .unwrap();
    assert_eq!(parsed, token("T", Some(1000), "Bearer"));

    let string_time =
        Token::from_auth_response(&json!({"access_token": "T", "issued_at": "1000", "token_type": "Bearer"}))
            .unwrap();
    assert_eq!(string_time.issued_at, Some(1000));

    assert!(Token::from_auth_response(&json!({"access_token": "T", "token_type": "Bearer"})).is_none());
    assert!(Token::from_auth_response(&json!({"access_token": "", "issued_at": 1, "token_type": "Bearer"})).is_none());
    assert!(Token::from_auth_response(&json!({"error": "invalid_client"})).is_none());
    assert!(Token::from_auth_response(&json!(null)).is_none());
}

#[test]
fn test_decorate_headers() {
    let store = test_store();
    let mut record = settings("https://svc");

    let anonymous = manager(&record, store.clone());
    let headers = anonymous.decorate_headers(Headers::new());
    assert!(!headers.contains_key("authorization"));

    record.token = Some("abc".to_string());
    record.token_issued = Some(NOW);
    record.token_type = Some("Bearer".to_string());
    let authed = manager(&record, store);
    let headers = authed.decorate_headers(Headers::new());
    assert_eq!(headers["authorization"], "Bearer abc");
}

#[test]
fn test_is_valid_uses_clock() {
    let mut record = settings("https://svc");
    record.token = Some("abc".to_string());
    record.token_issued = Some(NOW - 60_000);
    record.token_type = Some("Bearer".to_string());

    assert!(manager(&record, test_store()).is_valid());

    record.token_issued = Some(NOW - 900_000);
    assert!(!manager(&record, test_store()).is_valid());
}

#[tokio::test]
async fn test_refresh_success_stores_and_persists() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/a")
        .match_body(Matcher::Json(json!({"user": "u", "pass": "p"})))
        .with_status(200)
        .with_body(r#"{"access_token":"T","issued_at":1000,"token_type":"Bearer"}"#)
        .create_async()
        .await;

    let store = test_store();
    let record = settings(&server.url());
    store.add(NAME, &record, NAME).unwrap();

    let mut tokens = manager(&record, store.clone());
    let dispatcher = HttpDispatcher::new(record.host.clone(), record.endpoints.clone()).unwrap();
    tokens.refresh(&dispatcher).await.unwrap();

    assert_eq!(tokens.token(), &token("T", Some(1000), "Bearer"));

    let stored = store.get_by_name(NAME).unwrap().unwrap();
    assert_eq!(stored.token.as_deref(), Some("T"));
    assert_eq!(stored.token_issued, Some(1000));
    assert_eq!(stored.token_type.as_deref(), Some("Bearer"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_refresh_success_creates_missing_record() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/a")
        .with_body(r#"{"access_token":"T","issued_at":1000,"token_type":"Bearer"}"#)
        .create_async()
        .await;

    let store = test_store();
    let record = settings(&server.url());
    let mut tokens = manager(&record, store.clone());
    let dispatcher = HttpDispatcher::new(record.host.clone(), record.endpoints.clone()).unwrap();
    tokens.refresh(&dispatcher).await.unwrap();

    let stored = store.get_by_name(NAME).unwrap().unwrap();
    assert_eq!(stored.host, server.url());
    assert_eq!(stored.endpoints, record.endpoints);
    assert_eq!(stored.auth_credentials, record.auth_credentials);
    assert_eq!(stored.token.as_deref(), Some("T"));
    assert_eq!(store.label(NAME).unwrap().as_deref(), Some(NAME));
}

#[tokio::test]
async fn test_refresh_failure_clears_and_persists() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/a")
        .with_status(401)
        .with_body(r#"{"error":"invalid_client"}"#)
        .create_async()
        .await;

    let store = test_store();
    let mut record = settings(&server.url());
    record.token = Some("stale".to_string());
    record.token_issued = Some(NOW - 1_000_000);
    record.token_type = Some("Bearer".to_string());
    store.add(NAME, &record, NAME).unwrap();

    let mut tokens = manager(&record, store.clone());
    let dispatcher = HttpDispatcher::new(record.host.clone(), record.endpoints.clone()).unwrap();
    let err = tokens.refresh(&dispatcher).await.unwrap_err();

    match err {
        SyncError::Auth(body) => assert_eq!(body, r#"{"error":"invalid_client"}"#),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(tokens.token(), &Token::default());

    let stored = store.get_by_name(NAME).unwrap().unwrap();
    assert_eq!(stored.token.as_deref(), Some(""));
    assert_eq!(stored.token_issued, None);
    assert_eq!(stored.token_type.as_deref(), Some(""));
}

#[tokio::test]
async fn test_refresh_failure_without_record_writes_nothing() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/a")
        .with_body(r#"{"access_token":"T"}"#)
        .create_async()
        .await;

    let store = test_store();
    let record = settings(&server.url());
    let mut tokens = manager(&record, store.clone());
    let dispatcher = HttpDispatcher::new(record.host.clone(), record.endpoints.clone()).unwrap();

    assert!(tokens.refresh(&dispatcher).await.is_err());
    assert!(store.get_by_name(NAME).unwrap().is_none());
}

#[tokio::test]
async fn test_refresh_without_auth_endpoint() {
    let store = test_store();
    let mut record = settings("https://svc");
    record.endpoints.remove("auth");

    let mut tokens = manager(&record, store);
    let dispatcher = HttpDispatcher::new(record.host.clone(), record.endpoints.clone()).unwrap();
    let err = tokens.refresh(&dispatcher).await.unwrap_err();

    assert!(matches!(err, SyncError::Auth(_)));
    assert!(err.to_string().contains("auth"));
}
