use std::sync::Arc;

use bulk_import_client::{BulkImportClient, BulkImportError, ClientConfig, Session, SessionState};
use rmpv::Value;
use serde_json::json;
use utils::{RotatingCredentialProvider, StaticCredentialProvider};
use wiremock::matchers::{body_bytes, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> BulkImportClient {
    let config = ClientConfig::new(Arc::new(StaticCredentialProvider::new("1/abcdef"))).with_endpoint(server.uri());
    BulkImportClient::new(config).unwrap()
}

#[tokio::test]
async fn test_upload_sends_binary_part() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v3/bulk_import/upload_part/sess01/01d"))
        .and(header("authorization", "TD1 1/abcdef"))
        .and(header("content-type", "application/octet-stream"))
        .and(body_bytes(b"\x92\xa1a\x01".to_vec()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "sess01"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let session = Session::new("sess01", "mugadb", "test04");
    let res = client
        .upload_part(&session, "01d", &b"\x92\xa1a\x01"[..], 4)
        .await
        .unwrap();
    assert_eq!(res.part_id, "01d");
}

#[tokio::test]
async fn test_segments_are_percent_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v3/bulk_import/upload_part/my%20sess/p%2F1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "my sess"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let session = Session::new("my sess", "db", "tbl");
    client.upload_part(&session, "p/1", &b"x"[..], 1).await.unwrap();
}

#[tokio::test]
async fn test_freeze_perform_commit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/bulk_import/freeze/sess01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "sess01"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v3/bulk_import/perform/sess01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "sess01", "job_id": "127949"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v3/bulk_import/commit/sess01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "sess01"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut session = Session::new("sess01", "mugadb", "test04");
    client.freeze_session(&mut session).await.unwrap();
    let performed = client.perform_session(&mut session).await.unwrap();
    assert_eq!(performed.job_id.as_deref(), Some("127949"));
    client.commit_session(&mut session).await.unwrap();
    assert_eq!(session.state(), SessionState::Committed);
}

#[tokio::test]
async fn test_error_records_stream() {
    let records: Vec<Value> = (0..50)
        .map(|i| Value::Map(vec![(Value::from("row"), Value::from(i)), (Value::from("v"), Value::from("x".repeat(64)))]))
        .collect();
    let mut body = Vec::new();
    for r in &records {
        rmpv::encode::write_value(&mut body, r).unwrap();
    }

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/bulk_import/freeze/s"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "s"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v3/bulk_import/perform/s"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "s", "job_id": "1"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/bulk_import/error_records/s"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut session = Session::new("s", "db", "tbl");
    client.freeze_session(&mut session).await.unwrap();
    client.perform_session(&mut session).await.unwrap();

    let got = client.get_error_records(&session).await.unwrap().collect_all().await.unwrap();
    assert_eq!(got, records);
}

#[tokio::test]
async fn test_not_found_carries_server_detail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/bulk_import/list_parts/gone"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"message": "Bulk import session 'gone' does not exist"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.list_parts(&Session::new("gone", "db", "tbl")).await.unwrap_err();
    assert!(err.is_not_found());
    match err {
        BulkImportError::RequestFailed {
            status_code,
            status_message,
            detail,
            ..
        } => {
            assert_eq!(status_code, 404);
            assert_eq!(status_message, "Not Found");
            assert_eq!(detail, "Bulk import session 'gone' does not exist");
        },
        e => panic!("unexpected error {e:?}"),
    }
}

#[tokio::test]
async fn test_rotated_credentials_are_used() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/bulk_import/list"))
        .and(header("authorization", "TD1 second"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"bulk_imports": []})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/bulk_import/list"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "invalid api key"})))
        .expect(1)
        .mount(&server)
        .await;

    let creds = Arc::new(RotatingCredentialProvider::new("first"));
    let client = BulkImportClient::new(ClientConfig::new(creds.clone()).with_endpoint(server.uri())).unwrap();

    let err = client.list_sessions().await.unwrap_err();
    assert_eq!(err.status_code(), Some(401));
    assert!(err.to_string().contains("invalid api key"));

    creds.rotate("second");
    assert!(client.list_sessions().await.unwrap().sessions.is_empty());
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    // Nothing listens on the discard port.
    let config = ClientConfig::new(Arc::new(StaticCredentialProvider::new("k"))).with_endpoint("http://127.0.0.1:9");
    let client = BulkImportClient::new(config).unwrap();

    let err = client.list_sessions().await.unwrap_err();
    assert!(matches!(err, BulkImportError::TransportError { operation: "list sessions", .. }));
    assert_eq!(err.status_code(), None);
}
