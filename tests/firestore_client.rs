use outfit_rules::firestore::FirestoreClient;
use outfit_rules_core::collection::CollectionId;
use outfit_rules_core::contract::{DocumentStore, StoreError};
use serde_json::{json, Map, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DOCS_PATH: &str = "/v1/projects/ootd-test/databases/(default)/documents/outfit_rules";

fn client_for(server: &MockServer) -> FirestoreClient {
    FirestoreClient::new(
        reqwest::Client::new(),
        format!("{}/v1/", server.uri()),
        "ootd-test",
        "(default)",
        "test-token",
    )
}

fn document(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("documents are objects"),
    }
}

#[tokio::test]
async fn add_document_posts_encoded_fields_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(DOCS_PATH))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({
            "fields": {
                "min_temp": { "integerValue": "10" },
                "max_temp": { "integerValue": "15" },
                "items": { "arrayValue": { "values": [ { "stringValue": "jacket" } ] } }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "projects/ootd-test/databases/(default)/documents/outfit_rules/AbC123xyz",
            "fields": {},
            "createTime": "2026-10-16T09:00:00.000000Z",
            "updateTime": "2026-10-16T09:00:00.000000Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let stored = client
        .add_document(
            &CollectionId::parse("outfit_rules").unwrap(),
            &document(json!({"min_temp": 10, "max_temp": 15, "items": ["jacket"]})),
        )
        .await
        .expect("insert should succeed");

    assert_eq!(stored.id, "AbC123xyz");
    assert_eq!(
        stored.name,
        "projects/ootd-test/databases/(default)/documents/outfit_rules/AbC123xyz"
    );
    assert_eq!(
        stored.create_time.as_deref(),
        Some("2026-10-16T09:00:00.000000Z")
    );
}

#[tokio::test]
async fn api_errors_carry_status_and_google_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(DOCS_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {
                "code": 403,
                "message": "Missing or insufficient permissions.",
                "status": "PERMISSION_DENIED"
            }
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .add_document(
            &CollectionId::parse("outfit_rules").unwrap(),
            &document(json!({"min_temp": 0, "max_temp": 4})),
        )
        .await
        .unwrap_err();

    match err {
        StoreError::Api { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "Missing or insufficient permissions.");
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn unencodable_documents_never_reach_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .add_document(
            &CollectionId::parse("outfit_rules").unwrap(),
            &document(json!({"min_temp": 0, "max_temp": 4, "grid": [[1]]})),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Encode(_)));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    // Nothing listens on port 1.
    let client = FirestoreClient::new(
        reqwest::Client::new(),
        "http://127.0.0.1:1/v1",
        "ootd-test",
        "(default)",
        "test-token",
    );

    let err = client
        .add_document(
            &CollectionId::parse("outfit_rules").unwrap(),
            &document(json!({"min_temp": 0, "max_temp": 4})),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Transport(_)));
}

#[test]
fn collection_url_targets_the_configured_database() {
    let client = FirestoreClient::new(
        reqwest::Client::new(),
        "https://firestore.googleapis.com/v1",
        "ootd-project",
        "rules-db",
        "t",
    );
    assert_eq!(
        client
            .collection_url(&CollectionId::parse("outfit_rules_v2").unwrap())
            .unwrap()
            .as_str(),
        "https://firestore.googleapis.com/v1/projects/ootd-project/databases/rules-db/documents/outfit_rules_v2"
    );
}

#[test]
fn collection_url_escapes_reserved_characters() {
    let client = FirestoreClient::new(
        reqwest::Client::new(),
        "https://firestore.googleapis.com/v1/",
        "ootd-project",
        "(default)",
        "t",
    );
    let url = |id: &str| {
        client
            .collection_url(&CollectionId::parse(id).unwrap())
            .unwrap()
            .to_string()
    };
    let prefix = "https://firestore.googleapis.com/v1/projects/ootd-project/databases/(default)/documents/";

    assert_eq!(url("outfit#v2"), format!("{prefix}outfit%23v2"));
    assert_eq!(url("rules?v=2"), format!("{prefix}rules%3Fv=2"));
    assert_eq!(url("winter rules"), format!("{prefix}winter%20rules"));
}

#[tokio::test]
async fn collection_ids_with_hash_reach_the_right_collection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(
            "/v1/projects/ootd-test/databases/(default)/documents/outfit%23v2",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "projects/ootd-test/databases/(default)/documents/outfit%23v2/Doc1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let stored = client_for(&server)
        .add_document(
            &CollectionId::parse("outfit#v2").unwrap(),
            &document(json!({"min_temp": 0, "max_temp": 4})),
        )
        .await
        .expect("insert should land in outfit#v2");
    assert_eq!(stored.id, "Doc1");
}
