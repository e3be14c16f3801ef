//! HTTP behaviour of the material client against a mock server

use serde_json::json;
use spark_ingest::config::ApiConfig;
use spark_ingest::providers::AuthTokens;
use spark_ingest::{
    CreateMaterialRequest, Error, MaterialClient, MaterialDetails, MaterialStatus, TextChunk,
};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> ApiConfig {
    ApiConfig {
        base_url: format!("{}/api", server.uri()),
        timeout_secs: 5,
        max_retries: 0,
        poll_interval_ms: 10,
        max_polls: 5,
    }
}

fn request() -> CreateMaterialRequest {
    CreateMaterialRequest::new(
        MaterialDetails::new("Cell Biology", "Mitosis"),
        vec![TextChunk::new("Cells divide.", 0)],
    )
}

fn tokens() -> Option<AuthTokens> {
    Some(AuthTokens::new("old").with_refresh_token("refresh-1"))
}

fn accepted(id: &str) -> ResponseTemplate {
    ResponseTemplate::new(201).set_body_json(json!({ "_id": id, "status": "processing" }))
}

#[tokio::test]
async fn submits_payload_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/materials"))
        .and(header("authorization", "Bearer old"))
        .and(body_json(json!({
            "title": "Cell Biology",
            "topic": "Mitosis",
            "textChunks": [{ "content": "Cells divide.", "order": 0, "wordCount": 2 }]
        })))
        .respond_with(accepted("m1"))
        .expect(1)
        .mount(&server)
        .await;

    let client = MaterialClient::new(&config(&server), tokens()).unwrap();
    let receipt = client.create_material(&request()).await.unwrap();

    assert_eq!(receipt.id, "m1");
    assert_eq!(receipt.status, MaterialStatus::Processing);
}

#[tokio::test]
async fn expired_token_is_refreshed_and_request_resent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/materials"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(body_json(json!({ "refreshToken": "refresh-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accessToken": "new" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/materials"))
        .and(header("authorization", "Bearer new"))
        .respond_with(accepted("m2"))
        .expect(1)
        .mount(&server)
        .await;

    let client = MaterialClient::new(&config(&server), tokens()).unwrap();
    let receipt = client.create_material(&request()).await.unwrap();

    assert_eq!(receipt.id, "m2");
    assert_eq!(client.tokens().access_token().as_deref(), Some("new"));
    assert_eq!(client.tokens().refresh_token().as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn concurrent_unauthorized_requests_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "accessToken": "new" }))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;
    for id in ["a", "b", "c", "d"] {
        Mock::given(method("GET"))
            .and(path(format!("/api/materials/{}", id)))
            .and(header("authorization", "Bearer new"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "id": id, "status": "ready" })),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = MaterialClient::new(&config(&server), tokens()).unwrap();
    let (a, b, c, d) = tokio::join!(
        client.get_material("a"),
        client.get_material("b"),
        client.get_material("c"),
        client.get_material("d"),
    );

    for (receipt, id) in [a, b, c, d].into_iter().zip(["a", "b", "c", "d"]) {
        let receipt = receipt.unwrap();
        assert_eq!(receipt.id, id);
        assert_eq!(receipt.status, MaterialStatus::Ready);
    }
}

#[tokio::test]
async fn rejected_refresh_signs_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/materials"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let client = MaterialClient::new(&config(&server), tokens()).unwrap();
    let err = client.create_material(&request()).await.unwrap_err();

    assert!(matches!(err, Error::Auth(_)));
    assert_eq!(client.tokens().access_token(), None);
}

#[tokio::test]
async fn missing_refresh_token_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/materials"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = MaterialClient::new(&config(&server), Some(AuthTokens::new("old"))).unwrap();
    let err = client.create_material(&request()).await.unwrap_err();
    assert!(matches!(err, Error::Auth(_)));
}

#[tokio::test]
async fn validation_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/materials"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "message": "Title is required" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = MaterialClient::new(&config(&server), tokens()).unwrap();
    match client.create_material(&request()).await {
        Err(Error::Api { status, message }) => {
            assert_eq!(status, 422);
            assert_eq!(message, "Title is required");
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn server_errors_are_not_retried_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/materials"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = MaterialClient::new(&config(&server), tokens()).unwrap();
    let err = client.create_material(&request()).await.unwrap_err();
    assert!(matches!(err, Error::Api { status: 503, .. }));
}

#[tokio::test]
async fn server_errors_are_retried_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/materials"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/materials"))
        .respond_with(accepted("m3"))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.max_retries = 1;
    let client = MaterialClient::new(&config, tokens()).unwrap();
    let receipt = client.create_material(&request()).await.unwrap();
    assert_eq!(receipt.id, "m3");
}

#[tokio::test]
async fn polls_until_material_is_ready() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/materials/m1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "_id": "m1", "status": "processing" })),
        )
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/materials/m1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "_id": "m1", "status": "ready" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = MaterialClient::new(&config(&server), tokens()).unwrap();
    let receipt = client.wait_until_settled("m1").await.unwrap();
    assert_eq!(receipt.status, MaterialStatus::Ready);
}

#[tokio::test]
async fn polling_stops_at_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/materials/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "_id": "slow", "status": "processing" })),
        )
        .expect(5)
        .mount(&server)
        .await;

    let client = MaterialClient::new(&config(&server), tokens()).unwrap();
    let receipt = client.wait_until_settled("slow").await.unwrap();
    assert_eq!(receipt.status, MaterialStatus::Processing);
}

#[tokio::test]
async fn malformed_success_body_is_json_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/materials"))
        .respond_with(ResponseTemplate::new(201).set_body_string("<html>created</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = MaterialClient::new(&config(&server), tokens()).unwrap();
    let err = client.create_material(&request()).await.unwrap_err();
    assert!(matches!(err, Error::Json(_)));
    assert!(!err.is_retryable());
}
