mod harness;

use axum::http::StatusCode;
use harness::chat_body;
use harness::config::ConfigBuilder;
use harness::mock_upstream::{MockUpstream, Reply, completion};
use harness::server::TestServer;

#[tokio::test]
async fn non_streaming_completion_is_relayed_verbatim() {
    let mock = MockUpstream::start([Reply::Json(StatusCode::OK, completion("Hello back"))]).await.unwrap();
    let server = TestServer::start(ConfigBuilder::new(&mock.base_url()).build()).await.unwrap();

    let resp = server
        .client()
        .post(server.url("/v1/chat/completions"))
        .json(&chat_body("generic-model", false))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "application/json");
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body, completion("Hello back"));

    let sent = &mock.captured()[0];
    assert_eq!(sent.path, "/v1/chat/completions");
    assert_eq!(sent.json()["stream"], false);
}

#[tokio::test]
async fn non_streaming_error_status_is_relayed() {
    let error = serde_json::json!({"error": {"message": "insufficient credits"}});
    let mock = MockUpstream::start([Reply::Json(StatusCode::PAYMENT_REQUIRED, error.clone())])
        .await
        .unwrap();
    let server = TestServer::start(ConfigBuilder::new(&mock.base_url()).build()).await.unwrap();

    let resp = server
        .client()
        .post(server.url("/v1/chat/completions"))
        .json(&chat_body("generic-model", false))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 402);
    assert_eq!(resp.json::<serde_json::Value>().await.unwrap(), error);
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn outbound_headers_follow_default_rules() {
    let mock = MockUpstream::start([Reply::Json(StatusCode::OK, serde_json::json!({"data": []}))])
        .await
        .unwrap();
    let server = TestServer::start(ConfigBuilder::new(&mock.base_url()).build()).await.unwrap();

    let resp = server
        .client()
        .get(server.url("/v1/models"))
        .bearer_auth("sk-caller")
        .header("referer", "https://app.example")
        .header("x-private", "secret")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);

    let sent = &mock.captured()[0];
    assert_eq!(sent.path, "/v1/models");
    assert_eq!(sent.headers["authorization"], "Bearer sk-caller");
    assert_eq!(sent.headers["http-referer"], "https://app.example");
    assert_eq!(sent.headers["x-title"], "OpenRouter API Wrapper");
    assert!(sent.headers.get("x-private").is_none());
}

#[tokio::test]
async fn models_are_relayed_with_upstream_status() {
    let models = serde_json::json!({"data": [{"id": "generic-model"}]});
    let mock = MockUpstream::start([Reply::Json(StatusCode::OK, models.clone())]).await.unwrap();
    let server = TestServer::start(ConfigBuilder::new(&mock.base_url()).build()).await.unwrap();

    let resp = server.client().get(server.url("/v1/models")).send().await.unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.json::<serde_json::Value>().await.unwrap(), models);
}

#[tokio::test]
async fn generation_id_is_forwarded_as_query() {
    let stats = serde_json::json!({"data": {"id": "gen-1", "total_cost": 0.001}});
    let mock = MockUpstream::start([Reply::Json(StatusCode::OK, stats.clone())]).await.unwrap();
    let server = TestServer::start(ConfigBuilder::new(&mock.base_url()).build()).await.unwrap();

    let resp = server
        .client()
        .get(server.url("/v1/generation?id=gen-1"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.json::<serde_json::Value>().await.unwrap(), stats);

    let sent = &mock.captured()[0];
    assert_eq!(sent.path, "/v1/generation");
    assert_eq!(sent.query.as_deref(), Some("id=gen-1"));
}

#[tokio::test]
async fn generation_without_id_is_rejected() {
    let mock = MockUpstream::start([Reply::Json(StatusCode::OK, serde_json::json!({}))]).await.unwrap();
    let server = TestServer::start(ConfigBuilder::new(&mock.base_url()).build()).await.unwrap();

    let resp = server.client().get(server.url("/v1/generation")).send().await.unwrap();

    assert_eq!(resp.status(), 400);
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn malformed_chat_body_is_rejected() {
    let mock = MockUpstream::start([Reply::Json(StatusCode::OK, completion("unused"))]).await.unwrap();
    let server = TestServer::start(ConfigBuilder::new(&mock.base_url()).build()).await.unwrap();

    let resp = server
        .client()
        .post(server.url("/v1/chat/completions"))
        .header("content-type", "application/json")
        .body("{\"model\": ")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["type"], "invalid_request_error");
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn unreachable_primary_exhausts_retries() {
    let config = ConfigBuilder::new("http://127.0.0.1:9/v1").with_max_attempts(2).build();
    let server = TestServer::start(config).await.unwrap();

    let resp = server.client().get(server.url("/v1/models")).send().await.unwrap();

    assert_eq!(resp.status(), 502);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["type"], "retries_exhausted_error");
}
