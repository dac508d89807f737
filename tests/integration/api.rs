use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use tower::ServiceExt;
use whatsapp_relay::config::{AutoReplyConfig, Config, ServerConfig, WhatsAppConfig};
use whatsapp_relay::{router, AppState, HOME_TEXT, VERIFICATION_FAILED_TEXT};

fn create_test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
        },
        whatsapp: WhatsAppConfig {
            access_token: None,
            phone_number_id: "839043219287688".to_string(),
            verify_token: "verify_me".to_string(),
            business_account_id: None,
            api_base_url: "http://127.0.0.1:9".to_string(),
            api_version: "v19.0".to_string(),
            request_timeout_seconds: 2,
        },
        auto_reply: AutoReplyConfig::default(),
    }
}

fn create_app() -> Router {
    router(AppState::new(create_test_config()).unwrap())
}

async fn read_body(resp: axum::response::Response) -> Vec<u8> {
    to_bytes(resp.into_body(), usize::MAX).await.unwrap().to_vec()
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_root_liveness() {
    let resp = create_app().oneshot(get("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(read_body(resp).await, HOME_TEXT.as_bytes());
}

#[tokio::test]
async fn test_health() {
    let resp = create_app().oneshot(get("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(&read_body(resp).await).unwrap();
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_verify_success_echoes_challenge() {
    let resp = create_app()
        .oneshot(get(
            "/webhook?hub.mode=subscribe&hub.verify_token=verify_me&hub.challenge=1158201444",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(read_body(resp).await, b"1158201444");
}

#[tokio::test]
async fn test_verify_wrong_token() {
    let resp = create_app()
        .oneshot(get(
            "/webhook?hub.mode=subscribe&hub.verify_token=nope&hub.challenge=abc",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(read_body(resp).await, VERIFICATION_FAILED_TEXT.as_bytes());
}

#[tokio::test]
async fn test_verify_wrong_mode() {
    let resp = create_app()
        .oneshot(get(
            "/webhook?hub.mode=unsubscribe&hub.verify_token=verify_me&hub.challenge=abc",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_verify_missing_params() {
    let resp = create_app().oneshot(get("/webhook")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_webhook_malformed_body_still_acks() {
    for body in [
        "not json at all".to_string(),
        json!({"object": "whatsapp_business_account"}).to_string(),
        json!({"entry": []}).to_string(),
        String::new(),
    ] {
        let resp = create_app().oneshot(post("/webhook", body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let ack: serde_json::Value = serde_json::from_slice(&read_body(resp).await).unwrap();
        assert_eq!(ack, json!({"status": "received"}));
    }
}

#[tokio::test]
async fn test_webhook_without_credentials_still_acks() {
    let payload = json!({
        "entry": [{"changes": [{"value": {"messages": [
            {"from": "234800", "type": "text", "text": {"body": "hi"}}
        ]}}]}]
    });
    let resp = create_app()
        .oneshot(post("/webhook", payload.to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_send_missing_fields() {
    for body in [
        json!({"to": "1", "message": ""}).to_string(),
        json!({"message": "hi"}).to_string(),
        json!({"to": "1"}).to_string(),
        "garbage".to_string(),
    ] {
        let resp = create_app().oneshot(post("/send", body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let err: serde_json::Value = serde_json::from_slice(&read_body(resp).await).unwrap();
        assert_eq!(err, json!({"error": "Missing 'to' or 'message'"}));
    }
}

#[tokio::test]
async fn test_send_without_access_token_is_bad_gateway() {
    let resp = create_app()
        .oneshot(post("/send", json!({"to": "234800", "message": "hi"}).to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let err: serde_json::Value = serde_json::from_slice(&read_body(resp).await).unwrap();
    assert!(err["error"].as_str().unwrap().contains("access token"));
}

#[tokio::test]
async fn test_verify_unreadable_query_is_forbidden() {
    let resp = create_app()
        .oneshot(get(
            "/webhook?hub.mode=subscribe&hub.mode=x&hub.verify_token=nope&hub.challenge=abc",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(read_body(resp).await, VERIFICATION_FAILED_TEXT.as_bytes());
}
