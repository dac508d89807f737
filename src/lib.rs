pub mod channels;
pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::RelayError;

use self::channels::whatsapp as whatsapp_channel;
use self::channels::whatsapp::WebhookEvent;
use self::config::load_config;
use self::types::SendMessageRequest;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const HOME_TEXT: &str = "✅ WhatsApp Integration App is running!";
pub const VERIFICATION_FAILED_TEXT: &str = "Verification failed";
pub const MISSING_FIELDS_ERROR: &str = "Missing 'to' or 'message'";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.whatsapp.request_timeout())
            .build()?;
        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn create_app() -> anyhow::Result<(AppState, Router)> {
    create_app_with_config(load_config())
}

pub fn create_app_with_config(config: Config) -> anyhow::Result<(AppState, Router)> {
    if config.whatsapp.access_token().is_none() {
        warn!("WHATSAPP_ACCESS_TOKEN is not set; outbound messages will fail");
    }
    if config.whatsapp.phone_number_id.trim().is_empty() {
        warn!("WHATSAPP_PHONE_NUMBER_ID is not set; outbound messages will fail");
    }
    if let Some(account) = config.whatsapp.business_account_id.as_deref() {
        info!(business_account_id = account, "whatsapp business account configured");
    }

    let state = AppState::new(config)?;
    let app = router(state.clone());
    Ok((state, app))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/webhook", get(verify_webhook).post(receive_webhook))
        .route("/send", axum::routing::post(send_message))
        .with_state(state)
}

async fn home() -> impl IntoResponse {
    HOME_TEXT
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn verify_webhook(
    State(state): State<AppState>,
    query: Result<Query<VerifyQuery>, QueryRejection>,
) -> impl IntoResponse {
    let query = match query {
        Ok(Query(query)) => query,
        Err(err) => {
            warn!("webhook verification failed: unreadable query: {err}");
            return (StatusCode::FORBIDDEN, VERIFICATION_FAILED_TEXT).into_response();
        }
    };
    let expected = state.config.whatsapp.verify_token.as_str();
    let mode_ok = query.mode.as_deref() == Some("subscribe");
    let token_ok = query.verify_token.as_deref() == Some(expected);

    if mode_ok && token_ok {
        info!("webhook verified");
        let challenge = query.challenge.unwrap_or_default();
        return (StatusCode::OK, challenge).into_response();
    }

    warn!(mode = ?query.mode, "webhook verification failed");
    (StatusCode::FORBIDDEN, VERIFICATION_FAILED_TEXT).into_response()
}

/// Always acknowledges with 200; the platform redelivers anything else.
async fn receive_webhook(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    handle_inbound(&state, &body).await;
    Json(json!({"status": "received"}))
}

async fn send_message(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let req = serde_json::from_slice::<SendMessageRequest>(&body).unwrap_or_default();
    let Some((to, message)) = req.validated() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": MISSING_FIELDS_ERROR})),
        )
            .into_response();
    };

    match whatsapp_channel::send_text_message(&state.http, &state.config.whatsapp, to, message)
        .await
    {
        Ok(upstream) => {
            let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
            (status, Json(upstream.body)).into_response()
        }
        Err(err) => {
            error!("send_message error: {err}");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({"error": err.to_string()})),
            )
                .into_response()
        }
    }
}

/// Interprets one webhook delivery and sends the auto-reply if one is due.
/// Every failure is logged and swallowed.
pub async fn handle_inbound(state: &AppState, raw: &[u8]) {
    let inbound = match whatsapp_channel::parse_webhook_event(raw) {
        Ok(WebhookEvent::Message(inbound)) => inbound,
        Ok(WebhookEvent::StatusUpdate) => {
            debug!("status update received");
            return;
        }
        Ok(WebhookEvent::NoMessages) => {
            debug!("webhook carried no messages");
            return;
        }
        Err(err) => {
            error!("whatsapp inbound error: {err}");
            return;
        }
    };

    info!(
        from = ?inbound.from,
        message_id = ?inbound.message_id,
        kind = ?inbound.kind,
        "whatsapp message received"
    );

    let Some((to, reply)) = whatsapp_channel::plan_auto_reply(
        &state.config.auto_reply,
        &state.config.whatsapp.phone_number_id,
        &inbound,
    ) else {
        return;
    };

    if let Err(err) =
        whatsapp_channel::send_reply(&state.http, &state.config.whatsapp, &to, &reply).await
    {
        error!(to = %to, "auto-reply failed: {err}");
    }
}
