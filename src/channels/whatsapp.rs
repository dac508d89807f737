use crate::config::{AutoReplyConfig, WhatsAppConfig};
use crate::error::{RelayError, Result};
use crate::types::{InboundMessage, OutboundTextMessage, UpstreamResponse, WebhookEnvelope};
use reqwest::Client;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    /// Delivery/read receipt for a message we sent.
    StatusUpdate,
    NoMessages,
    Message(InboundMessage),
}

/// Interprets a raw webhook body. Only the first change of the first entry
/// is considered, and only the first message within it.
pub fn parse_webhook_event(raw: &[u8]) -> Result<WebhookEvent> {
    let envelope: WebhookEnvelope = serde_json::from_slice(raw)?;
    let value = envelope
        .entry
        .into_iter()
        .next()
        .and_then(|entry| entry.changes.into_iter().next())
        .map(|change| change.value)
        .ok_or(RelayError::EmptyEnvelope)?;

    if value.statuses.is_some() {
        return Ok(WebhookEvent::StatusUpdate);
    }

    let Some(message) = value.messages.and_then(|msgs| msgs.into_iter().next()) else {
        return Ok(WebhookEvent::NoMessages);
    };

    Ok(WebhookEvent::Message(InboundMessage {
        from: message.from,
        message_id: message.id,
        kind: message.kind,
        text: message.text.map(|t| t.body),
    }))
}

pub fn build_reply_text(template: &str, text: &str) -> String {
    template.replace("{text}", text)
}

/// Decides whether `inbound` gets an auto-reply, returning the recipient and
/// reply body if so.
pub fn plan_auto_reply(
    reply: &AutoReplyConfig,
    own_phone_number_id: &str,
    inbound: &InboundMessage,
) -> Option<(String, String)> {
    if !reply.enabled {
        return None;
    }
    let from = inbound.from.as_deref().filter(|v| !v.is_empty())?;
    let text = inbound.text.as_deref().filter(|t| !t.is_empty())?;
    let own_number = !own_phone_number_id.is_empty() && from == own_phone_number_id;
    if reply.suppress_self_echo && own_number {
        debug!(from, "skipping auto-reply to own number");
        return None;
    }
    Some((from.to_string(), build_reply_text(&reply.template, text)))
}

/// Posts a text message to the Graph API and returns whatever it answered,
/// successful or not. Only transport failures and missing credentials are
/// errors.
pub async fn send_text_message(
    client: &Client,
    cfg: &WhatsAppConfig,
    to: &str,
    body: &str,
) -> Result<UpstreamResponse> {
    let token = cfg.access_token().ok_or(RelayError::MissingAccessToken)?;
    if cfg.phone_number_id.trim().is_empty() {
        return Err(RelayError::MissingPhoneNumberId);
    }

    let payload = OutboundTextMessage::new(to, body);
    let resp = client
        .post(cfg.messages_url())
        .bearer_auth(token)
        .json(&payload)
        .send()
        .await?;

    let status = resp.status().as_u16();
    let text = resp.text().await?;
    let body = serde_json::from_str::<serde_json::Value>(&text)
        .unwrap_or_else(|_| serde_json::json!({ "error": text }));

    let upstream = UpstreamResponse { status, body };
    if upstream.is_success() {
        debug!(to, status, "whatsapp message sent");
    } else {
        warn!(to, status, body = %upstream.body, "whatsapp api rejected message");
    }
    Ok(upstream)
}

/// Like [`send_text_message`] but treats a non-2xx answer as an error.
pub async fn send_reply(
    client: &Client,
    cfg: &WhatsAppConfig,
    to: &str,
    body: &str,
) -> Result<UpstreamResponse> {
    let upstream = send_text_message(client, cfg, to, body).await?;
    if !upstream.is_success() {
        return Err(RelayError::Upstream {
            status: upstream.status,
            body: upstream.body.to_string(),
        });
    }
    Ok(upstream)
}
