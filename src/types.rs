use serde::{Deserialize, Serialize};

/// Top level body of a WhatsApp Cloud API webhook POST.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEnvelope {
    pub object: Option<String>,
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEntry {
    pub id: Option<String>,
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookChange {
    pub field: Option<String>,
    pub value: ChangeValue,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeValue {
    pub messaging_product: Option<String>,
    pub metadata: Option<ValueMetadata>,
    pub messages: Option<Vec<WebhookMessage>>,
    /// Delivery receipts. Present instead of `messages` on status callbacks;
    /// an explicit `null` still counts as present.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub statuses: Option<serde_json::Value>,
}

fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueMetadata {
    pub display_phone_number: Option<String>,
    pub phone_number_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookMessage {
    pub from: Option<String>,
    pub id: Option<String>,
    pub timestamp: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub text: Option<TextBody>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBody {
    pub body: String,
}

/// A user message pulled out of a webhook envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub from: Option<String>,
    pub message_id: Option<String>,
    pub kind: Option<String>,
    pub text: Option<String>,
}

/// JSON payload for `POST /{phone-number-id}/messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundTextMessage {
    pub messaging_product: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: TextBody,
}

impl OutboundTextMessage {
    pub fn new(to: &str, body: &str) -> Self {
        Self {
            messaging_product: "whatsapp".to_string(),
            to: to.to_string(),
            kind: "text".to_string(),
            text: TextBody {
                body: body.to_string(),
            },
        }
    }
}

/// Status code and body returned by the Graph API.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Body of the manual `POST /send` endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendMessageRequest {
    pub to: Option<String>,
    pub message: Option<String>,
}

impl SendMessageRequest {
    /// Returns `(to, message)` when both are present and non-empty.
    pub fn validated(&self) -> Option<(&str, &str)> {
        let to = self.to.as_deref().filter(|v| !v.is_empty())?;
        let message = self.message.as_deref().filter(|v| !v.is_empty())?;
        Some((to, message))
    }
}
