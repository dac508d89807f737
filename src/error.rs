use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("whatsapp access token is not configured")]
    MissingAccessToken,

    #[error("whatsapp phone number id is not configured")]
    MissingPhoneNumberId,

    #[error("whatsapp request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("whatsapp api returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("malformed webhook payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("webhook payload has no entries")]
    EmptyEnvelope,
}

pub type Result<T> = std::result::Result<T, RelayError>;
