use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_VERIFY_TOKEN: &str = "whatsapp-relay-verify";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub whatsapp: WhatsAppConfig,
    pub auto_reply: AutoReplyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatsAppConfig {
    pub access_token: Option<String>,
    pub phone_number_id: String,
    pub verify_token: String,
    /// Only logged at startup.
    pub business_account_id: Option<String>,
    pub api_base_url: String,
    pub api_version: String,
    pub request_timeout_seconds: u64,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            phone_number_id: String::new(),
            verify_token: DEFAULT_VERIFY_TOKEN.to_string(),
            business_account_id: None,
            api_base_url: "https://graph.facebook.com".to_string(),
            api_version: "v19.0".to_string(),
            request_timeout_seconds: 10,
        }
    }
}

impl WhatsAppConfig {
    /// The access token, treating a blank value as unset.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Zero falls back to the default so the client never times out instantly.
    pub fn request_timeout(&self) -> std::time::Duration {
        let secs = match self.request_timeout_seconds {
            0 => WhatsAppConfig::default().request_timeout_seconds,
            secs => secs,
        };
        std::time::Duration::from_secs(secs)
    }

    pub fn messages_url(&self) -> String {
        format!(
            "{}/{}/{}/messages",
            self.api_base_url.trim_end_matches('/'),
            self.api_version,
            self.phone_number_id
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoReplyConfig {
    pub enabled: bool,
    /// Skip replying when the sender is our own phone number id.
    pub suppress_self_echo: bool,
    /// `{text}` is replaced with the inbound message body.
    pub template: String,
}

impl Default for AutoReplyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            suppress_self_echo: true,
            template: "You said: {text}".to_string(),
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn resolve_config_path() -> PathBuf {
    env::var("WHATSAPP_RELAY_CONFIG")
        .ok()
        .map(PathBuf::from)
        .unwrap_or_else(|| expand_tilde("~/.whatsapp-relay/whatsapp-relay.json"))
}

/// Reads a JSON config file, falling back to defaults when the file is
/// missing or unparsable.
pub fn load_config_file(path: &std::path::Path) -> Config {
    if !path.exists() {
        return Config::default();
    }
    match fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str::<Config>(&raw) {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!(path = %path.display(), "ignoring unparsable config file: {err}");
                Config::default()
            }
        },
        Err(err) => {
            tracing::warn!(path = %path.display(), "ignoring unreadable config file: {err}");
            Config::default()
        }
    }
}

pub fn load_config() -> Config {
    let mut cfg = load_config_file(&resolve_config_path());
    apply_env_overrides(&mut cfg, |key| env::var(key).ok());
    cfg
}

/// Applies environment overrides on top of `cfg`. Blank values and values
/// that fail to parse leave the existing setting untouched.
pub fn apply_env_overrides<F>(cfg: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(token) = get("WHATSAPP_ACCESS_TOKEN") {
        cfg.whatsapp.access_token = Some(token);
    }
    if let Some(id) = get("WHATSAPP_PHONE_NUMBER_ID") {
        cfg.whatsapp.phone_number_id = id;
    }
    if let Some(token) = get("WHATSAPP_VERIFY_TOKEN") {
        cfg.whatsapp.verify_token = token;
    }
    if let Some(id) = get("WHATSAPP_BUSINESS_ACCOUNT_ID") {
        cfg.whatsapp.business_account_id = Some(id);
    }
    if let Some(url) = get("WHATSAPP_API_BASE_URL") {
        cfg.whatsapp.api_base_url = url;
    }
    if let Some(version) = get("WHATSAPP_API_VERSION") {
        cfg.whatsapp.api_version = version;
    }
    if let Some(secs) = get("WHATSAPP_REQUEST_TIMEOUT_SECONDS")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
    {
        cfg.whatsapp.request_timeout_seconds = secs;
    }
    if let Some(enabled) = get("WHATSAPP_AUTO_REPLY").and_then(|v| parse_bool(&v)) {
        cfg.auto_reply.enabled = enabled;
    }
    if let Some(suppress) = get("WHATSAPP_SUPPRESS_SELF_ECHO").and_then(|v| parse_bool(&v)) {
        cfg.auto_reply.suppress_self_echo = suppress;
    }
    if let Some(template) = get("WHATSAPP_REPLY_TEMPLATE") {
        cfg.auto_reply.template = template;
    }
    if let Some(host) = get("HOST") {
        cfg.server.host = host;
    }
    if let Some(port) = get("PORT").and_then(|v| v.trim().parse().ok()) {
        cfg.server.port = port;
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
