//! Environment configuration for Bookmarkr.
//!
//! All settings come from environment variables. The binary loads a `.env`
//! file first via `dotenvy`; the library only ever reads the process
//! environment through [`AppConfig::from_env`].

use url::Url;

use crate::types::errors::ConfigError;

/// Application configuration resolved from the environment.
///
/// Authentication itself is out of scope — the user id and access token are
/// handed in already obtained. Without a user id, reads still work but
/// mutations fail with `StoreError::NotAuthenticated`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the remote store, e.g. `https://abc.example.co`.
    pub remote_url: String,
    /// Public API key sent as the `apikey` header and realtime query param.
    pub api_key: String,
    /// Per-user access token. Falls back to `api_key` when unset.
    pub access_token: Option<String>,
    /// Owning user id stamped onto created bookmarks.
    pub user_id: Option<String>,
    /// Generative AI key. Unset disables AI analysis entirely.
    pub gemini_api_key: Option<String>,
    /// Generative model name.
    pub gemini_model: String,
}

const DEFAULT_GEMINI_MODEL: &str = "gemini-pro";

impl AppConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary variable lookup.
    ///
    /// Required: `BOOKMARKR_REMOTE_URL` (http/https URL), `BOOKMARKR_API_KEY`.
    /// Optional: `BOOKMARKR_ACCESS_TOKEN`, `BOOKMARKR_USER_ID`,
    /// `BOOKMARKR_GEMINI_API_KEY`, `BOOKMARKR_GEMINI_MODEL`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let remote_url = require(&lookup, "BOOKMARKR_REMOTE_URL")?;
        let parsed = Url::parse(&remote_url)
            .map_err(|e| ConfigError::Invalid(format!("BOOKMARKR_REMOTE_URL: {}", e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ConfigError::Invalid(format!(
                "BOOKMARKR_REMOTE_URL must be http(s), got scheme '{}'",
                parsed.scheme()
            )));
        }

        let api_key = require(&lookup, "BOOKMARKR_API_KEY")?;

        Ok(Self {
            remote_url: remote_url.trim_end_matches('/').to_string(),
            api_key,
            access_token: optional(&lookup, "BOOKMARKR_ACCESS_TOKEN"),
            user_id: optional(&lookup, "BOOKMARKR_USER_ID"),
            gemini_api_key: optional(&lookup, "BOOKMARKR_GEMINI_API_KEY"),
            gemini_model: optional(&lookup, "BOOKMARKR_GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
        })
    }

    /// Token used for the `Authorization: Bearer` header.
    pub fn bearer_token(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.api_key)
    }

    /// Websocket endpoint of the realtime feed derived from the remote URL.
    pub fn realtime_url(&self) -> String {
        let ws_base = if self.remote_url.starts_with("https://") {
            self.remote_url.replacen("https://", "wss://", 1)
        } else {
            self.remote_url.replacen("http://", "ws://", 1)
        };
        format!(
            "{}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
            ws_base, self.api_key
        )
    }
}

fn require(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key.to_string())),
    }
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|value| !value.trim().is_empty())
}
