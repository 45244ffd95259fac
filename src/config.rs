//! Engine configuration loaded from the environment.
//!
//! Call `dotenv::dotenv().ok()` before `EngineConfig::from_env()` to pick up a
//! local `.env` file.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_URL: &str = "https://api.deepseek.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "deepseek-chat";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Credentials that ship in sample `.env` files and must never reach the API.
pub const PLACEHOLDER_KEYS: &[&str] = &["your_api_key_here", "dummy-api-key"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// API key for the completion endpoint (None = rule-based only)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Chat-completions endpoint URL
    pub api_url: String,

    /// Model name sent with every request
    pub model: String,

    /// Upper bound for a single completion call
    pub timeout_secs: u64,

    pub max_tokens: u32,

    pub temperature: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_tokens: 800,
            temperature: 0.1,
        }
    }
}

impl EngineConfig {
    /// Read `DEEPSEEK_API_KEY`, `DEEPSEEK_API_URL`, `DEEPSEEK_MODEL` and
    /// `DEEPSEEK_TIMEOUT_SECS`; anything unset keeps its default.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        config.api_key = std::env::var("DEEPSEEK_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        if let Ok(url) = std::env::var("DEEPSEEK_API_URL") {
            if !url.trim().is_empty() {
                config.api_url = url.trim().to_string();
            }
        }

        if let Ok(model) = std::env::var("DEEPSEEK_MODEL") {
            if !model.trim().is_empty() {
                config.model = model.trim().to_string();
            }
        }

        if let Ok(raw) = std::env::var("DEEPSEEK_TIMEOUT_SECS") {
            config.timeout_secs = raw.trim().parse().map_err(|_| {
                EngineError::Config(format!("DEEPSEEK_TIMEOUT_SECS is not a number: {}", raw))
            })?;
        }

        Ok(config)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// True iff a real (non-placeholder) credential is present.
    pub fn has_usable_key(&self) -> bool {
        is_usable_key(self.api_key.as_deref())
    }

    /// Key with everything but the edges hidden, for startup logs.
    pub fn masked_key(&self) -> String {
        match self.api_key.as_deref() {
            Some(key) if key.chars().count() > 12 => {
                let chars: Vec<char> = key.chars().collect();
                let head: String = chars[..8].iter().collect();
                let tail: String = chars[chars.len() - 4..].iter().collect();
                format!("{}...{}", head, tail)
            }
            Some(_) => "***".to_string(),
            None => "<unset>".to_string(),
        }
    }
}

pub fn is_usable_key(key: Option<&str>) -> bool {
    match key.map(str::trim) {
        Some(k) if !k.is_empty() => !PLACEHOLDER_KEYS.contains(&k),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_keys_are_not_usable() {
        assert!(!is_usable_key(None));
        assert!(!is_usable_key(Some("")));
        assert!(!is_usable_key(Some("  ")));
        assert!(!is_usable_key(Some("your_api_key_here")));
        assert!(!is_usable_key(Some("dummy-api-key")));
        assert!(is_usable_key(Some("sk-live-1234567890")));
    }

    #[test]
    fn test_masked_key() {
        let config = EngineConfig::default().with_api_key("sk-abcdefgh12345678");
        assert_eq!(config.masked_key(), "sk-abcde...5678");

        let short = EngineConfig::default().with_api_key("short");
        assert_eq!(short.masked_key(), "***");

        assert_eq!(EngineConfig::default().masked_key(), "<unset>");
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_tokens, 800);
        assert!(!config.has_usable_key());
    }
}
