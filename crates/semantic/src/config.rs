use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::resilience::{CircuitBreakerConfig, RetryConfig};
use crate::EmbedError;

/// Environment variable overriding [`EmbedderConfig::api_url`].
pub const API_URL_ENV: &str = "REVDIFF_EMBEDDING_API_URL";
/// Environment variable holding a bearer token for the embedding API.
pub const API_TOKEN_ENV: &str = "REVDIFF_EMBEDDING_API_TOKEN";

/// Which embedding backend to build.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderMode {
    /// Deterministic in-process term-frequency vectors.
    #[default]
    Lexical,
    /// Remote HTTP embedding service.
    Api,
}

/// Runtime configuration for the embedding provider.
///
/// # Example
/// ```
/// use semantic::{EmbedderConfig, EmbedderMode};
///
/// let cfg = EmbedderConfig {
///     mode: EmbedderMode::Api,
///     api_url: Some("https://api.example.com/v1/embeddings".into()),
///     api_auth_header: Some("Bearer sk-xxx".into()),
///     api_provider: Some("openai".into()),
///     ..Default::default()
/// };
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbedderConfig {
    #[serde(default)]
    pub mode: EmbedderMode,
    /// Model name sent to providers that need one (OpenAI-style APIs).
    #[serde(default = "EmbedderConfig::default_model_name")]
    pub model_name: String,
    /// API inference endpoint when [`mode`](Self::mode) is `api`.
    #[serde(default)]
    pub api_url: Option<String>,
    /// Authorization header (e.g., `"Bearer hf_xxx"`).
    #[serde(default)]
    pub api_auth_header: Option<String>,
    /// Remote payload shape: `"hf"`, `"openai"`, or `"custom"` (default).
    #[serde(default)]
    pub api_provider: Option<String>,
    /// Upper bound for one `embed` call, retries included.
    #[serde(
        rename = "timeout_ms",
        with = "crate::serde_millis",
        default = "EmbedderConfig::default_timeout"
    )]
    pub timeout: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circuit_breaker: Option<CircuitBreakerConfig>,
}

impl EmbedderConfig {
    pub(crate) fn default_model_name() -> String {
        "text-embedding-3-small".into()
    }

    pub(crate) fn default_timeout() -> Duration {
        Duration::from_millis(5_000)
    }

    /// Fill `api_url` and `api_auth_header` from the environment when set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_url = Some(url);
            }
        }
        if let Ok(token) = std::env::var(API_TOKEN_ENV) {
            if !token.trim().is_empty() {
                self.api_auth_header = Some(format!("Bearer {}", token.trim()));
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), EmbedError> {
        if self.timeout.is_zero() {
            return Err(EmbedError::InvalidConfig("timeout_ms must be > 0".into()));
        }
        if self.mode == EmbedderMode::Api
            && self.api_url.as_deref().is_none_or(|url| url.trim().is_empty())
        {
            return Err(EmbedError::InvalidConfig(
                "api_url is required for api mode".into(),
            ));
        }
        Ok(())
    }
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            mode: EmbedderMode::Lexical,
            model_name: Self::default_model_name(),
            api_url: None,
            api_auth_header: None,
            api_provider: None,
            timeout: Self::default_timeout(),
            retry: None,
            circuit_breaker: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_lexical_mode() {
        let cfg = EmbedderConfig::default();
        assert_eq!(cfg.mode, EmbedderMode::Lexical);
        assert_eq!(cfg.timeout, Duration::from_secs(5));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn api_mode_requires_url() {
        let cfg = EmbedderConfig {
            mode: EmbedderMode::Api,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(EmbedError::InvalidConfig(_))));
    }

    #[test]
    fn zero_timeout_rejected() {
        let cfg = EmbedderConfig {
            timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(EmbedError::InvalidConfig(_))));
    }

    #[test]
    fn timeout_serializes_as_millis() {
        let cfg = EmbedderConfig::default();
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["timeout_ms"], 5000);
        assert_eq!(json["mode"], "lexical");

        let parsed: EmbedderConfig =
            serde_json::from_str(r#"{"mode":"api","api_url":"http://x","timeout_ms":250}"#)
                .unwrap();
        assert_eq!(parsed.timeout, Duration::from_millis(250));
        assert_eq!(parsed.mode, EmbedderMode::Api);
        assert_eq!(parsed.model_name, "text-embedding-3-small");
    }
}
