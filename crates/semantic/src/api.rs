use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::time::Duration;

use crate::resilience::{execute_with_retry_async, CircuitBreaker, CircuitState};
use crate::{EmbedError, Embedder, EmbedderConfig};

// Shared HTTP client with connection pooling. Per-call deadlines come from
// `EmbedderConfig::timeout`.
static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(32)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApiProviderKind {
    HuggingFace,
    OpenAI,
    Custom,
}

/// Embedder backed by a remote HTTP inference endpoint.
///
/// Requests go through retry with exponential backoff and a circuit breaker
/// that is owned by this embedder instance.
pub struct ApiEmbedder {
    cfg: EmbedderConfig,
    url: String,
    provider: ApiProviderKind,
    breaker: CircuitBreaker,
}

impl ApiEmbedder {
    pub fn new(cfg: EmbedderConfig) -> Result<Self, EmbedError> {
        cfg.validate()?;
        let url = cfg
            .api_url
            .clone()
            .ok_or_else(|| EmbedError::InvalidConfig("api_url is required for api mode".into()))?;
        let provider = api_provider_kind(cfg.api_provider.as_deref());
        let breaker = CircuitBreaker::new(cfg.circuit_breaker.unwrap_or_default());
        Ok(Self {
            cfg,
            url,
            provider,
            breaker,
        })
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.current_state()
    }

    async fn send(&self, payload: &Value) -> Result<Value, String> {
        let mut request = HTTP_CLIENT
            .post(&self.url)
            .timeout(self.cfg.timeout)
            .header("Content-Type", "application/json");
        if let Some(header) = self.cfg.api_auth_header.as_deref() {
            request = request.header("Authorization", header);
        }

        let response = request
            .json(payload)
            .send()
            .await
            .map_err(|e| format!("HTTP request failed (connection): {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("HTTP error {}: {body}", status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| format!("malformed JSON response: {e}"))
    }
}

#[async_trait]
impl Embedder for ApiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if !self.breaker.allow_request() {
            return Err(EmbedError::Unavailable(
                "circuit breaker is open for the embedding provider".into(),
            ));
        }

        let payload = build_api_payload(self.provider, texts, &self.cfg.model_name);
        let retry_cfg = self.cfg.retry.unwrap_or_default();
        let outcome = execute_with_retry_async(&retry_cfg, |_| self.send(&payload)).await;

        let response = match outcome.into_result() {
            Ok(response) => {
                self.breaker.record_success();
                response
            }
            Err(message) => {
                self.breaker.record_failure();
                return Err(EmbedError::Unavailable(message));
            }
        };

        let vectors = parse_embeddings_from_value(response)?;
        if vectors.len() != texts.len() {
            return Err(EmbedError::Malformed(format!(
                "API returned {} embeddings for {} inputs",
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }

    fn name(&self) -> &str {
        "api"
    }
}

fn api_provider_kind(provider: Option<&str>) -> ApiProviderKind {
    match provider.unwrap_or("custom").to_ascii_lowercase().as_str() {
        "hf" | "huggingface" => ApiProviderKind::HuggingFace,
        "openai" | "gpt" => ApiProviderKind::OpenAI,
        _ => ApiProviderKind::Custom,
    }
}

fn build_api_payload(provider: ApiProviderKind, texts: &[String], model_name: &str) -> Value {
    match provider {
        ApiProviderKind::HuggingFace => json!({ "inputs": texts }),
        ApiProviderKind::OpenAI => json!({ "input": texts, "model": model_name }),
        ApiProviderKind::Custom => json!({ "texts": texts }),
    }
}

fn parse_embeddings_from_value(value: Value) -> Result<Vec<Vec<f32>>, EmbedError> {
    match value {
        Value::Object(mut map) => {
            if let Some(embeddings) = map.remove("embeddings") {
                return parse_embedding_collection(embeddings);
            }

            if let Some(Value::Array(items)) = map.remove("data") {
                return items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(mut obj) => obj
                            .remove("embedding")
                            .ok_or_else(|| {
                                EmbedError::Malformed("missing `embedding` field in data item".into())
                            })
                            .and_then(parse_embedding_vector),
                        _ => Err(EmbedError::Malformed(
                            "unexpected entry inside `data` array".into(),
                        )),
                    })
                    .collect();
            }

            Err(EmbedError::Malformed("unsupported API response shape".into()))
        }
        other => parse_embedding_collection(other),
    }
}

fn parse_embedding_collection(value: Value) -> Result<Vec<Vec<f32>>, EmbedError> {
    match value {
        Value::Array(items) if items.iter().all(|item| matches!(item, Value::Array(_))) => {
            items.into_iter().map(parse_embedding_vector).collect()
        }
        other => parse_embedding_vector(other).map(|vec| vec![vec]),
    }
}

fn parse_embedding_vector(value: Value) -> Result<Vec<f32>, EmbedError> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|entry| match entry {
                Value::Number(num) => num
                    .as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| EmbedError::Malformed("non-finite embedding value".into())),
                other => Err(EmbedError::Malformed(format!(
                    "embedding entries must be numbers, got {other}"
                ))),
            })
            .collect(),
        other => Err(EmbedError::Malformed(format!(
            "embedding vector must be an array, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::{CircuitBreakerConfig, RetryConfig};
    use crate::EmbedderMode;

    fn api_config(url: &str) -> EmbedderConfig {
        EmbedderConfig {
            mode: EmbedderMode::Api,
            api_url: Some(url.into()),
            timeout: Duration::from_millis(200),
            retry: Some(
                RetryConfig::default()
                    .with_max_retries(0)
                    .with_jitter(false),
            ),
            circuit_breaker: Some(CircuitBreakerConfig::default().with_failure_threshold(1)),
            ..Default::default()
        }
    }

    #[test]
    fn provider_kind_from_hint() {
        assert_eq!(api_provider_kind(Some("HF")), ApiProviderKind::HuggingFace);
        assert_eq!(api_provider_kind(Some("openai")), ApiProviderKind::OpenAI);
        assert_eq!(api_provider_kind(None), ApiProviderKind::Custom);
    }

    #[test]
    fn payload_shapes() {
        let texts = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            build_api_payload(ApiProviderKind::HuggingFace, &texts, "m"),
            json!({ "inputs": ["a", "b"] })
        );
        assert_eq!(
            build_api_payload(ApiProviderKind::OpenAI, &texts, "m"),
            json!({ "input": ["a", "b"], "model": "m" })
        );
        assert_eq!(
            build_api_payload(ApiProviderKind::Custom, &texts, "m"),
            json!({ "texts": ["a", "b"] })
        );
    }

    #[test]
    fn parses_supported_response_shapes() {
        let nested = parse_embeddings_from_value(json!([[1.0, 2.0], [3.0, 4.0]])).unwrap();
        assert_eq!(nested, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);

        let openai = parse_embeddings_from_value(json!({
            "data": [{ "embedding": [0.5, 0.5] }, { "embedding": [1.0, 0.0] }]
        }))
        .unwrap();
        assert_eq!(openai.len(), 2);

        let keyed = parse_embeddings_from_value(json!({ "embeddings": [[1.0]] })).unwrap();
        assert_eq!(keyed, vec![vec![1.0]]);

        let single = parse_embeddings_from_value(json!([1.0, 2.0])).unwrap();
        assert_eq!(single, vec![vec![1.0, 2.0]]);
    }

    #[test]
    fn rejects_malformed_responses() {
        assert!(matches!(
            parse_embeddings_from_value(json!({ "vectors": [] })),
            Err(EmbedError::Malformed(_))
        ));
        assert!(matches!(
            parse_embeddings_from_value(json!([["x"]])),
            Err(EmbedError::Malformed(_))
        ));
        assert!(matches!(
            parse_embeddings_from_value(json!({ "data": [{ "vector": [1.0] }] })),
            Err(EmbedError::Malformed(_))
        ));
    }

    #[test]
    fn new_requires_url() {
        let cfg = EmbedderConfig {
            mode: EmbedderMode::Api,
            ..Default::default()
        };
        assert!(matches!(
            ApiEmbedder::new(cfg),
            Err(EmbedError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_unavailable_and_trips_breaker() {
        // Port 9 (discard) on localhost is closed in test environments.
        let embedder = ApiEmbedder::new(api_config("http://127.0.0.1:9/embed")).unwrap();
        let err = embedder.embed(&["hello".to_string()]).await.unwrap_err();
        assert!(matches!(err, EmbedError::Unavailable(_)));
        assert_eq!(embedder.circuit_state(), CircuitState::Open);

        let err = embedder.embed(&["hello".to_string()]).await.unwrap_err();
        assert!(err.to_string().contains("circuit breaker is open"));
    }

    #[tokio::test]
    async fn empty_batch_skips_network() {
        let embedder = ApiEmbedder::new(api_config("http://127.0.0.1:9/embed")).unwrap();
        assert!(embedder.embed(&[]).await.unwrap().is_empty());
        assert_eq!(embedder.circuit_state(), CircuitState::Closed);
    }
}
