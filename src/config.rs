//! YAML configuration file support for revdiff.
//!
//! One file configures the comparator (cache, alignment, metrics, summary,
//! embedding) and the request defaults used by the CLI.
//!
//! ## Example YAML configuration
//!
//! ```yaml
//! version: "1.0"
//!
//! cache:
//!   capacity: 256
//!
//! alignment:
//!   merge_threshold: 0.6
//!   max_edit_distance: 2000
//!   similarity_max_edit_distance: 512
//!   anchor_block_size: 8
//!   position_pair_floor: 0.3
//!   offload_token_threshold: 20000
//!
//! metrics:
//!   text_weight: 0.7
//!   structural_weight: 0.3
//!   precision: 3
//!   structural_max_edit_distance: 2000
//!   structural_block_size: 4
//!
//! summary:
//!   top_k: 5
//!   summarizer_timeout_ms: 2000
//!   template_summarizer: true
//!
//! embedding:
//!   mode: "lexical"
//!   timeout_ms: 5000
//!
//! defaults:
//!   granularity: "word"
//!   algorithm: "hybrid"
//!   similarity_threshold: 0.7
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use align::{AlignOptions, MetricWeights, DEFAULT_TOP_K};
use semantic::EmbedderConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::engine::{ComparatorBuilder, EngineSettings};
use crate::providers::RevisionSource;
use crate::request::ComparisonRequest;
use crate::summarizer::TemplateSummarizer;
use crate::Comparator;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level YAML configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RevdiffConfig {
    /// Configuration format version
    #[serde(default = "default_config_version")]
    pub version: String,

    #[serde(default)]
    pub cache: CacheYamlConfig,

    #[serde(default)]
    pub alignment: AlignOptions,

    #[serde(default)]
    pub metrics: MetricWeights,

    #[serde(default)]
    pub summary: SummaryYamlConfig,

    #[serde(default)]
    pub embedding: EmbedderConfig,

    /// Request defaults for callers that do not set every field.
    #[serde(default)]
    pub defaults: DefaultsYamlConfig,
}

impl RevdiffConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: RevdiffConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.cache.validate()?;
        self.alignment
            .validate()
            .map_err(|err| ConfigLoadError::Validation(format!("alignment: {err}")))?;
        self.metrics
            .validate()
            .map_err(|err| ConfigLoadError::Validation(format!("metrics: {err}")))?;
        self.summary.validate()?;
        self.embedding
            .clone()
            .with_env_overrides()
            .validate()
            .map_err(|err| ConfigLoadError::Validation(format!("embedding: {err}")))?;
        self.defaults.validate()?;
        Ok(())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            align: self.alignment,
            weights: self.metrics,
            top_k: self.summary.top_k,
            embed_timeout: self.embedding.timeout,
            summarizer_timeout: Duration::from_millis(self.summary.summarizer_timeout_ms),
        }
    }

    /// Comparator builder wired from this file. The embedding section picks
    /// up `REVDIFF_EMBEDDING_API_URL` / `REVDIFF_EMBEDDING_API_TOKEN`.
    pub fn comparator_builder(
        &self,
        source: Arc<dyn RevisionSource>,
    ) -> Result<ComparatorBuilder, ConfigLoadError> {
        let embedding = self.embedding.clone().with_env_overrides();
        let embedder = semantic::build_embedder(&embedding)
            .map_err(|err| ConfigLoadError::Validation(format!("embedding: {err}")))?;
        let mut builder = Comparator::builder(source)
            .embedder(embedder)
            .cache_capacity(self.cache.capacity)
            .settings(EngineSettings {
                embed_timeout: embedding.timeout,
                ..self.engine_settings()
            });
        if self.summary.template_summarizer {
            builder = builder.summarizer(Arc::new(TemplateSummarizer::new()));
        }
        Ok(builder)
    }

    /// Request for `slug` filled from [`defaults`](Self::defaults).
    pub fn request(&self, slug: impl Into<String>, version_a: u32, version_b: u32) -> ComparisonRequest {
        ComparisonRequest::new(slug, version_a, version_b)
            .with_granularity(self.defaults.granularity.clone())
            .with_algorithm(self.defaults.algorithm.clone())
            .with_threshold(self.defaults.similarity_threshold)
    }
}

impl Default for RevdiffConfig {
    fn default() -> Self {
        Self {
            version: default_config_version(),
            cache: CacheYamlConfig::default(),
            alignment: AlignOptions::default(),
            metrics: MetricWeights::default(),
            summary: SummaryYamlConfig::default(),
            embedding: EmbedderConfig::default(),
            defaults: DefaultsYamlConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheYamlConfig {
    /// Maximum number of cached comparisons.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl CacheYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.capacity == 0 {
            return Err(ConfigLoadError::Validation(
                "cache.capacity must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheYamlConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryYamlConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_summarizer_timeout_ms")]
    pub summarizer_timeout_ms: u64,

    /// Attach the built-in [`TemplateSummarizer`].
    #[serde(default = "true_value")]
    pub template_summarizer: bool,
}

impl SummaryYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.top_k == 0 {
            return Err(ConfigLoadError::Validation(
                "summary.top_k must be >= 1".to_string(),
            ));
        }
        if self.summarizer_timeout_ms == 0 {
            return Err(ConfigLoadError::Validation(
                "summary.summarizer_timeout_ms must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SummaryYamlConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            summarizer_timeout_ms: default_summarizer_timeout_ms(),
            template_summarizer: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DefaultsYamlConfig {
    #[serde(default = "default_granularity")]
    pub granularity: String,

    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

impl DefaultsYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        ComparisonRequest::new("defaults", 1, 1)
            .with_granularity(self.granularity.clone())
            .with_algorithm(self.algorithm.clone())
            .with_threshold(self.similarity_threshold)
            .validate()
            .map(|_| ())
            .map_err(|err| ConfigLoadError::Validation(format!("defaults: {err}")))
    }
}

impl Default for DefaultsYamlConfig {
    fn default() -> Self {
        Self {
            granularity: default_granularity(),
            algorithm: default_algorithm(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

// Default value functions
fn default_config_version() -> String {
    "1.0".to_string()
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_summarizer_timeout_ms() -> u64 {
    2_000
}

fn true_value() -> bool {
    true
}

fn default_granularity() -> String {
    "word".to_string()
}

fn default_algorithm() -> String {
    "hybrid".to_string()
}

fn default_similarity_threshold() -> f64 {
    0.7
}

#[cfg(test)]
mod tests {
    use super::*;
    use semantic::EmbedderMode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_valid_yaml() {
        let yaml = r#"
version: "1.0"
cache:
  capacity: 16
alignment:
  max_edit_distance: 500
  similarity_max_edit_distance: 64
metrics:
  text_weight: 0.6
  structural_weight: 0.4
  structural_max_edit_distance: 100
summary:
  top_k: 3
defaults:
  granularity: "sentence"
"#;

        let config = RevdiffConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.cache.capacity, 16);
        assert_eq!(config.alignment.max_edit_distance, 500);
        assert_eq!(config.alignment.merge_threshold, 0.6);
        assert_eq!(config.metrics.structural_weight, 0.4);
        assert_eq!(config.alignment.similarity_max_edit_distance, 64);
        assert_eq!(config.metrics.structural_max_edit_distance, 100);
        assert_eq!(config.metrics.structural_block_size, 4);
        assert_eq!(config.engine_settings().weights, config.metrics);
        assert_eq!(config.summary.top_k, 3);
        assert!(config.summary.template_summarizer);
        assert_eq!(config.defaults.granularity, "sentence");
        assert_eq!(config.defaults.algorithm, "hybrid");
        assert_eq!(config.embedding.mode, EmbedderMode::Lexical);
    }

    #[test]
    fn test_load_from_file() {
        let yaml = r#"
version: "1"
embedding:
  mode: "lexical"
  timeout_ms: 1500
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml.as_bytes()).unwrap();

        let config = RevdiffConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.version, "1");
        assert_eq!(config.embedding.timeout, Duration::from_millis(1500));
        assert_eq!(config.engine_settings().embed_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = RevdiffConfig::from_yaml("{}").unwrap();
        assert_eq!(config, RevdiffConfig::default());
    }

    #[test]
    fn test_unsupported_version() {
        let err = RevdiffConfig::from_yaml("version: \"2.0\"").unwrap_err();
        assert!(matches!(err, ConfigLoadError::UnsupportedVersion(v) if v == "2.0"));
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            "cache:\n  capacity: 0",
            "metrics:\n  text_weight: 0.9\n  structural_weight: 0.3",
            "metrics:\n  precision: 9",
            "alignment:\n  merge_threshold: 1.5",
            "alignment:\n  similarity_max_edit_distance: 0",
            "metrics:\n  structural_block_size: 0",
            "summary:\n  top_k: 0",
            "defaults:\n  granularity: \"paragraphs\"",
            "defaults:\n  similarity_threshold: 2.0",
            "embedding:\n  mode: \"api\"",
        ];
        for yaml in cases {
            let err = RevdiffConfig::from_yaml(yaml).unwrap_err();
            assert!(matches!(err, ConfigLoadError::Validation(_)), "{yaml}: {err}");
        }
    }

    #[test]
    fn test_request_uses_defaults() {
        let config = RevdiffConfig::from_yaml(
            "defaults:\n  granularity: paragraph\n  algorithm: semantic\n  similarity_threshold: 0.8",
        )
        .unwrap();
        let request = config.request("contract", 1, 2);
        assert_eq!(request.granularity, "paragraph");
        assert_eq!(request.algorithm, "semantic");
        assert_eq!(request.similarity_threshold, 0.8);
    }

    #[tokio::test]
    async fn test_comparator_from_config() {
        let store = crate::InMemoryRevisionStore::new();
        store.insert("cfg", 1, "Alpha beta.\n\nGamma delta.");
        store.insert("cfg", 2, "Alpha beta.\n\nGamma epsilon.");
        let config = RevdiffConfig::default();

        let comparator = config
            .comparator_builder(Arc::new(store))
            .unwrap()
            .build()
            .unwrap();
        let result = comparator.compare(&config.request("cfg", 1, 2)).await.unwrap();
        assert!(result.change_summary.executive_summary.is_some());
        assert_eq!(comparator.settings().top_k, DEFAULT_TOP_K);
    }
}
