use std::fmt;

use align::{Algorithm, ComparisonConfig};
use segment::Granularity;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ComparisonError;

const FINGERPRINT_DOMAIN: &[u8] = b"revdiff-fp-v1";

/// Comparison request as received from a caller.
///
/// Enum fields stay raw strings until [`validate`](Self::validate) so an
/// unknown value surfaces as `InvalidConfig` instead of a parse failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonRequest {
    pub slug: String,
    pub version_a: u32,
    pub version_b: u32,
    #[serde(default = "default_granularity")]
    pub granularity: String,
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default)]
    pub force_recompute: bool,
}

fn default_granularity() -> String {
    Granularity::Word.as_str().to_string()
}

fn default_algorithm() -> String {
    Algorithm::Hybrid.as_str().to_string()
}

fn default_similarity_threshold() -> f64 {
    0.7
}

impl ComparisonRequest {
    /// Request with default word granularity, hybrid algorithm and 0.7
    /// threshold.
    pub fn new(slug: impl Into<String>, version_a: u32, version_b: u32) -> Self {
        Self {
            slug: slug.into(),
            version_a,
            version_b,
            granularity: default_granularity(),
            algorithm: default_algorithm(),
            similarity_threshold: default_similarity_threshold(),
            force_recompute: false,
        }
    }

    pub fn with_granularity(mut self, granularity: impl Into<String>) -> Self {
        self.granularity = granularity.into();
        self
    }

    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = algorithm.into();
        self
    }

    pub fn with_threshold(mut self, similarity_threshold: f64) -> Self {
        self.similarity_threshold = similarity_threshold;
        self
    }

    pub fn with_force_recompute(mut self, force_recompute: bool) -> Self {
        self.force_recompute = force_recompute;
        self
    }

    /// Parse enum values, range-check the threshold and derive the
    /// fingerprint.
    pub fn validate(&self) -> Result<ValidatedRequest, ComparisonError> {
        if self.slug.trim().is_empty() {
            return Err(ComparisonError::InvalidConfig(
                "slug must not be empty".into(),
            ));
        }
        let granularity: Granularity = self
            .granularity
            .parse()
            .map_err(|err: segment::SegmentError| ComparisonError::InvalidConfig(err.to_string()))?;
        let algorithm: Algorithm = self.algorithm.parse()?;
        let config = ComparisonConfig::new(granularity, algorithm, self.similarity_threshold);
        config.validate()?;

        let fingerprint =
            Fingerprint::compute(&self.slug, self.version_a, self.version_b, &config);
        Ok(ValidatedRequest {
            slug: self.slug.clone(),
            version_a: self.version_a,
            version_b: self.version_b,
            config,
            force_recompute: self.force_recompute,
            fingerprint,
        })
    }
}

/// A request whose configuration has been checked.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub slug: String,
    pub version_a: u32,
    pub version_b: u32,
    pub config: ComparisonConfig,
    pub force_recompute: bool,
    pub fingerprint: Fingerprint,
}

/// Hex SHA-256 cache key of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hash slug, both versions, granularity, algorithm and threshold bucket.
    pub fn compute(
        slug: &str,
        version_a: u32,
        version_b: u32,
        config: &ComparisonConfig,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(FINGERPRINT_DOMAIN);
        hasher.update([0u8]);
        hasher.update(slug.as_bytes());
        hasher.update([0u8]);
        hasher.update(version_a.to_be_bytes());
        hasher.update(version_b.to_be_bytes());
        hasher.update(config.granularity.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(config.algorithm.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(config.threshold_bucket().to_be_bytes());
        Fingerprint(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
