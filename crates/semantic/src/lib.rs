//! Embedding providers for meaning-based revision alignment.
//!
//! The semantic aligner never talks to a model directly. It goes through the
//! [`Embedder`] trait, which turns a batch of texts into one vector per text.
//! Two implementations ship here:
//!
//! - [`LexicalEmbedder`]: deterministic term-frequency vectors, no I/O. The
//!   default, and what tests use.
//! - [`ApiEmbedder`]: a remote HTTP endpoint (Hugging Face, OpenAI-style or a
//!   custom `{"texts": [...]}` service) with retry and a circuit breaker.
//!
//! Callers bound every call with [`embed_with_timeout`]. Any failure is
//! reported as an [`EmbedError`]; the comparison engine treats that as a
//! recoverable condition and falls back to syntactic alignment.
//!
//! ```
//! use semantic::{build_embedder, embed_with_timeout, EmbedderConfig};
//!
//! let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! rt.block_on(async {
//!     let cfg = EmbedderConfig::default();
//!     let embedder = build_embedder(&cfg).unwrap();
//!     let texts = vec!["first clause".to_string(), "second clause".to_string()];
//!     let vectors = embed_with_timeout(embedder.as_ref(), &texts, cfg.timeout).await.unwrap();
//!     assert_eq!(vectors.len(), 2);
//! });
//! ```

pub mod config;
pub mod error;
pub mod resilience;

mod api;
mod lexical;
mod normalize;
mod serde_millis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub use crate::api::ApiEmbedder;
pub use crate::config::{EmbedderConfig, EmbedderMode, API_TOKEN_ENV, API_URL_ENV};
pub use crate::error::EmbedError;
pub use crate::lexical::LexicalEmbedder;
pub use crate::normalize::{cosine_similarity, l2_normalize_in_place, SparseVector};

/// External embedding capability.
///
/// Implementations must return exactly one vector per input text, in input
/// order, all of the same dimension.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    /// Short label used in logs and warnings.
    fn name(&self) -> &str {
        "embedder"
    }
}

/// Run `embedder.embed(texts)` under a deadline and check the response shape.
pub async fn embed_with_timeout(
    embedder: &dyn Embedder,
    texts: &[String],
    timeout: Duration,
) -> Result<Vec<Vec<f32>>, EmbedError> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let vectors = tokio::time::timeout(timeout, embedder.embed(texts))
        .await
        .map_err(|_| EmbedError::Timeout(timeout.as_millis() as u64))??;

    if vectors.len() != texts.len() {
        return Err(EmbedError::Malformed(format!(
            "{} returned {} vectors for {} inputs",
            embedder.name(),
            vectors.len(),
            texts.len()
        )));
    }
    if let Some(first) = vectors.first() {
        let dim = first.len();
        if vectors.iter().any(|v| v.len() != dim) {
            return Err(EmbedError::Malformed(format!(
                "{} returned vectors of differing dimension",
                embedder.name()
            )));
        }
    }
    Ok(vectors)
}

/// Build the embedder selected by `cfg.mode`.
pub fn build_embedder(cfg: &EmbedderConfig) -> Result<Arc<dyn Embedder>, EmbedError> {
    cfg.validate()?;
    match cfg.mode {
        EmbedderMode::Lexical => Ok(Arc::new(LexicalEmbedder::new())),
        EmbedderMode::Api => Ok(Arc::new(ApiEmbedder::new(cfg.clone())?)),
    }
}
