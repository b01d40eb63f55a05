//! Workspace umbrella crate for revdiff, the revision comparison engine.
//!
//! [`Comparator`] owns the end-to-end pipeline: it validates a
//! [`ComparisonRequest`], fetches both revisions from a [`RevisionSource`],
//! segments and aligns them, scores the edit script and packages the largest
//! changes. Finished results are memoized in a bounded [`ComparisonCache`],
//! and concurrent identical requests share one computation.
//!
//! ```
//! use std::sync::Arc;
//! use revdiff::{Comparator, ComparisonRequest, InMemoryRevisionStore, OpKind};
//!
//! let store = InMemoryRevisionStore::new();
//! store.insert("terms", 1, "The cat sat on the mat.");
//! store.insert("terms", 2, "A cat was sitting on the mat.");
//!
//! let comparator = Comparator::builder(Arc::new(store)).build().unwrap();
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! let request = ComparisonRequest::new("terms", 1, 2)
//!     .with_granularity("sentence")
//!     .with_threshold(0.6);
//! let result = rt.block_on(comparator.compare(&request)).unwrap();
//! assert_eq!(result.operations.len(), 1);
//! assert_eq!(result.operations[0].kind, OpKind::Replace);
//! assert!(!result.cached);
//! ```

pub mod cache;
pub mod config;
mod engine;
mod error;
pub mod providers;
mod request;
mod response;
pub mod summarizer;

pub use align::{
    Algorithm, AlignOptions, ChangeSummary, ComparisonConfig, ComparisonMetrics,
    ComparisonWarning, DiffOperation, DiffStatistics, MetricWeights, OpKind, RiskLevel,
    Significance, SIGNIFICANCE_TABLE,
};
pub use segment::{Granularity, Token};
pub use semantic::{Embedder, EmbedError, LexicalEmbedder};

pub use crate::cache::{CacheStats, ComparisonCache, ResultScope};
pub use crate::config::{ConfigLoadError, RevdiffConfig};
pub use crate::engine::{Comparator, ComparatorBuilder, EngineSettings};
pub use crate::error::ComparisonError;
pub use crate::providers::{InMemoryRevisionStore, RevisionSource, SourceError};
pub use crate::request::{ComparisonRequest, Fingerprint, ValidatedRequest};
pub use crate::response::{ComparisonResponse, ComparisonResult, OperationView};
pub use crate::summarizer::{Narrative, NarrativeSummarizer, SummarizerError, TemplateSummarizer};

use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

/// How a `compare` call obtained its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparePath {
    /// The request failed validation.
    Rejected,
    CacheHit,
    /// Awaited a computation started by another caller.
    JoinedInFlight,
    Computed,
}

impl ComparePath {
    pub fn as_str(self) -> &'static str {
        match self {
            ComparePath::Rejected => "rejected",
            ComparePath::CacheHit => "cache_hit",
            ComparePath::JoinedInFlight => "joined_in_flight",
            ComparePath::Computed => "computed",
        }
    }
}

/// Metrics observer for comparisons.
pub trait CompareMetrics: Send + Sync {
    fn record_compare(
        &self,
        latency: Duration,
        path: ComparePath,
        result: Result<(), ComparisonError>,
    );
}

/// Install or clear the global comparison metrics recorder.
pub fn set_compare_metrics(recorder: Option<Arc<dyn CompareMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn CompareMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn CompareMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

fn metrics_recorder() -> Option<Arc<dyn CompareMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

pub(crate) struct MetricsSpan {
    recorder: Arc<dyn CompareMetrics>,
    start: Instant,
}

impl MetricsSpan {
    pub(crate) fn start() -> Option<Self> {
        metrics_recorder().map(|recorder| Self {
            recorder,
            start: Instant::now(),
        })
    }

    pub(crate) fn record(self, path: ComparePath, result: Result<(), ComparisonError>) {
        self.recorder
            .record_compare(self.start.elapsed(), path, result);
    }
}
