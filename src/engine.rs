//! Comparison orchestration: validate, look up, compute once, cache.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use align::{
    aggregate, align, group_changes, AlignOptions, Alignment, DiffStatistics, MetricWeights,
    SemanticContext, DEFAULT_TOP_K,
};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use segment::{segment, Token};
use semantic::{Embedder, LexicalEmbedder};
use tracing::{info, info_span, warn, Instrument, Span};

use crate::cache::{ComparisonCache, ResultScope, DEFAULT_CACHE_CAPACITY};
use crate::error::ComparisonError;
use crate::providers::RevisionSource;
use crate::request::{ComparisonRequest, Fingerprint, ValidatedRequest};
use crate::response::ComparisonResult;
use crate::summarizer::NarrativeSummarizer;
use crate::{ComparePath, MetricsSpan};

type SharedComparison =
    Shared<BoxFuture<'static, Result<Arc<ComparisonResult>, ComparisonError>>>;

/// Tunables applied to every comparison a [`Comparator`] runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub align: AlignOptions,
    pub weights: MetricWeights,
    /// Additions and removals reported in the change summary.
    pub top_k: usize,
    pub embed_timeout: Duration,
    pub summarizer_timeout: Duration,
}

impl EngineSettings {
    pub fn validate(&self) -> Result<(), ComparisonError> {
        self.align.validate()?;
        self.weights.validate()?;
        if self.top_k == 0 {
            return Err(ComparisonError::InvalidConfig("top_k must be >= 1".into()));
        }
        if self.embed_timeout.is_zero() || self.summarizer_timeout.is_zero() {
            return Err(ComparisonError::InvalidConfig(
                "timeouts must be > 0".into(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            align: AlignOptions::default(),
            weights: MetricWeights::default(),
            top_k: DEFAULT_TOP_K,
            embed_timeout: Duration::from_secs(5),
            summarizer_timeout: Duration::from_secs(2),
        }
    }
}

/// Entry point for comparisons. Cheap to clone; clones share the cache and
/// the in-flight table.
///
/// Must be driven from within a tokio runtime: computations run on spawned
/// tasks so an abandoned caller never cancels work other callers await.
#[derive(Clone)]
pub struct Comparator {
    inner: Arc<Inner>,
}

struct Inner {
    source: Arc<dyn RevisionSource>,
    embedder: Arc<dyn Embedder>,
    summarizer: Option<Arc<dyn NarrativeSummarizer>>,
    cache: Arc<ComparisonCache>,
    scope: ResultScope,
    in_flight: DashMap<Fingerprint, SharedComparison>,
    settings: EngineSettings,
}

pub struct ComparatorBuilder {
    source: Arc<dyn RevisionSource>,
    embedder: Option<Arc<dyn Embedder>>,
    summarizer: Option<Arc<dyn NarrativeSummarizer>>,
    cache: Option<Arc<ComparisonCache>>,
    cache_capacity: usize,
    settings: EngineSettings,
}

impl ComparatorBuilder {
    /// Embedding provider for semantic and hybrid comparisons. Defaults to
    /// [`LexicalEmbedder`].
    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn summarizer(mut self, summarizer: Arc<dyn NarrativeSummarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Share an existing cache instead of allocating one. Comparators with
    /// different settings or providers never serve each other's entries.
    pub fn cache(mut self, cache: Arc<ComparisonCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn align_options(mut self, options: AlignOptions) -> Self {
        self.settings.align = options;
        self
    }

    pub fn metric_weights(mut self, weights: MetricWeights) -> Self {
        self.settings.weights = weights;
        self
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.settings.top_k = top_k;
        self
    }

    pub fn embed_timeout(mut self, timeout: Duration) -> Self {
        self.settings.embed_timeout = timeout;
        self
    }

    pub fn summarizer_timeout(mut self, timeout: Duration) -> Self {
        self.settings.summarizer_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Comparator, ComparisonError> {
        self.settings.validate()?;
        let cache = match self.cache {
            Some(cache) => cache,
            None => {
                let capacity = NonZeroUsize::new(self.cache_capacity).ok_or_else(|| {
                    ComparisonError::InvalidConfig("cache capacity must be >= 1".into())
                })?;
                Arc::new(ComparisonCache::new(capacity))
            }
        };
        let embedder = self
            .embedder
            .unwrap_or_else(|| Arc::new(LexicalEmbedder::new()));
        let scope = ResultScope::new(
            &self.settings,
            embedder.name(),
            self.summarizer.as_ref().map(|s| s.name()),
        )?;
        Ok(Comparator {
            inner: Arc::new(Inner {
                source: self.source,
                embedder,
                summarizer: self.summarizer,
                cache,
                scope,
                in_flight: DashMap::new(),
                settings: self.settings,
            }),
        })
    }
}

impl Comparator {
    pub fn builder(source: Arc<dyn RevisionSource>) -> ComparatorBuilder {
        ComparatorBuilder {
            source,
            embedder: None,
            summarizer: None,
            cache: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            settings: EngineSettings::default(),
        }
    }

    /// Run one comparison.
    ///
    /// Identical requests (same fingerprint) are served from the cache or
    /// joined to the computation already running for them. `force_recompute`
    /// drops the cached entry first; a successful computation always writes
    /// the cache.
    pub async fn compare(
        &self,
        request: &ComparisonRequest,
    ) -> Result<ComparisonResult, ComparisonError> {
        let metrics = MetricsSpan::start();
        let validated = match request.validate() {
            Ok(validated) => validated,
            Err(err) => {
                warn!(slug = %request.slug, error = %err, kind = err.kind(), "compare_rejected");
                if let Some(span) = metrics {
                    span.record(ComparePath::Rejected, Err(err.clone()));
                }
                return Err(err);
            }
        };

        let span = info_span!(
            "revdiff.compare",
            slug = %validated.slug,
            version_a = validated.version_a,
            version_b = validated.version_b,
            granularity = validated.config.granularity.as_str(),
            algorithm = validated.config.algorithm.as_str(),
            fingerprint = %validated.fingerprint,
        );
        let inner = Arc::clone(&self.inner);
        async move {
            let started = Instant::now();
            let (path, outcome) = inner.resolve(validated).await;
            match &outcome {
                Ok(_) => info!(
                    path = path.as_str(),
                    elapsed_micros = started.elapsed().as_micros() as u64,
                    "compare_success"
                ),
                Err(err) => warn!(error = %err, kind = err.kind(), "compare_failure"),
            }
            if let Some(span) = metrics {
                span.record(path, outcome.as_ref().map(|_| ()).map_err(Clone::clone));
            }
            outcome
        }
        .instrument(span)
        .await
    }

    pub fn cache(&self) -> &ComparisonCache {
        &self.inner.cache
    }

    /// Number of computations currently running.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.len()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.inner.settings
    }

    /// Scope this comparator's results are cached under.
    pub fn result_scope(&self) -> ResultScope {
        self.inner.scope
    }

    /// Drop every cached result. Running computations are unaffected.
    pub fn reset(&self) {
        self.inner.cache.clear();
    }
}

enum Flight {
    Cached(Arc<ComparisonResult>),
    Joined(SharedComparison),
    Started(SharedComparison),
}

impl Inner {
    async fn resolve(
        self: &Arc<Self>,
        request: ValidatedRequest,
    ) -> (ComparePath, Result<ComparisonResult, ComparisonError>) {
        // Thresholds in one bucket share an entry; echo this caller's value.
        let config = request.config;
        let echo = |mut result: ComparisonResult| {
            result.config = config;
            result
        };
        match self.start_or_join(request) {
            Flight::Cached(hit) => {
                info!("compare_cache_hit");
                (ComparePath::CacheHit, Ok(echo(hit.served_from_cache())))
            }
            Flight::Joined(flight) => {
                info!("compare_joined_in_flight");
                (
                    ComparePath::JoinedInFlight,
                    flight.await.map(Arc::unwrap_or_clone).map(echo),
                )
            }
            Flight::Started(flight) => (
                ComparePath::Computed,
                flight.await.map(Arc::unwrap_or_clone),
            ),
        }
    }

    /// Decide under the fingerprint's shard lock whether to serve the cache,
    /// join a running flight or start one, so a fingerprint never has two
    /// flights at once.
    fn start_or_join(self: &Arc<Self>, request: ValidatedRequest) -> Flight {
        let fingerprint = request.fingerprint.clone();
        match self.in_flight.entry(fingerprint.clone()) {
            Entry::Occupied(entry) => Flight::Joined(entry.get().clone()),
            Entry::Vacant(entry) => {
                if request.force_recompute {
                    self.cache.invalidate(&fingerprint);
                } else if let Some(hit) = self.cache.get(&fingerprint, &self.scope) {
                    return Flight::Cached(hit);
                }

                let inner = Arc::clone(self);
                let task = tokio::spawn(
                    async move {
                        let _guard = FlightGuard {
                            inner: Arc::clone(&inner),
                            fingerprint: request.fingerprint.clone(),
                        };
                        let outcome = inner.compute(&request).await.map(Arc::new);
                        if let Ok(result) = &outcome {
                            inner.cache.insert(
                                request.fingerprint.clone(),
                                inner.scope,
                                Arc::clone(result),
                            );
                        }
                        outcome
                    }
                    .instrument(Span::current()),
                );
                let flight = async move {
                    task.await.unwrap_or_else(|err| {
                        Err(ComparisonError::Internal(format!(
                            "comparison task failed: {err}"
                        )))
                    })
                }
                .boxed()
                .shared();
                entry.insert(flight.clone());
                Flight::Started(flight)
            }
        }
    }

    async fn compute(&self, request: &ValidatedRequest) -> Result<ComparisonResult, ComparisonError> {
        let started = Instant::now();
        let (text_a, text_b) = tokio::try_join!(
            self.source.fetch(&request.slug, request.version_a),
            self.source.fetch(&request.slug, request.version_b),
        )?;

        let config = request.config;
        let granularity = config.granularity;
        // Bytes bound the token count from above.
        let heavy = text_a.len() + text_b.len() > self.settings.align.offload_token_threshold;
        let a_text: Arc<str> = Arc::from(text_a);
        let b_text: Arc<str> = Arc::from(text_b);

        let (a_tokens, b_tokens) = {
            let (a, b) = (Arc::clone(&a_text), Arc::clone(&b_text));
            offload(heavy, move || {
                let a: Arc<[Token]> = Arc::from(segment(&a, granularity));
                let b: Arc<[Token]> = Arc::from(segment(&b, granularity));
                (a, b)
            })
            .await?
        };

        let ctx = SemanticContext {
            embedder: self.embedder.as_ref(),
            timeout: self.settings.embed_timeout,
        };
        let Alignment {
            operations,
            warnings,
        } = align(a_tokens, b_tokens, &config, &self.settings.align, ctx).await?;

        let weights = self.settings.weights;
        let top_k = self.settings.top_k;
        let (operations, metrics, mut change_summary, statistics) = offload(heavy, move || {
            let metrics = aggregate(&operations, &a_text, &b_text, &weights);
            let summary = group_changes(&operations, top_k);
            let statistics = DiffStatistics::from_operations(&operations);
            (operations, metrics, summary, statistics)
        })
        .await?;

        if let Some(summarizer) = &self.summarizer {
            let call = summarizer.summarize(&change_summary, &operations, &metrics);
            match tokio::time::timeout(self.settings.summarizer_timeout, call).await {
                Ok(Ok(narrative)) => {
                    change_summary.executive_summary = Some(narrative.executive_summary);
                    change_summary.risk_level = narrative.risk_level;
                }
                Ok(Err(err)) => {
                    warn!(summarizer = summarizer.name(), error = %err, "summarizer_failed")
                }
                Err(_) => warn!(
                    summarizer = summarizer.name(),
                    error = "timed out",
                    "summarizer_failed"
                ),
            }
        }

        Ok(ComparisonResult {
            slug: request.slug.clone(),
            version_a: request.version_a,
            version_b: request.version_b,
            config,
            fingerprint: request.fingerprint.clone(),
            operations,
            metrics,
            change_summary,
            statistics,
            warnings,
            processing_time_ms: started.elapsed().as_millis() as u64,
            cached: false,
            computed_at: Utc::now(),
        })
    }
}

/// Clears the in-flight entry when its task ends, panics included.
struct FlightGuard {
    inner: Arc<Inner>,
    fingerprint: Fingerprint,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.inner.in_flight.remove(&self.fingerprint);
    }
}

async fn offload<T, F>(heavy: bool, work: F) -> Result<T, ComparisonError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    if !heavy {
        return Ok(work());
    }
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| ComparisonError::Internal(format!("blocking task failed: {err}")))
}
