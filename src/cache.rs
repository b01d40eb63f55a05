//! Bounded LRU memo of finished comparisons.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use lru::LruCache;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::engine::EngineSettings;
use crate::error::ComparisonError;
use crate::request::Fingerprint;
use crate::response::ComparisonResult;

pub const DEFAULT_CACHE_CAPACITY: usize = 256;

const SCOPE_DOMAIN: &[u8] = b"revdiff-scope-v1";

/// Digest of the comparator-side inputs that shape a result: alignment
/// options, metric weights, `top_k` and the provider names.
///
/// A [`Fingerprint`] only identifies the request. Comparators sharing one
/// cache only see entries stored under their own scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ResultScope([u8; 32]);

impl ResultScope {
    pub fn new(
        settings: &EngineSettings,
        embedder: &str,
        summarizer: Option<&str>,
    ) -> Result<Self, ComparisonError> {
        let shaping = serde_json::to_vec(&(&settings.align, &settings.weights, settings.top_k))
            .map_err(|err| ComparisonError::Internal(format!("encoding engine settings: {err}")))?;
        let mut hasher = Sha256::new();
        hasher.update(SCOPE_DOMAIN);
        hasher.update([0u8]);
        hasher.update(&shaping);
        hasher.update([0u8]);
        hasher.update(embedder.as_bytes());
        hasher.update([0u8]);
        hasher.update(summarizer.unwrap_or_default().as_bytes());
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&hasher.finalize());
        Ok(Self(digest))
    }
}

impl std::fmt::Display for ResultScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(&self.0[..8]))
    }
}

struct CacheEntry {
    scope: ResultScope,
    result: Arc<ComparisonResult>,
}

/// Counters exposed for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Lookups that found an entry stored under another [`ResultScope`].
    pub scope_mismatches: u64,
    /// Entries dropped on read because they failed validation.
    pub evictions_invalid: u64,
    pub len: usize,
}

/// Owned comparison cache. Entries are immutable and replaced wholesale.
///
/// Reads validate the stored entry; an entry keyed under the wrong
/// fingerprint or carrying out-of-range metrics is evicted and reported as a
/// miss. An entry from another scope is a miss and is left to be replaced.
pub struct ComparisonCache {
    entries: Mutex<LruCache<Fingerprint, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    scope_mismatches: AtomicU64,
    evictions_invalid: AtomicU64,
}

impl ComparisonCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            scope_mismatches: AtomicU64::new(0),
            evictions_invalid: AtomicU64::new(0),
        }
    }

    pub fn get(
        &self,
        fingerprint: &Fingerprint,
        scope: &ResultScope,
    ) -> Option<Arc<ComparisonResult>> {
        let mut entries = self.lock();
        let Some((stored, entry)) = entries
            .get(fingerprint)
            .map(|e| (e.scope, Arc::clone(&e.result)))
        else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };
        if stored != *scope {
            self.scope_mismatches.fetch_add(1, Ordering::Relaxed);
            self.misses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                fingerprint = %fingerprint,
                stored = %stored,
                scope = %scope,
                "cache_scope_mismatch"
            );
            return None;
        }
        if entry.fingerprint != *fingerprint || !entry.metrics.is_well_formed() {
            entries.pop(fingerprint);
            self.evictions_invalid.fetch_add(1, Ordering::Relaxed);
            self.misses.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(fingerprint = %fingerprint, "cache_entry_invalid");
            return None;
        }
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(entry)
    }

    pub fn insert(
        &self,
        fingerprint: Fingerprint,
        scope: ResultScope,
        result: Arc<ComparisonResult>,
    ) {
        self.lock().put(fingerprint, CacheEntry { scope, result });
    }

    pub fn invalidate(&self, fingerprint: &Fingerprint) -> bool {
        self.lock().pop(fingerprint).is_some()
    }

    /// Drop every entry and reset the counters.
    pub fn clear(&self) {
        self.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.scope_mismatches.store(0, Ordering::Relaxed);
        self.evictions_invalid.store(0, Ordering::Relaxed);
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.lock().contains(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            scope_mismatches: self.scope_mismatches.load(Ordering::Relaxed),
            evictions_invalid: self.evictions_invalid.load(Ordering::Relaxed),
            len: self.len(),
        }
    }

    // The map holds only Arcs, so a poisoned guard is still consistent.
    fn lock(&self) -> MutexGuard<'_, LruCache<Fingerprint, CacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ComparisonCache {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN))
    }
}

impl std::fmt::Debug for ComparisonCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComparisonCache")
            .field("stats", &self.stats())
            .finish()
    }
}
