//! Tier trait and cache statistics.
//!
//! Every tier is partitioned by record kind and supports the same coarse
//! operations; the coordinator drives those through [`Tier`] so that
//! whole-kind and whole-cache invalidation treat all tiers alike.

use std::sync::atomic::{AtomicU64, Ordering};
use tiercache_core::RecordKind;

/// Coarse operations shared by all cache tiers.
///
/// Implementations must be safe to call concurrently with each other and
/// with the tier's per-entry operations.
pub trait Tier: Send + Sync {
    /// Short tier name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Number of entries across all kinds.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries for one kind.
    fn len_kind(&self, kind: &RecordKind) -> usize;

    /// Drop every entry for `kind`. Returns how many were dropped.
    fn remove_kind(&self, kind: &RecordKind) -> usize;

    /// Drop everything.
    fn clear(&self);

    /// Snapshot of this tier's counters.
    fn stats(&self) -> CacheStats;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Number of entries dropped by the overflow policy.
    pub evictions: u64,
    /// Number of entries removed by explicit or fan-out invalidation.
    pub invalidations: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Lock-free counters backing [`CacheStats`].
#[derive(Debug, Default)]
pub(crate) struct StatsCounter {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    invalidations: AtomicU64,
}

impl StatsCounter {
    pub(crate) fn lookup<T>(&self, found: Option<T>) -> Option<T> {
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub(crate) fn evicted(&self, n: usize) {
        self.evictions.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn invalidated(&self, n: usize) {
        self.invalidations.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, entry_count: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: entry_count as u64,
            evictions: self.evictions.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}
