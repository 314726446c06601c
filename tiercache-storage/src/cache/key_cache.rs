//! Key tier: unique key to full record.
//!
//! A direct-mapped cache with no derived state and no invalidation fan-out.
//! Entries are partitioned by kind so whole-kind removal is a single map
//! operation; within a kind every key is independently locked.

use dashmap::DashMap;
use tiercache_core::{
    CacheConfig, CacheError, CacheResult, OverflowPolicy, Record, RecordKind, UniqueKey,
};

use super::traits::{CacheStats, StatsCounter, Tier};

type Partition = DashMap<UniqueKey, Record>;

/// Unique-key to record cache.
#[derive(Debug, Default)]
pub struct KeyCache {
    partitions: DashMap<RecordKind, Partition>,
    max_per_kind: Option<usize>,
    overflow: OverflowPolicy,
    stats: StatsCounter,
}

impl KeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a key tier honouring the record bound of `config`.
    pub fn with_config(config: &CacheConfig) -> Self {
        Self {
            max_per_kind: config.max_records_per_kind,
            overflow: config.overflow,
            ..Self::default()
        }
    }

    pub fn get(&self, key: &UniqueKey) -> Option<Record> {
        let found = self
            .partitions
            .get(key.kind())
            .and_then(|partition| partition.get(key).map(|r| r.value().clone()));
        tracing::trace!(key = %key, hit = found.is_some(), "key cache lookup");
        self.stats.lookup(found)
    }

    /// Store `record` under `key`, replacing unconditionally.
    ///
    /// Returns the record previously stored for this exact key, so callers
    /// can tell an update from an insert.
    pub fn put(&self, key: UniqueKey, record: Record) -> CacheResult<Option<Record>> {
        if key.kind() != record.kind() {
            return Err(CacheError::KindMismatch {
                expected: key.kind().clone(),
                actual: record.kind().clone(),
            });
        }

        let partition = match self.partitions.get(key.kind()) {
            Some(partition) => partition,
            None => self
                .partitions
                .entry(key.kind().clone())
                .or_default()
                .downgrade(),
        };

        if let Some(max) = self.max_per_kind {
            if partition.len() >= max && !partition.contains_key(&key) {
                match self.overflow {
                    OverflowPolicy::Reject => {
                        return Err(CacheError::CapacityExceeded {
                            tier: self.name(),
                            kind: key.kind().clone(),
                            capacity: max,
                        });
                    }
                    OverflowPolicy::ClearPartition => {
                        let dropped = partition.len();
                        partition.clear();
                        self.stats.evicted(dropped);
                        tracing::warn!(
                            kind = %key.kind(),
                            dropped,
                            capacity = max,
                            "key cache partition full, cleared"
                        );
                    }
                }
            }
        }

        Ok(partition.insert(key, record))
    }

    pub fn remove(&self, key: &UniqueKey) -> Option<Record> {
        let removed = self
            .partitions
            .get(key.kind())
            .and_then(|partition| partition.remove(key))
            .map(|(_, record)| record);
        if removed.is_some() {
            self.stats.invalidated(1);
        }
        removed
    }

    /// Drop every record of `kind`.
    pub fn remove_all(&self, kind: &RecordKind) -> usize {
        let dropped = self
            .partitions
            .remove(kind)
            .map(|(_, partition)| partition.len())
            .unwrap_or(0);
        self.stats.invalidated(dropped);
        tracing::debug!(kind = %kind, dropped, "key cache kind removed");
        dropped
    }
}

impl Tier for KeyCache {
    fn name(&self) -> &'static str {
        "key"
    }

    fn len(&self) -> usize {
        self.partitions.iter().map(|p| p.len()).sum()
    }

    fn len_kind(&self, kind: &RecordKind) -> usize {
        self.partitions.get(kind).map(|p| p.len()).unwrap_or(0)
    }

    fn remove_kind(&self, kind: &RecordKind) -> usize {
        self.remove_all(kind)
    }

    fn clear(&self) {
        let dropped = self.len();
        self.partitions.clear();
        self.stats.invalidated(dropped);
    }

    fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.len())
    }
}
