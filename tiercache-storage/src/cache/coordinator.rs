//! Per-namespace cache facade.
//!
//! [`Cache`] owns one key tier, one list tier and one scalar tier for a
//! single namespace. Reads route to the matching tier. Every record change
//! must be routed through [`Cache::remove`], [`Cache::remove_key`] or
//! [`Cache::apply`] so derived entries stay exact; there is no hook into the
//! store that would do it implicitly.
//!
//! # Pre-image and post-image
//!
//! An update can invalidate a filtered result in two ways: the old version
//! satisfied the filter (and must leave the list) or the new version does
//! (and must join it). Only evaluating both images is safe, which is what
//! [`Cache::apply`] does for [`Mutation::Update`]. [`Cache::remove`] only sees
//! the image it is given, so callers using it for an update must call it
//! with both.

use tiercache_core::{
    CacheConfig, CacheError, CacheResult, Ordering, Predicate, Record, RecordKind, UniqueKey,
    UnknownKeyPolicy, Value,
};

use super::condition_cache::{ListResultCache, RecordList, ScalarResultCache};
use super::key_cache::KeyCache;
use super::traits::{CacheStats, Tier};

/// A change to a persisted record, as reported by the caller after the
/// store accepted it.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Insert(Record),
    Update { before: Record, after: Record },
    Delete(Record),
}

impl Mutation {
    pub fn kind(&self) -> &RecordKind {
        match self {
            Self::Insert(record) | Self::Delete(record) => record.kind(),
            Self::Update { after, .. } => after.kind(),
        }
    }

    /// Every image predicates must be evaluated against.
    fn images(&self) -> Vec<&Record> {
        match self {
            Self::Insert(record) | Self::Delete(record) => vec![record],
            Self::Update { before, after } => vec![before, after],
        }
    }
}

/// What an invalidation removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invalidation {
    /// Record the key tier held before the call.
    pub previous: Option<Record>,
    pub lists_removed: usize,
    pub scalars_removed: usize,
}

/// Counters for all three tiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    pub records: CacheStats,
    pub lists: CacheStats,
    pub scalars: CacheStats,
}

/// Three-tier cache for one namespace.
#[derive(Debug)]
pub struct Cache {
    namespace: String,
    config: CacheConfig,
    records: KeyCache,
    lists: ListResultCache,
    scalars: ScalarResultCache,
}

impl Cache {
    /// Create an unbounded cache for `namespace`.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self::build(namespace.into(), CacheConfig::default())
    }

    /// Create a cache for `namespace` after validating `config`.
    pub fn with_config(namespace: impl Into<String>, config: CacheConfig) -> CacheResult<Self> {
        config.validate()?;
        Ok(Self::build(namespace.into(), config))
    }

    fn build(namespace: String, config: CacheConfig) -> Self {
        tracing::debug!(namespace = %namespace, ?config, "creating cache");
        Self {
            records: KeyCache::with_config(&config),
            lists: ListResultCache::with_config(&config),
            scalars: ScalarResultCache::with_config(&config),
            namespace,
            config,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn records(&self) -> &KeyCache {
        &self.records
    }

    pub fn lists(&self) -> &ListResultCache {
        &self.lists
    }

    pub fn scalars(&self) -> &ScalarResultCache {
        &self.scalars
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn get(&self, key: &UniqueKey) -> Option<Record> {
        self.records.get(key)
    }

    pub fn get_list(
        &self,
        kind: &RecordKind,
        predicate: &Predicate,
        ordering: &Ordering,
    ) -> Option<RecordList> {
        self.lists.get(kind, predicate, ordering)
    }

    pub fn get_scalar(&self, kind: &RecordKind, predicate: &Predicate, name: &str) -> Option<Value> {
        self.scalars.get(kind, predicate, name)
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Cache `record` under its derived unique key.
    pub fn put(&self, record: Record) -> CacheResult<Option<Record>> {
        let key = record.unique_key()?;
        self.put_keyed(key, record)
    }

    /// Write through to the key tier only.
    ///
    /// Derived entries are not touched: a bare put cannot know what the
    /// record looked like before. Use [`Cache::apply`] for changes.
    pub fn put_keyed(&self, key: UniqueKey, record: Record) -> CacheResult<Option<Record>> {
        self.records.put(key, record)
    }

    pub fn put_list(
        &self,
        kind: &RecordKind,
        predicate: Predicate,
        ordering: Ordering,
        list: RecordList,
    ) -> CacheResult<RecordList> {
        self.lists.put(kind, predicate, ordering, list)
    }

    pub fn put_scalar(
        &self,
        kind: &RecordKind,
        predicate: Predicate,
        name: impl Into<String>,
        value: Value,
    ) -> CacheResult<Value> {
        self.scalars.put(kind, predicate, name.into(), value)
    }

    // ------------------------------------------------------------------
    // Invalidation
    // ------------------------------------------------------------------

    /// Drop every entry of `kind` in all three tiers.
    pub fn remove_kind(&self, kind: &RecordKind) {
        let records = self.records.remove_kind(kind);
        let lists = self.lists.remove_kind(kind);
        let scalars = self.scalars.remove_kind(kind);
        tracing::debug!(
            namespace = %self.namespace,
            kind = %kind,
            records,
            lists,
            scalars,
            "kind invalidated"
        );
    }

    /// Drop every list and scalar entry computed for `(kind, predicate)`.
    pub fn remove_condition(&self, kind: &RecordKind, predicate: &Predicate) {
        let lists = self.lists.remove_condition(kind, predicate);
        let scalars = self.scalars.remove_condition(kind, predicate);
        tracing::debug!(
            namespace = %self.namespace,
            kind = %kind,
            %predicate,
            lists,
            scalars,
            "condition invalidated"
        );
    }

    pub fn remove_list(
        &self,
        kind: &RecordKind,
        predicate: &Predicate,
        ordering: &Ordering,
    ) -> Option<RecordList> {
        self.lists.remove(kind, predicate, ordering)
    }

    pub fn remove_scalar(&self, kind: &RecordKind, predicate: &Predicate, name: &str) -> Option<Value> {
        self.scalars.remove(kind, predicate, name)
    }

    /// Remove `record` from the key tier and every derived entry whose
    /// predicate it satisfies. Returns the record the key tier held.
    pub fn remove(&self, record: &Record) -> CacheResult<Option<Record>> {
        let key = record.unique_key()?;
        let previous = self.records.remove(&key);
        self.fan_out(record.kind(), &[record])?;
        Ok(previous)
    }

    /// Remove by key, using the cached record as the image to evaluate.
    ///
    /// When the key tier holds nothing for `key` there is no image to test,
    /// and derived entries for the kind may still reflect the record. The
    /// configured [`UnknownKeyPolicy`] decides whether to drop them all.
    pub fn remove_key(&self, key: &UniqueKey) -> CacheResult<Option<Record>> {
        match self.records.remove(key) {
            Some(previous) => {
                self.fan_out(key.kind(), &[&previous])?;
                Ok(Some(previous))
            }
            None => {
                self.unknown_key(key);
                Ok(None)
            }
        }
    }

    /// Route a store mutation through the cache.
    ///
    /// Derived entries are invalidated against every image the mutation
    /// carries, then the key tier is brought up to date: inserts and
    /// updates store the new record, deletes remove it. If the fan-out
    /// fails, every image's key is evicted from the key tier before the
    /// error is returned.
    pub fn apply(&self, mutation: &Mutation) -> CacheResult<Invalidation> {
        let kind = mutation.kind();
        if let Mutation::Update { before, after } = mutation {
            if before.kind() != after.kind() {
                return Err(CacheError::KindMismatch {
                    expected: before.kind().clone(),
                    actual: after.kind().clone(),
                });
            }
        }

        let images = mutation.images();
        let (lists_removed, scalars_removed) = match self.fan_out(kind, &images) {
            Ok(counts) => counts,
            Err(err) => {
                // The store already holds the change; no image may stay keyed.
                for image in &images {
                    if let Ok(key) = image.unique_key() {
                        self.records.remove(&key);
                    }
                }
                return Err(err);
            }
        };

        let previous = match mutation {
            Mutation::Insert(record) => self.put(record.clone())?,
            Mutation::Update { before, after } => {
                let old_key = before.unique_key()?;
                let new_key = after.unique_key()?;
                if old_key == new_key {
                    self.put_keyed(new_key, after.clone())?
                } else {
                    let previous = self.records.remove(&old_key);
                    self.put_keyed(new_key, after.clone())?;
                    previous
                }
            }
            Mutation::Delete(record) => self.records.remove(&record.unique_key()?),
        };

        Ok(Invalidation {
            previous,
            lists_removed,
            scalars_removed,
        })
    }

    /// Drop everything in all three tiers.
    pub fn clear(&self) {
        self.records.clear();
        self.lists.clear();
        self.scalars.clear();
        tracing::debug!(namespace = %self.namespace, "cache cleared");
    }

    pub fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            records: self.records.stats(),
            lists: self.lists.stats(),
            scalars: self.scalars.stats(),
        }
    }

    /// Predicate fan-out over both derived tiers for each image.
    ///
    /// If any evaluation fails the derived tiers for `kind` are dropped
    /// wholesale before the error is returned, so a bad predicate can never
    /// leave a stale entry behind.
    fn fan_out(&self, kind: &RecordKind, images: &[&Record]) -> CacheResult<(usize, usize)> {
        let mut lists = 0;
        let mut scalars = 0;
        for image in images {
            let result = self
                .lists
                .remove_matching(kind, image)
                .and_then(|l| Ok((l, self.scalars.remove_matching(kind, image)?)));
            match result {
                Ok((l, s)) => {
                    lists += l;
                    scalars += s;
                }
                Err(err) => {
                    tracing::error!(
                        namespace = %self.namespace,
                        kind = %kind,
                        error = %err,
                        "predicate fan-out failed, dropping derived entries for kind"
                    );
                    self.lists.remove_kind(kind);
                    self.scalars.remove_kind(kind);
                    return Err(err);
                }
            }
        }
        tracing::debug!(
            namespace = %self.namespace,
            kind = %kind,
            images = images.len(),
            lists,
            scalars,
            "record invalidated"
        );
        Ok((lists, scalars))
    }

    fn unknown_key(&self, key: &UniqueKey) {
        match self.config.unknown_key_policy {
            UnknownKeyPolicy::InvalidateKind => {
                let lists = self.lists.remove_kind(key.kind());
                let scalars = self.scalars.remove_kind(key.kind());
                tracing::warn!(
                    namespace = %self.namespace,
                    key = %key,
                    lists,
                    scalars,
                    "removed key not cached, derived entries dropped for kind"
                );
            }
            UnknownKeyPolicy::Skip => {
                tracing::warn!(
                    namespace = %self.namespace,
                    key = %key,
                    "removed key not cached, derived entries left in place"
                );
            }
        }
    }
}
