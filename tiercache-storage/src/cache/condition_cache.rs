//! Condition-keyed tiers: list results and scalar results.
//!
//! Both tiers share one implementation, [`ConditionCache`], keyed by
//! `(kind, predicate, extra)` where `extra` is the [`Ordering`] for lists and
//! the result name for scalars.
//!
//! Inside a kind partition entries are grouped by predicate. Predicate-matching
//! invalidation therefore evaluates each distinct predicate once, and removes
//! the whole group (every ordering, every named result) when it matches.
//!
//! # Atomicity
//!
//! A fan-out holds the kind partition's write guard from the first
//! evaluation to the last removal. No `get` that starts after the fan-out
//! returns can observe an entry it removed. Puts for the same kind
//! serialize with the fan-out; puts for other kinds are unaffected.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tiercache_core::{
    CacheConfig, CacheError, CacheResult, Ordering, OverflowPolicy, Predicate, Record,
    RecordKind, Value,
};

use super::traits::{CacheStats, StatsCounter, Tier};

/// Shared, immutable list of records as cached for one query shape.
pub type RecordList = Arc<[Record]>;

/// `(kind, predicate, ordering)` to ordered records.
pub type ListResultCache = ConditionCache<Ordering, RecordList>;

/// `(kind, predicate, result name)` to a single derived value.
pub type ScalarResultCache = ConditionCache<String, Value>;

#[derive(Debug)]
struct Partition<X, V> {
    conditions: HashMap<Predicate, HashMap<X, V>>,
}

impl<X, V> Default for Partition<X, V> {
    fn default() -> Self {
        Self {
            conditions: HashMap::new(),
        }
    }
}

impl<X, V> Partition<X, V> {
    fn len(&self) -> usize {
        self.conditions.values().map(HashMap::len).sum()
    }

    fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// Cache of values derived from a predicate over one record kind.
#[derive(Debug)]
pub struct ConditionCache<X, V> {
    name: &'static str,
    partitions: DashMap<RecordKind, Partition<X, V>>,
    max_per_kind: Option<usize>,
    overflow: OverflowPolicy,
    stats: StatsCounter,
}

impl ListResultCache {
    /// Create a list tier honouring the list bound of `config`.
    pub fn with_config(config: &CacheConfig) -> Self {
        Self::bounded("list", config.max_lists_per_kind, config.overflow)
    }
}

impl ScalarResultCache {
    /// Create a scalar tier honouring the scalar bound of `config`.
    pub fn with_config(config: &CacheConfig) -> Self {
        Self::bounded("scalar", config.max_scalars_per_kind, config.overflow)
    }
}

impl<X, V> ConditionCache<X, V>
where
    X: Eq + Hash,
    V: Clone,
{
    /// Create an unbounded tier.
    pub fn new(name: &'static str) -> Self {
        Self::bounded(name, None, OverflowPolicy::default())
    }

    pub fn bounded(name: &'static str, max_per_kind: Option<usize>, overflow: OverflowPolicy) -> Self {
        Self {
            name,
            partitions: DashMap::new(),
            max_per_kind,
            overflow,
            stats: StatsCounter::default(),
        }
    }

    pub fn get<Q>(&self, kind: &RecordKind, predicate: &Predicate, extra: &Q) -> Option<V>
    where
        X: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let found = self.partitions.get(kind).and_then(|partition| {
            partition
                .conditions
                .get(predicate)
                .and_then(|entries| entries.get(extra))
                .cloned()
        });
        tracing::trace!(tier = self.name, kind = %kind, %predicate, hit = found.is_some(), "condition cache lookup");
        self.stats.lookup(found)
    }

    /// Establish an entry, returning the stored value.
    pub fn put(
        &self,
        kind: &RecordKind,
        predicate: Predicate,
        extra: X,
        value: V,
    ) -> CacheResult<V> {
        let mut partition = self.partitions.entry(kind.clone()).or_default();

        if let Some(max) = self.max_per_kind {
            let exists = partition
                .conditions
                .get(&predicate)
                .is_some_and(|entries| entries.contains_key(&extra));
            if !exists && partition.len() >= max {
                match self.overflow {
                    OverflowPolicy::Reject => {
                        return Err(CacheError::CapacityExceeded {
                            tier: self.name,
                            kind: kind.clone(),
                            capacity: max,
                        });
                    }
                    OverflowPolicy::ClearPartition => {
                        let dropped = partition.len();
                        partition.conditions.clear();
                        self.stats.evicted(dropped);
                        tracing::warn!(
                            tier = self.name,
                            kind = %kind,
                            dropped,
                            capacity = max,
                            "condition cache partition full, cleared"
                        );
                    }
                }
            }
        }

        partition
            .conditions
            .entry(predicate)
            .or_default()
            .insert(extra, value.clone());
        Ok(value)
    }

    /// Remove one exact entry.
    pub fn remove<Q>(&self, kind: &RecordKind, predicate: &Predicate, extra: &Q) -> Option<V>
    where
        X: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let removed = self.partitions.get_mut(kind).and_then(|mut partition| {
            let entries = partition.conditions.get_mut(predicate)?;
            let removed = entries.remove(extra);
            if entries.is_empty() {
                partition.conditions.remove(predicate);
            }
            removed
        });
        if removed.is_some() {
            self.stats.invalidated(1);
            self.prune(kind);
        }
        removed
    }

    /// Remove every entry for `(kind, predicate)` whatever its extra key part.
    pub fn remove_condition(&self, kind: &RecordKind, predicate: &Predicate) -> usize {
        let removed = self
            .partitions
            .get_mut(kind)
            .and_then(|mut partition| partition.conditions.remove(predicate))
            .map(|entries| entries.len())
            .unwrap_or(0);
        if removed > 0 {
            self.stats.invalidated(removed);
            self.prune(kind);
        }
        removed
    }

    /// Predicate-matching invalidation.
    ///
    /// Evaluates every cached predicate under `kind` against `record` and
    /// removes every entry whose predicate is satisfied. Evaluation finishes
    /// before anything is removed, so an `InvalidOperand` failure leaves the
    /// tier untouched.
    pub fn remove_matching(&self, kind: &RecordKind, record: &Record) -> CacheResult<usize> {
        if record.kind() != kind {
            return Err(CacheError::KindMismatch {
                expected: kind.clone(),
                actual: record.kind().clone(),
            });
        }

        let (evaluated, removed) = {
            let Some(mut partition) = self.partitions.get_mut(kind) else {
                return Ok(0);
            };

            let mut matched = Vec::new();
            for predicate in partition.conditions.keys() {
                if predicate.evaluate(record)? {
                    matched.push(predicate.clone());
                }
            }

            let evaluated = partition.conditions.len();
            let removed: usize = matched
                .iter()
                .filter_map(|predicate| partition.conditions.remove(predicate))
                .map(|entries| entries.len())
                .sum();
            (evaluated, removed)
        };

        if removed > 0 {
            self.stats.invalidated(removed);
            self.prune(kind);
        }
        tracing::debug!(
            tier = self.name,
            kind = %kind,
            evaluated,
            removed,
            "predicate fan-out"
        );
        Ok(removed)
    }

    /// Drop the kind's partition if it no longer holds anything.
    fn prune(&self, kind: &RecordKind) {
        self.partitions.remove_if(kind, |_, partition| partition.is_empty());
    }
}

impl<X, V> Tier for ConditionCache<X, V>
where
    X: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn len(&self) -> usize {
        self.partitions.iter().map(|p| p.len()).sum()
    }

    fn len_kind(&self, kind: &RecordKind) -> usize {
        self.partitions.get(kind).map(|p| p.len()).unwrap_or(0)
    }

    fn remove_kind(&self, kind: &RecordKind) -> usize {
        let dropped = self
            .partitions
            .remove(kind)
            .map(|(_, partition)| partition.len())
            .unwrap_or(0);
        self.stats.invalidated(dropped);
        tracing::debug!(tier = self.name, kind = %kind, dropped, "condition cache kind removed");
        dropped
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

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: i64, status: &str, total: i64) -> Record {
        Record::builder("Order")
            .key("id", id)
            .field("status", status)
            .field("total", total)
            .build()
    }

    fn kind() -> RecordKind {
        RecordKind::new("Order")
    }

    fn list(records: &[Record]) -> RecordList {
        records.to_vec().into()
    }

    #[test]
    fn test_list_put_get_remove() {
        let cache = ListResultCache::new("list");
        let open = Predicate::eq("status", "OPEN");
        let rows = list(&[order(1, "OPEN", 5), order(2, "OPEN", 7)]);

        let stored = cache
            .put(&kind(), open.clone(), Ordering::asc("id"), rows.clone())
            .unwrap();
        assert_eq!(stored, rows);
        assert_eq!(cache.get(&kind(), &open, &Ordering::asc("id")), Some(rows.clone()));
        assert_eq!(cache.get(&kind(), &open, &Ordering::desc("id")), None);

        assert_eq!(cache.remove(&kind(), &open, &Ordering::asc("id")), Some(rows));
        assert_eq!(cache.remove(&kind(), &open, &Ordering::asc("id")), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear_counts_invalidations() {
        let cache = ListResultCache::new("list");
        let open = Predicate::eq("status", "OPEN");
        cache
            .put(&kind(), open.clone(), Ordering::asc("id"), list(&[]))
            .unwrap();
        cache
            .put(&kind(), open, Ordering::desc("id"), list(&[]))
            .unwrap();
        cache
            .put(&RecordKind::new("Customer"), Predicate::True, Ordering::unordered(), list(&[]))
            .unwrap();

        cache.clear();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().invalidations, 3);
    }

    #[test]
    fn test_scalar_lookup_by_str() {
        let cache = ScalarResultCache::new("scalar");
        let open = Predicate::eq("status", "OPEN");
        cache
            .put(&kind(), open.clone(), "count".to_string(), Value::Int(2))
            .unwrap();

        assert_eq!(cache.get(&kind(), &open, "count"), Some(Value::Int(2)));
        assert_eq!(cache.get(&kind(), &open, "sum"), None);
        assert_eq!(cache.get(&"Customer".into(), &open, "count"), None);
    }

    #[test]
    fn test_remove_condition_drops_every_extra() {
        let cache = ListResultCache::new("list");
        let open = Predicate::eq("status", "OPEN");
        let big = Predicate::gt("total", 100);
        cache.put(&kind(), open.clone(), Ordering::asc("id"), list(&[])).unwrap();
        cache.put(&kind(), open.clone(), Ordering::desc("id"), list(&[])).unwrap();
        cache.put(&kind(), big.clone(), Ordering::asc("id"), list(&[])).unwrap();

        assert_eq!(cache.remove_condition(&kind(), &open), 2);
        assert_eq!(cache.len_kind(&kind()), 1);
        assert!(cache.get(&kind(), &big, &Ordering::asc("id")).is_some());
        assert_eq!(cache.remove_condition(&kind(), &open), 0);
    }

    #[test]
    fn test_remove_matching_removes_only_satisfied_predicates() {
        let cache = ScalarResultCache::new("scalar");
        let open = Predicate::eq("status", "OPEN");
        let closed = Predicate::eq("status", "CLOSED");
        let big = Predicate::gt("total", 100);
        for p in [&open, &closed, &big] {
            cache.put(&kind(), p.clone(), "count".into(), Value::Int(1)).unwrap();
            cache.put(&kind(), p.clone(), "sum".into(), Value::Int(1)).unwrap();
        }

        let removed = cache.remove_matching(&kind(), &order(1, "OPEN", 500)).unwrap();
        assert_eq!(removed, 4);
        assert_eq!(cache.get(&kind(), &open, "count"), None);
        assert_eq!(cache.get(&kind(), &big, "sum"), None);
        assert_eq!(cache.get(&kind(), &closed, "count"), Some(Value::Int(1)));
        assert_eq!(cache.get(&kind(), &closed, "sum"), Some(Value::Int(1)));
    }

    #[test]
    fn test_remove_matching_missing_field_is_atomic() {
        let cache = ListResultCache::new("list");
        let open = Predicate::eq("status", "OPEN");
        let region = Predicate::eq("region", "EU");
        cache.put(&kind(), open.clone(), Ordering::unordered(), list(&[])).unwrap();
        cache.put(&kind(), region, Ordering::unordered(), list(&[])).unwrap();

        let err = cache
            .remove_matching(&kind(), &order(1, "OPEN", 1))
            .unwrap_err();
        assert!(matches!(err, CacheError::InvalidOperand { ref field, .. } if field == "region"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_remove_matching_rejects_foreign_kind() {
        let cache = ListResultCache::new("list");
        let customer = Record::builder("Customer").key("id", 1).build();
        assert!(matches!(
            cache.remove_matching(&kind(), &customer),
            Err(CacheError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_remove_matching_on_empty_kind() {
        let cache = ListResultCache::new("list");
        assert_eq!(cache.remove_matching(&kind(), &order(1, "OPEN", 1)).unwrap(), 0);
    }

    #[test]
    fn test_remove_kind_is_scoped() {
        let cache = ListResultCache::new("list");
        let all = Predicate::True;
        cache.put(&kind(), all.clone(), Ordering::unordered(), list(&[])).unwrap();
        cache.put(&"Customer".into(), all.clone(), Ordering::unordered(), list(&[])).unwrap();

        assert_eq!(cache.remove_kind(&kind()), 1);
        assert!(cache.get(&"Customer".into(), &all, &Ordering::unordered()).is_some());
    }

    #[test]
    fn test_overflow_clear_partition() {
        let cache = ListResultCache::with_config(&CacheConfig::new().with_max_lists(2));
        for status in ["A", "B"] {
            cache
                .put(&kind(), Predicate::eq("status", status), Ordering::unordered(), list(&[]))
                .unwrap();
        }
        cache
            .put(&kind(), Predicate::eq("status", "C"), Ordering::unordered(), list(&[]))
            .unwrap();

        assert_eq!(cache.len_kind(&kind()), 1);
        assert!(cache
            .get(&kind(), &Predicate::eq("status", "C"), &Ordering::unordered())
            .is_some());
        assert_eq!(cache.stats().evictions, 2);
    }

    #[test]
    fn test_overflow_reject() {
        let config = CacheConfig::new()
            .with_max_scalars(1)
            .with_overflow(OverflowPolicy::Reject);
        let cache = ScalarResultCache::with_config(&config);
        let p = Predicate::True;
        cache.put(&kind(), p.clone(), "count".into(), Value::Int(1)).unwrap();
        // Overwriting the same entry is always allowed.
        cache.put(&kind(), p.clone(), "count".into(), Value::Int(2)).unwrap();

        let err = cache
            .put(&kind(), p.clone(), "sum".into(), Value::Int(3))
            .unwrap_err();
        assert!(matches!(err, CacheError::CapacityExceeded { tier: "scalar", .. }));
        assert_eq!(cache.get(&kind(), &p, "count"), Some(Value::Int(2)));
    }
}
