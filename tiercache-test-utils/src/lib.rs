//! tiercache Test Utilities
//!
//! Centralized test infrastructure for the tiercache workspace:
//! - Proptest generators for values, records, predicates and orderings
//! - A mock backing store that answers queries exactly
//! - Test fixtures for the Order/Customer scenarios

// Re-export core types for convenience
pub use tiercache_core::{
    CacheError, CacheResult, Ordering, Predicate, Record, RecordKind, UniqueKey, Value,
};

use std::collections::HashMap;
use std::sync::RwLock;

// ============================================================================
// MOCK BACKING STORE
// ============================================================================

/// In-memory stand-in for the backing store.
///
/// Answers list and count queries by scanning, so tests can compare a cached
/// result with what the store would return right now.
#[derive(Debug, Default)]
pub struct MockStore {
    records: RwLock<HashMap<UniqueKey, Record>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record, returning the previous version.
    pub fn upsert(&self, record: Record) -> CacheResult<Option<Record>> {
        let key = record.unique_key()?;
        Ok(self
            .records
            .write()
            .expect("mock store lock poisoned")
            .insert(key, record))
    }

    pub fn delete(&self, key: &UniqueKey) -> Option<Record> {
        self.records
            .write()
            .expect("mock store lock poisoned")
            .remove(key)
    }

    pub fn get(&self, key: &UniqueKey) -> Option<Record> {
        self.records
            .read()
            .expect("mock store lock poisoned")
            .get(key)
            .cloned()
    }

    /// Every record of `kind` satisfying `predicate`, in `ordering`.
    ///
    /// Ties are broken by primary key so results are deterministic.
    pub fn find(
        &self,
        kind: &RecordKind,
        predicate: &Predicate,
        ordering: &Ordering,
    ) -> CacheResult<Vec<Record>> {
        let records = self.records.read().expect("mock store lock poisoned");
        let mut matched = Vec::new();
        for record in records.values().filter(|r| r.kind() == kind) {
            if predicate.evaluate(record)? {
                matched.push(record.clone());
            }
        }
        matched.sort_by(|a, b| {
            let a_key = a.primary_key_fields().iter().map(|f| a.get(f));
            let b_key = b.primary_key_fields().iter().map(|f| b.get(f));
            a_key
                .zip(b_key)
                .map(|(x, y)| match (x, y) {
                    (Some(x), Some(y)) => x.total_cmp(y),
                    _ => std::cmp::Ordering::Equal,
                })
                .find(|o| *o != std::cmp::Ordering::Equal)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ordering.sort(&mut matched);
        Ok(matched)
    }

    pub fn count(&self, kind: &RecordKind, predicate: &Predicate) -> CacheResult<i64> {
        Ok(self.find(kind, predicate, &Ordering::unordered())?.len() as i64)
    }

    pub fn len(&self) -> usize {
        self.records.read().expect("mock store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies over the Order schema used by the fixtures.

    use super::*;
    use proptest::prelude::*;

    pub static STATUSES: [&str; 3] = ["OPEN", "HELD", "CLOSED"];
    pub static REGIONS: [&str; 2] = ["EU", "US"];

    pub fn arb_status() -> impl Strategy<Value = &'static str> {
        prop::sample::select(&STATUSES[..])
    }

    pub fn arb_region() -> impl Strategy<Value = Option<&'static str>> {
        prop::option::of(prop::sample::select(&REGIONS[..]))
    }

    /// Generate a scalar field value of any type.
    pub fn arb_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            (-1000i64..1000).prop_map(Value::Int),
            (-1000.0f64..1000.0).prop_map(Value::Float),
            "[a-zA-Z0-9 ]{0,8}".prop_map(Value::Text),
        ]
    }

    /// Generate an Order with an id drawn from `ids`.
    pub fn arb_order_in(ids: std::ops::Range<i64>) -> impl Strategy<Value = Record> {
        (ids, arb_status(), 0i64..1000, arb_region()).prop_map(|(id, status, total, region)| {
            super::fixtures::order_with_region(id, status, total, region)
        })
    }

    pub fn arb_order() -> impl Strategy<Value = Record> {
        arb_order_in(0..32)
    }

    /// Generate a leaf comparison over Order fields.
    pub fn arb_leaf_predicate() -> impl Strategy<Value = Predicate> {
        prop_oneof![
            arb_status().prop_map(|s| Predicate::eq("status", s)),
            arb_status().prop_map(|s| Predicate::ne("status", s)),
            (0i64..1000).prop_map(|t| Predicate::gt("total", t)),
            (0i64..1000).prop_map(|t| Predicate::lte("total", t)),
            (0i64..1000, 0i64..1000).prop_map(|(a, b)| Predicate::between("total", a.min(b), a.max(b))),
            prop::sample::subsequence(&STATUSES[..], 0..=3).prop_map(|s| Predicate::is_in("status", s)),
            Just(Predicate::is_null("region")),
            prop::sample::select(vec!["%E%", "C%", "_PEN", "%"]).prop_map(|p| Predicate::like("status", p)),
            Just(Predicate::True),
        ]
    }

    /// Generate a predicate tree of bounded depth.
    pub fn arb_predicate() -> impl Strategy<Value = Predicate> {
        arb_leaf_predicate().prop_recursive(3, 16, 3, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..3).prop_map(|items| Predicate::all(items)),
                prop::collection::vec(inner.clone(), 0..3).prop_map(|items| Predicate::any(items)),
                inner.prop_map(Predicate::negate),
            ]
        })
    }

    pub fn arb_ordering() -> impl Strategy<Value = Ordering> {
        prop_oneof![
            Just(Ordering::asc("id")),
            Just(Ordering::desc("total").then_asc("id")),
            Just(Ordering::asc("status").then_desc("id")),
            Just(Ordering::unordered()),
        ]
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built records and predicates for common scenarios.

    use super::*;

    pub fn order_kind() -> RecordKind {
        RecordKind::new("Order")
    }

    pub fn customer_kind() -> RecordKind {
        RecordKind::new("Customer")
    }

    /// An Order with no region.
    pub fn order(id: i64, status: &str, total: i64) -> Record {
        order_with_region(id, status, total, None)
    }

    pub fn order_with_region(id: i64, status: &str, total: i64, region: Option<&str>) -> Record {
        Record::builder(order_kind())
            .key("id", id)
            .field("status", status)
            .field("total", total)
            .field("region", region)
            .build()
    }

    pub fn customer(id: i64, name: &str) -> Record {
        Record::builder(customer_kind())
            .key("id", id)
            .field("name", name)
            .build()
    }

    pub fn open_orders() -> Predicate {
        Predicate::eq("status", "OPEN")
    }

    pub fn by_id() -> Ordering {
        Ordering::asc("id")
    }
}
