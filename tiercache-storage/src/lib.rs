//! tiercache Storage - Condition-Aware Cache Tiers
//!
//! In-memory key, list and scalar caches for one namespace, coordinated so
//! that every record mutation invalidates exactly the filtered results it
//! could affect. The backing store is the caller's concern: a miss is the
//! signal to read it and put the result back.

pub mod cache;

pub use cache::{
    Cache, CacheStats, ConditionCache, CoordinatorStats, Invalidation, KeyCache, ListResultCache,
    Mutation, RecordList, ScalarResultCache, Tier,
};

// Re-export core types so callers need a single dependency.
pub use tiercache_core::{
    CacheConfig, CacheError, CacheResult, CompareOp, ConfigError, Direction, OrderBy, Ordering,
    OverflowPolicy, Predicate, Record, RecordBuilder, RecordKind, UniqueKey, UnknownKeyPolicy,
    Value,
};
