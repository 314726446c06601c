//! Cache tiers with exact, predicate-driven invalidation.
//!
//! Three tiers sit behind one facade per namespace:
//!
//! - [`KeyCache`]: unique key to record.
//! - [`ListResultCache`]: `(kind, predicate, ordering)` to ordered records.
//! - [`ScalarResultCache`]: `(kind, predicate, name)` to a derived value.
//!
//! # Design Philosophy
//!
//! A cached filtered result is either exact or absent. Absence is always
//! safe (the caller reads the store and puts the result back); a present but
//! stale entry is a bug. Invalidation is therefore explicit and synchronous:
//! the caller reports every mutation to [`Cache`], which evaluates the
//! mutated record against every cached predicate of its kind and drops what
//! matches.
//!
//! # Example
//!
//! ```ignore
//! let cache = Cache::new("default");
//! let open = Predicate::eq("status", "OPEN");
//!
//! if cache.get_list(&kind, &open, &ordering).is_none() {
//!     let rows = store.find(&kind, &open, &ordering)?;
//!     cache.put_list(&kind, open.clone(), ordering.clone(), rows.into())?;
//! }
//!
//! // After the store commits an update, report both images.
//! cache.apply(&Mutation::Update { before, after })?;
//! ```

pub mod condition_cache;
pub mod coordinator;
pub mod key_cache;
pub mod traits;

pub use condition_cache::{ConditionCache, ListResultCache, RecordList, ScalarResultCache};
pub use coordinator::{Cache, CoordinatorStats, Invalidation, Mutation};
pub use key_cache::KeyCache;
pub use traits::{CacheStats, Tier};
