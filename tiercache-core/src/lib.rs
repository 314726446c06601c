//! tiercache Core - Record, Predicate and Ordering Types
//!
//! Pure data structures shared by every tier. All other crates depend on this.
//! Nothing here holds cache state.

mod config;
mod error;
mod ordering;
mod predicate;
mod record;
mod value;

pub use config::{CacheConfig, OverflowPolicy, UnknownKeyPolicy};
pub use error::{CacheError, CacheResult, ConfigError};
pub use ordering::{Direction, OrderBy, Ordering};
pub use predicate::{CompareOp, Predicate};
pub use record::{Record, RecordBuilder, RecordKind, UniqueKey};
pub use value::Value;

/// Timestamp type using UTC timezone.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
