//! Configuration types

use crate::ConfigError;
use serde::{Deserialize, Serialize};

/// What a tier does when a put would exceed its per-kind bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Drop every entry of the affected kind in that tier, then insert.
    #[default]
    ClearPartition,
    /// Refuse the put with `CapacityExceeded`.
    Reject,
}

/// What removal by key does when the key tier holds no prior record, so
/// there is nothing to evaluate predicates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownKeyPolicy {
    /// Drop every list and scalar entry of the key's kind.
    #[default]
    InvalidateKind,
    /// Leave derived entries alone. Callers accept possible staleness.
    Skip,
}

/// Configuration for one namespace's cache.
///
/// Bounds are per record kind and per tier; `None` means unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_records_per_kind: Option<usize>,
    pub max_lists_per_kind: Option<usize>,
    pub max_scalars_per_kind: Option<usize>,
    pub overflow: OverflowPolicy,
    pub unknown_key_policy: UnknownKeyPolicy,
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_records(mut self, max: usize) -> Self {
        self.max_records_per_kind = Some(max);
        self
    }

    pub fn with_max_lists(mut self, max: usize) -> Self {
        self.max_lists_per_kind = Some(max);
        self
    }

    pub fn with_max_scalars(mut self, max: usize) -> Self {
        self.max_scalars_per_kind = Some(max);
        self
    }

    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn with_unknown_key_policy(mut self, policy: UnknownKeyPolicy) -> Self {
        self.unknown_key_policy = policy;
        self
    }

    /// Reject zero bounds; a tier that can hold nothing is a misconfiguration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bounds = [
            ("max_records_per_kind", self.max_records_per_kind),
            ("max_lists_per_kind", self.max_lists_per_kind),
            ("max_scalars_per_kind", self.max_scalars_per_kind),
        ];
        for (field, bound) in bounds {
            if bound == Some(0) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: "0".to_string(),
                    reason: "bound must be positive or absent".to_string(),
                });
            }
        }
        Ok(())
    }
}
