//! Error types for tiercache operations

use crate::RecordKind;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all cache errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// A predicate or key derivation referenced a field the record does not carry.
    #[error("Invalid operand: {kind} record has no field '{field}'")]
    InvalidOperand { kind: RecordKind, field: String },

    #[error("Record of kind {kind} declares no primary key fields")]
    MissingPrimaryKey { kind: RecordKind },

    #[error("Record kind mismatch: expected {expected}, got {actual}")]
    KindMismatch {
        expected: RecordKind,
        actual: RecordKind,
    },

    #[error("Capacity exceeded in {tier} tier for {kind}: limit {capacity}")]
    CapacityExceeded {
        tier: &'static str,
        kind: RecordKind,
        capacity: usize,
    },

    #[error("Invalid ordering '{input}': {reason}")]
    InvalidOrdering { input: String, reason: String },

    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}

/// Result type alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_operand_display() {
        let err = CacheError::InvalidOperand {
            kind: RecordKind::new("Order"),
            field: "status".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Invalid operand"));
        assert!(msg.contains("Order"));
        assert!(msg.contains("status"));
    }

    #[test]
    fn test_capacity_exceeded_display() {
        let err = CacheError::CapacityExceeded {
            tier: "list",
            kind: RecordKind::new("Order"),
            capacity: 16,
        };
        let msg = err.to_string();
        assert!(msg.contains("list"));
        assert!(msg.contains("16"));
    }

    #[test]
    fn test_config_error_converts() {
        let err = CacheError::from(ConfigError::InvalidValue {
            field: "max_lists_per_kind".to_string(),
            value: "0".to_string(),
            reason: "must be positive".to_string(),
        });
        assert!(matches!(err, CacheError::Config(_)));
        assert!(err.to_string().contains("max_lists_per_kind"));
    }

    #[test]
    fn test_serde_error_converts() {
        let err: CacheError = serde_json::from_str::<u32>("not json")
            .map_err(CacheError::from)
            .unwrap_err();
        assert!(matches!(err, CacheError::Serialization { .. }));
    }
}
