//! Records, record kinds and unique keys.

use crate::value::Value;
use crate::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Name of a schema/table. Every cache key is partitioned by kind first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKind(String);

impl RecordKind {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordKind {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for RecordKind {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Identity of a record within its kind.
///
/// Equality and hashing are structural over the kind and every key field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniqueKey {
    kind: RecordKind,
    fields: BTreeMap<String, Value>,
}

impl UniqueKey {
    /// Build a key from its kind and key-field values.
    pub fn new<K, V>(kind: impl Into<RecordKind>, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            kind: kind.into(),
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Build a single-field key, the common case.
    pub fn single(
        kind: impl Into<RecordKind>,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self::new(kind, [(field.into(), value.into())])
    }

    pub fn kind(&self) -> &RecordKind {
        &self.kind
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

impl fmt::Display for UniqueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.kind)?;
        for (i, (field, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", field, value)?;
        }
        write!(f, "]")
    }
}

/// A persisted record: an ordered field map tagged with its kind and the
/// names of the fields forming its primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    kind: RecordKind,
    primary_key: Vec<String>,
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Start building a record of the given kind.
    pub fn builder(kind: impl Into<RecordKind>) -> RecordBuilder {
        RecordBuilder {
            kind: kind.into(),
            primary_key: Vec::new(),
            fields: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> &RecordKind {
        &self.kind
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn primary_key_fields(&self) -> &[String] {
        &self.primary_key
    }

    /// Overwrite a field, returning the previous value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    /// Copy of this record with one field replaced. Handy for building the
    /// post-image of an update.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Derive the record's unique key from its primary-key fields.
    pub fn unique_key(&self) -> CacheResult<UniqueKey> {
        if self.primary_key.is_empty() {
            return Err(CacheError::MissingPrimaryKey {
                kind: self.kind.clone(),
            });
        }
        let mut fields = BTreeMap::new();
        for name in &self.primary_key {
            let value = self
                .fields
                .get(name)
                .ok_or_else(|| CacheError::InvalidOperand {
                    kind: self.kind.clone(),
                    field: name.clone(),
                })?;
            fields.insert(name.clone(), value.clone());
        }
        Ok(UniqueKey {
            kind: self.kind.clone(),
            fields,
        })
    }
}

/// Builder for [`Record`].
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    kind: RecordKind,
    primary_key: Vec<String>,
    fields: BTreeMap<String, Value>,
}

impl RecordBuilder {
    /// Add a primary-key field.
    pub fn key(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let field = field.into();
        if !self.primary_key.contains(&field) {
            self.primary_key.push(field.clone());
        }
        self.fields.insert(field, value.into());
        self
    }

    /// Add a non-key field.
    pub fn field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn build(self) -> Record {
        Record {
            kind: self.kind,
            primary_key: self.primary_key,
            fields: self.fields,
        }
    }
}
