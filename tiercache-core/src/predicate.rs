//! Filter predicates over record fields.
//!
//! A [`Predicate`] is both the condition a cached list or scalar was computed
//! for and part of that entry's cache key. It therefore has structural
//! equality and hashing, a deterministic serialized form and a stable
//! fingerprint derived from it.
//!
//! New comparator kinds may be added as variants; the enum is externally
//! tagged, so existing predicates keep their serialized form and hash.

use crate::record::Record;
use crate::value::{Value, NULL};
use crate::{CacheError, CacheResult};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeSet;
use std::fmt;

/// Comparison operator for a single field against a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    /// Equal to
    Eq,
    /// Not equal to
    Ne,
    /// Less than
    Lt,
    /// Less than or equal
    Lte,
    /// Greater than
    Gt,
    /// Greater than or equal
    Gte,
}

impl CompareOp {
    fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }

    fn apply(self, lhs: &Value, rhs: &Value) -> bool {
        match self {
            Self::Eq => lhs.matches(rhs),
            Self::Ne => !lhs.matches(rhs),
            Self::Lt => lhs.compare(rhs) == Some(CmpOrdering::Less),
            Self::Lte => matches!(
                lhs.compare(rhs),
                Some(CmpOrdering::Less | CmpOrdering::Equal)
            ),
            Self::Gt => lhs.compare(rhs) == Some(CmpOrdering::Greater),
            Self::Gte => matches!(
                lhs.compare(rhs),
                Some(CmpOrdering::Greater | CmpOrdering::Equal)
            ),
        }
    }
}

/// Immutable boolean expression over record fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Predicate {
    /// Matches every record.
    True,
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
    /// Inclusive range.
    Between {
        field: String,
        low: Value,
        high: Value,
    },
    /// Set membership. Values are kept sorted and deduplicated by
    /// [`Predicate::is_in`] and on deserialization; build it through those
    /// so equal sets share one cache key.
    In {
        field: String,
        #[serde(deserialize_with = "deserialize_value_set")]
        values: Vec<Value>,
    },
    IsNull { field: String },
    /// SQL-style pattern: `%` matches any run, `_` matches one character.
    Like { field: String, pattern: String },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Ne, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Lte, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gte, value)
    }

    pub fn between(
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        Self::Between {
            field: field.into(),
            low: low.into(),
            high: high.into(),
        }
    }

    /// Membership test. The value set is normalized so that the same set
    /// given in any order yields the same cache key.
    pub fn is_in<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let mut values: Vec<Value> = values.into_iter().map(Into::into).collect();
        normalize_value_set(&mut values);
        Self::In {
            field: field.into(),
            values,
        }
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::IsNull {
            field: field.into(),
        }
    }

    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::Like {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self::And(predicates.into_iter().collect())
    }

    pub fn any(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self::Or(predicates.into_iter().collect())
    }

    /// Conjunction, flattening a left-hand `And`.
    pub fn and(self, other: Predicate) -> Self {
        match self {
            Self::And(mut items) => {
                items.push(other);
                Self::And(items)
            }
            first => Self::And(vec![first, other]),
        }
    }

    /// Disjunction, flattening a left-hand `Or`.
    pub fn or(self, other: Predicate) -> Self {
        match self {
            Self::Or(mut items) => {
                items.push(other);
                Self::Or(items)
            }
            first => Self::Or(vec![first, other]),
        }
    }

    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Every field name this predicate reads.
    pub fn referenced_fields(&self) -> BTreeSet<&str> {
        let mut fields = BTreeSet::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Self::True => {}
            Self::Compare { field, .. }
            | Self::Between { field, .. }
            | Self::In { field, .. }
            | Self::IsNull { field }
            | Self::Like { field, .. } => {
                out.insert(field.as_str());
            }
            Self::And(items) | Self::Or(items) => {
                for item in items {
                    item.collect_fields(out);
                }
            }
            Self::Not(inner) => inner.collect_fields(out),
        }
    }

    /// Evaluate against a record.
    ///
    /// Every referenced field must be present on the record, even ones a
    /// short-circuit would skip; a missing field is `InvalidOperand`.
    pub fn evaluate(&self, record: &Record) -> CacheResult<bool> {
        for field in self.referenced_fields() {
            if !record.contains(field) {
                return Err(CacheError::InvalidOperand {
                    kind: record.kind().clone(),
                    field: field.to_string(),
                });
            }
        }
        Ok(self.matches(record))
    }

    fn matches(&self, record: &Record) -> bool {
        let field_value = |name: &str| record.get(name).unwrap_or(&NULL);
        match self {
            Self::True => true,
            Self::Compare { field, op, value } => op.apply(field_value(field), value),
            Self::Between { field, low, high } => {
                let v = field_value(field);
                CompareOp::Gte.apply(v, low) && CompareOp::Lte.apply(v, high)
            }
            Self::In { field, values } => {
                let v = field_value(field);
                values.iter().any(|candidate| v.matches(candidate))
            }
            Self::IsNull { field } => field_value(field).is_null(),
            Self::Like { field, pattern } => field_value(field)
                .as_text()
                .is_some_and(|text| like_match(text, pattern)),
            Self::And(items) => items.iter().all(|p| p.matches(record)),
            Self::Or(items) => items.iter().any(|p| p.matches(record)),
            Self::Not(inner) => !inner.matches(record),
        }
    }

    /// Deterministic serialized form.
    pub fn to_canonical_json(&self) -> CacheResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Hex SHA-256 of the canonical JSON form. Stable across processes,
    /// suitable for external cache keys and log correlation.
    pub fn fingerprint(&self) -> CacheResult<String> {
        let json = self.to_canonical_json()?;
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }
}

fn normalize_value_set(values: &mut Vec<Value>) {
    values.sort_by(|a, b| a.total_cmp(b));
    values.dedup();
}

fn deserialize_value_set<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut values = Vec::<Value>::deserialize(deserializer)?;
    normalize_value_set(&mut values);
    Ok(values)
}

/// Wildcard match with `%` (any run, possibly empty) and `_` (one character).
fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) && pattern[p] != '%' {
            t += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star_p, star_t)) = backtrack {
            p = star_p + 1;
            t = star_t + 1;
            backtrack = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&c| c == '%')
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, items: &[Predicate], sep: &str) -> fmt::Result {
            write!(f, "(")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", sep)?;
                }
                write!(f, "{}", item)?;
            }
            write!(f, ")")
        }

        match self {
            Self::True => write!(f, "TRUE"),
            Self::Compare { field, op, value } => {
                write!(f, "{} {} {}", field, op.symbol(), value)
            }
            Self::Between { field, low, high } => {
                write!(f, "{} BETWEEN {} AND {}", field, low, high)
            }
            Self::In { field, values } => {
                write!(f, "{} IN (", field)?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ")")
            }
            Self::IsNull { field } => write!(f, "{} IS NULL", field),
            Self::Like { field, pattern } => write!(f, "{} LIKE '{}'", field, pattern),
            Self::And(items) if items.is_empty() => write!(f, "TRUE"),
            Self::Or(items) if items.is_empty() => write!(f, "FALSE"),
            Self::And(items) => join(f, items, "AND"),
            Self::Or(items) => join(f, items, "OR"),
            Self::Not(inner) => write!(f, "NOT ({})", inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn order(id: i64, status: &str, total: f64) -> Record {
        Record::builder("Order")
            .key("id", id)
            .field("status", status)
            .field("total", total)
            .field("note", Value::Null)
            .build()
    }

    fn hash_of(p: &Predicate) -> u64 {
        let mut h = DefaultHasher::new();
        p.hash(&mut h);
        h.finish()
    }

    #[test]
    fn test_equality_predicate() {
        let p = Predicate::eq("status", "OPEN");
        assert!(p.evaluate(&order(1, "OPEN", 10.0)).unwrap());
        assert!(!p.evaluate(&order(1, "CLOSED", 10.0)).unwrap());
    }

    #[test]
    fn test_range_comparisons() {
        let r = order(1, "OPEN", 10.0);
        assert!(Predicate::gt("total", 5).evaluate(&r).unwrap());
        assert!(Predicate::gte("total", 10).evaluate(&r).unwrap());
        assert!(!Predicate::lt("total", 10).evaluate(&r).unwrap());
        assert!(Predicate::lte("total", 10.0).evaluate(&r).unwrap());
        assert!(Predicate::between("id", 1, 3).evaluate(&r).unwrap());
        assert!(!Predicate::between("id", 2, 3).evaluate(&r).unwrap());
    }

    #[test]
    fn test_null_semantics() {
        let r = order(1, "OPEN", 1.0);
        assert!(Predicate::is_null("note").evaluate(&r).unwrap());
        assert!(Predicate::eq("note", Value::Null).evaluate(&r).unwrap());
        assert!(!Predicate::gt("note", 0).evaluate(&r).unwrap());
        assert!(!Predicate::lt("note", 0).evaluate(&r).unwrap());
    }

    #[test]
    fn test_membership() {
        let p = Predicate::is_in("status", ["OPEN", "HELD"]);
        assert!(p.evaluate(&order(1, "HELD", 0.0)).unwrap());
        assert!(!p.evaluate(&order(1, "CLOSED", 0.0)).unwrap());
    }

    #[test]
    fn test_membership_key_is_order_independent() {
        let a = Predicate::is_in("status", ["OPEN", "HELD", "OPEN"]);
        let b = Predicate::is_in("status", ["HELD", "OPEN"]);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_membership_key_with_mixed_numbers() {
        let a = Predicate::is_in("v", [Value::Int(1), Value::Float(1.0)]);
        let b = Predicate::is_in("v", [Value::Float(1.0), Value::Int(1)]);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        let nan = Predicate::is_in("v", [Value::Float(f64::NAN), Value::Float(-f64::NAN)]);
        assert_eq!(nan, Predicate::is_in("v", [Value::Float(f64::NAN)]));
    }

    #[test]
    fn test_deserialized_membership_is_normalized() {
        let built = Predicate::is_in("status", ["HELD", "OPEN"]);
        let json = r#"{"in":{"field":"status","values":[
            {"type":"text","value":"OPEN"},
            {"type":"text","value":"HELD"},
            {"type":"text","value":"OPEN"}
        ]}}"#;
        let parsed: Predicate = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, built);
        assert_eq!(hash_of(&parsed), hash_of(&built));
    }

    #[test]
    fn test_composition() {
        let p = Predicate::eq("status", "OPEN")
            .and(Predicate::gt("total", 100))
            .or(Predicate::eq("id", 9));
        assert!(p.evaluate(&order(9, "CLOSED", 0.0)).unwrap());
        assert!(p.evaluate(&order(1, "OPEN", 200.0)).unwrap());
        assert!(!p.evaluate(&order(1, "OPEN", 50.0)).unwrap());
        assert!(p.clone().negate().evaluate(&order(1, "OPEN", 50.0)).unwrap());
    }

    #[test]
    fn test_empty_connectives() {
        let r = order(1, "OPEN", 0.0);
        assert!(Predicate::all([]).evaluate(&r).unwrap());
        assert!(!Predicate::any([]).evaluate(&r).unwrap());
        assert!(Predicate::True.evaluate(&r).unwrap());
    }

    #[test]
    fn test_missing_field_fails_even_when_short_circuited() {
        let p = Predicate::eq("status", "CLOSED").and(Predicate::eq("missing", 1));
        let err = p.evaluate(&order(1, "OPEN", 0.0)).unwrap_err();
        assert_eq!(
            err,
            CacheError::InvalidOperand {
                kind: "Order".into(),
                field: "missing".to_string(),
            }
        );
    }

    #[test]
    fn test_like() {
        assert!(like_match("OPEN", "OP%"));
        assert!(like_match("OPEN", "%EN"));
        assert!(like_match("OPEN", "O_E_"));
        assert!(like_match("", "%"));
        assert!(like_match("abcabc", "%b%c"));
        assert!(!like_match("OPEN", "O_E"));
        assert!(!like_match("OPEN", "CL%"));
        let p = Predicate::like("status", "%PE%");
        assert!(p.evaluate(&order(1, "OPEN", 0.0)).unwrap());
        assert!(!Predicate::like("total", "%").evaluate(&order(1, "OPEN", 0.0)).unwrap());
    }

    #[test]
    fn test_referenced_fields() {
        let p = Predicate::eq("a", 1).and(Predicate::is_null("b").negate().or(Predicate::like("a", "x")));
        let fields: Vec<&str> = p.referenced_fields().into_iter().collect();
        assert_eq!(fields, vec!["a", "b"]);
    }

    #[test]
    fn test_fingerprint_is_stable_and_structural() {
        let a = Predicate::eq("status", "OPEN").and(Predicate::gt("total", 1));
        let b = Predicate::eq("status", "OPEN").and(Predicate::gt("total", 1));
        let c = Predicate::eq("status", "OPEN").and(Predicate::gt("total", 2));
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_ne!(a.fingerprint().unwrap(), c.fingerprint().unwrap());
        assert_eq!(a.fingerprint().unwrap().len(), 64);
    }

    #[test]
    fn test_serialized_form_roundtrips() {
        let p = Predicate::between("total", 1, 2.5).or(Predicate::True);
        let json = p.to_canonical_json().unwrap();
        let back: Predicate = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn test_display() {
        let p = Predicate::eq("status", "OPEN").and(Predicate::is_in("id", [2, 1]));
        assert_eq!(p.to_string(), "(status = 'OPEN' AND id IN (1, 2))");
        assert_eq!(Predicate::is_null("x").negate().to_string(), "NOT (x IS NULL)");
    }
}
