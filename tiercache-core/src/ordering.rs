//! Sort directives for list results.

use crate::record::Record;
use crate::value::NULL;
use crate::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// One sort directive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }
}

impl FromStr for OrderBy {
    type Err = CacheError;

    /// Accepts `field`, `field ASC`, `field DESC`, `+field` and `-field`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| CacheError::InvalidOrdering {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = s.trim();
        let mut parts = trimmed.split_whitespace();
        let head = parts.next().ok_or_else(|| invalid("empty sort directive"))?;
        let suffix = parts.next();
        if parts.next().is_some() {
            return Err(invalid("expected 'field [ASC|DESC]'"));
        }

        let (field, mut direction) = if let Some(rest) = head.strip_prefix('-') {
            (rest, Direction::Descending)
        } else if let Some(rest) = head.strip_prefix('+') {
            (rest, Direction::Ascending)
        } else {
            (head, Direction::Ascending)
        };
        if field.is_empty() {
            return Err(invalid("missing field name"));
        }
        if field.starts_with(['-', '+']) {
            return Err(invalid("field name cannot start with a sign"));
        }

        if let Some(suffix) = suffix {
            if head.starts_with(['-', '+']) {
                return Err(invalid("direction given twice"));
            }
            direction = if suffix.eq_ignore_ascii_case("asc") {
                Direction::Ascending
            } else if suffix.eq_ignore_ascii_case("desc") {
                Direction::Descending
            } else {
                return Err(invalid("direction must be ASC or DESC"));
            };
        }

        Ok(Self {
            field: field.to_string(),
            direction,
        })
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Ascending => write!(f, "{} ASC", self.field),
            Direction::Descending => write!(f, "{} DESC", self.field),
        }
    }
}

/// Ordered sequence of sort directives. Part of a list entry's cache key:
/// two orderings of the same predicate are distinct cached artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ordering(Vec<OrderBy>);

impl Ordering {
    /// No ordering: the store's natural order.
    pub fn unordered() -> Self {
        Self(Vec::new())
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self(vec![OrderBy::asc(field)])
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self(vec![OrderBy::desc(field)])
    }

    pub fn then_asc(mut self, field: impl Into<String>) -> Self {
        self.0.push(OrderBy::asc(field));
        self
    }

    pub fn then_desc(mut self, field: impl Into<String>) -> Self {
        self.0.push(OrderBy::desc(field));
        self
    }

    /// Parse a comma-separated list such as `"status, id DESC"`.
    pub fn parse(input: &str) -> CacheResult<Self> {
        if input.trim().is_empty() {
            return Ok(Self::unordered());
        }
        input
            .split(',')
            .map(OrderBy::from_str)
            .collect::<CacheResult<Vec<_>>>()
            .map(Self)
    }

    pub fn directives(&self) -> &[OrderBy] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compare two records under this ordering. Missing fields sort as null.
    pub fn compare(&self, a: &Record, b: &Record) -> CmpOrdering {
        for directive in &self.0 {
            let lhs = a.get(&directive.field).unwrap_or(&NULL);
            let rhs = b.get(&directive.field).unwrap_or(&NULL);
            let ordering = match directive.direction {
                Direction::Ascending => lhs.total_cmp(rhs),
                Direction::Descending => rhs.total_cmp(lhs),
            };
            if ordering != CmpOrdering::Equal {
                return ordering;
            }
        }
        CmpOrdering::Equal
    }

    /// Stable sort of `records` into this ordering.
    pub fn sort(&self, records: &mut [Record]) {
        records.sort_by(|a, b| self.compare(a, b));
    }
}

impl FromStr for Ordering {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl FromIterator<OrderBy> for Ordering {
    fn from_iter<I: IntoIterator<Item = OrderBy>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, directive) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", directive)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    fn order(id: i64, status: &str) -> Record {
        Record::builder("Order")
            .key("id", id)
            .field("status", status)
            .build()
    }

    #[test]
    fn test_parse_forms() {
        let ordering = Ordering::parse("status, id DESC, -total, +name asc").unwrap_err();
        assert!(matches!(ordering, CacheError::InvalidOrdering { .. }));

        let ordering = Ordering::parse("status, id DESC, -total, +name").unwrap();
        assert_eq!(
            ordering,
            Ordering::asc("status")
                .then_desc("id")
                .then_desc("total")
                .then_asc("name")
        );
    }

    #[test]
    fn test_parse_empty_is_unordered() {
        assert_eq!(Ordering::parse("  ").unwrap(), Ordering::unordered());
        assert!(Ordering::parse("id,").is_err());
        assert!(Ordering::parse("id sideways").is_err());
        assert!(Ordering::parse("-").is_err());
        assert!(Ordering::parse("--total").is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        let ordering: Ordering = "id desc, status".parse().unwrap();
        assert_eq!(ordering.to_string(), "id DESC, status ASC");
        assert_eq!(ordering.to_string().parse::<Ordering>().unwrap(), ordering);
    }

    #[test]
    fn test_orderings_are_distinct_keys() {
        assert_ne!(Ordering::asc("id"), Ordering::desc("id"));
        assert_ne!(Ordering::asc("id").then_asc("x"), Ordering::asc("x").then_asc("id"));
    }

    #[test]
    fn test_sort_multi_key() {
        let mut records = vec![order(1, "OPEN"), order(2, "CLOSED"), order(3, "OPEN")];
        Ordering::asc("status").then_desc("id").sort(&mut records);
        let ids: Vec<&Value> = records.iter().filter_map(|r| r.get("id")).collect();
        assert_eq!(ids, vec![&Value::Int(2), &Value::Int(3), &Value::Int(1)]);
    }

    #[test]
    fn test_sort_nulls_first_ascending() {
        let mut records = vec![
            order(1, "OPEN"),
            Record::builder("Order").key("id", 2).field("status", Value::Null).build(),
        ];
        Ordering::asc("status").sort(&mut records);
        assert_eq!(records[0].get("id"), Some(&Value::Int(2)));
    }
}
