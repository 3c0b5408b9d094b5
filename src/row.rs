//! Source row model: dynamically-typed scalar values keyed by column name.
//!
//! Rows arrive from a dynamically-typed source ecosystem (database result
//! sets handed over as JSON objects), so values are represented as a tagged
//! [`Value`] enum with explicit, total coercion functions rather than ad hoc
//! casting.
//!
//! Column lookup is case-insensitive. The normalization happens once, at row
//! construction: keys are uppercased and stored that way, and `get` uppercases
//! the probe. Resolution logic never needs to compare case-insensitively.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

// =============================================================================
// Value
// =============================================================================

/// A dynamically-typed scalar from the source row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Number(Decimal),
    Date(NaiveDate),
    Bool(bool),
    Null,
}

impl Value {
    /// String rendering used when the value is written into an output field.
    ///
    /// Booleans render as the single-character flags the downstream fixed-width
    /// formats expect; dates render as ISO `yyyy-MM-dd` and are reformatted by
    /// the formatter when a `targetFormat` is configured.
    pub fn as_string(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Number(n) => n.normalize().to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Bool(true) => "Y".to_string(),
            Value::Bool(false) => "N".to_string(),
            Value::Null => String::new(),
        }
    }

    /// Total numeric coercion. Strings are trimmed and parsed as decimals.
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Str(s) => Decimal::from_str(s.trim()).ok(),
            Value::Bool(_) | Value::Date(_) | Value::Null => None,
        }
    }

    /// Total date coercion. `fmt` is a chrono strftime pattern.
    pub fn as_date(&self, fmt: &str) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::Str(s) => NaiveDate::parse_from_str(s.trim(), fmt).ok(),
            _ => None,
        }
    }

    /// Null or a blank string.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Str(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Convert a JSON scalar into a [`Value`].
    ///
    /// Non-scalar JSON (arrays, objects) degrades to its JSON text; the
    /// validator upstream of the engine is expected to reject such rows.
    pub fn from_json(value: &serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Decimal::from_str(&n.to_string())
                .map(Value::Number)
                .unwrap_or_else(|_| Value::Str(n.to_string())),
            serde_json::Value::String(s) => Value::Str(s.clone()),
            other => Value::Str(other.to_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Decimal> for Value {
    fn from(n: Decimal) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Decimal::from(n))
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

// =============================================================================
// Row
// =============================================================================

/// One source row: an immutable, case-insensitive map from column name to
/// [`Value`].
///
/// Owned by the caller for the duration of one `transform` call; the engine
/// never mutates it.
#[derive(Debug, Clone, Default)]
pub struct Row {
    values: HashMap<String, Value>,
}

impl Row {
    /// Build a row from `(column, value)` pairs. Keys are uppercased once here.
    pub fn new<K, V, I>(pairs: I) -> Self
    where
        K: AsRef<str>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_uppercase(), v.into()))
            .collect();
        Self { values }
    }

    /// Build a row from a JSON object (the interchange format used by the
    /// surrounding batch pipeline). Non-object input yields an empty row.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let values = value
            .as_object()
            .map(|obj| {
                obj.iter()
                    .map(|(k, v)| (k.to_uppercase(), Value::from_json(v)))
                    .collect()
            })
            .unwrap_or_default();
        Self { values }
    }

    /// Case-insensitive column lookup.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(&column.to_uppercase())
    }

    /// True when the column exists, even if its value is null.
    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(&column.to_uppercase())
    }

    /// Lookup that treats null/blank values as absent.
    pub fn get_non_empty(&self, column: &str) -> Option<&Value> {
        self.get(column).filter(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
