//! Host values, logical types and wire (JDBC-style) types.
//! `Value` is used on both sides of the type handlers: as the host value read from a parameter
//! object and as the wire value handed to / returned from a driver.

use chrono::NaiveDateTime;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }

    /// Runtime logical type of the value; null carries no type and reports `Object`.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Object,
            Value::Bool(_) => ValueType::Boolean,
            Value::Int(_) => ValueType::Integer,
            Value::Long(_) => ValueType::Long,
            Value::Double(_) => ValueType::Double,
            Value::Text(_) => ValueType::String,
            Value::Timestamp(_) => ValueType::Timestamp,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i as i64),
            Value::Long(l) => Some(*l),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Long(l) => Some(*l as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self { Value::Text(s) => Some(s.as_str()), _ => None }
    }

    pub fn is_numeric(&self) -> bool { matches!(self, Value::Int(_) | Value::Long(_) | Value::Double(_)) }

    /// Text used when a value is inlined into SQL by `${...}` substitution (null becomes empty).
    pub fn to_sql_text(&self) -> String {
        match self { Value::Null => String::new(), other => other.to_string() }
    }
}

// Doubles compare by bit pattern so values can key hash maps (cache keys).
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Long(l) => l.hash(state),
            Value::Double(d) => d.to_bits().hash(state),
            Value::Text(s) => s.hash(state),
            Value::Timestamp(t) => t.hash(state),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(l) => write!(f, "{}", l),
            Value::Double(d) => write!(f, "{}", d),
            Value::Text(s) => write!(f, "{}", s),
            Value::Timestamp(t) => write!(f, "{}", t.format(TIMESTAMP_FORMAT)),
        }
    }
}

impl From<bool> for Value { fn from(v: bool) -> Self { Value::Bool(v) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Value::Int(v) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::Long(v) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Double(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::Text(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::Text(v.to_string()) } }
impl From<NaiveDateTime> for Value { fn from(v: NaiveDateTime) -> Self { Value::Timestamp(v) } }

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self { v.map(Into::into).unwrap_or(Value::Null) }
}

impl From<&serde_json::Value> for Value {
    fn from(j: &serde_json::Value) -> Self {
        match j {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i32::try_from(i).map(Value::Int).unwrap_or(Value::Long(i))
                } else {
                    Value::Double(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        }
    }
}

/// Logical (host) type used to resolve type handlers. `Object` is the generic fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Boolean,
    Integer,
    Long,
    Double,
    String,
    Timestamp,
    Object,
}

impl ValueType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "boolean" | "bool" => Some(ValueType::Boolean),
            "integer" | "int" | "i32" => Some(ValueType::Integer),
            "long" | "i64" => Some(ValueType::Long),
            "double" | "float" | "f64" => Some(ValueType::Double),
            "string" | "str" | "text" => Some(ValueType::String),
            "timestamp" | "datetime" | "date" => Some(ValueType::Timestamp),
            "object" => Some(ValueType::Object),
            _ => None,
        }
    }
}

/// Wire type of a bind parameter or result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JdbcType {
    Boolean,
    Integer,
    BigInt,
    Float,
    Double,
    Decimal,
    Varchar,
    Char,
    Timestamp,
    Null,
    Other,
}

impl JdbcType {
    pub const ALL: [JdbcType; 11] = [
        JdbcType::Boolean, JdbcType::Integer, JdbcType::BigInt, JdbcType::Float, JdbcType::Double,
        JdbcType::Decimal, JdbcType::Varchar, JdbcType::Char, JdbcType::Timestamp, JdbcType::Null, JdbcType::Other,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            JdbcType::Boolean => "BOOLEAN",
            JdbcType::Integer => "INTEGER",
            JdbcType::BigInt => "BIGINT",
            JdbcType::Float => "FLOAT",
            JdbcType::Double => "DOUBLE",
            JdbcType::Decimal => "DECIMAL",
            JdbcType::Varchar => "VARCHAR",
            JdbcType::Char => "CHAR",
            JdbcType::Timestamp => "TIMESTAMP",
            JdbcType::Null => "NULL",
            JdbcType::Other => "OTHER",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let up = name.trim().to_ascii_uppercase();
        if up == "INT" { return Some(JdbcType::Integer); }
        if up == "TEXT" { return Some(JdbcType::Varchar); }
        JdbcType::ALL.iter().copied().find(|t| t.name() == up)
    }

    /// Wire type a driver reports for a value when the column carries no declared type.
    pub fn for_value(v: &Value) -> JdbcType {
        match v {
            Value::Null => JdbcType::Null,
            Value::Bool(_) => JdbcType::Boolean,
            Value::Int(_) => JdbcType::Integer,
            Value::Long(_) => JdbcType::BigInt,
            Value::Double(_) => JdbcType::Double,
            Value::Text(_) => JdbcType::Varchar,
            Value::Timestamp(_) => JdbcType::Timestamp,
        }
    }
}

impl Display for JdbcType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(self.name()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn doubles_hash_by_bits() {
        let mut set = HashSet::new();
        set.insert(Value::Double(f64::NAN));
        assert!(set.contains(&Value::Double(f64::NAN)));
        assert_ne!(Value::Int(1), Value::Long(1));
    }

    #[test]
    fn jdbc_type_names_parse_back() {
        for t in JdbcType::ALL {
            assert_eq!(JdbcType::from_name(t.name()), Some(t));
        }
        assert_eq!(JdbcType::from_name("varchar"), Some(JdbcType::Varchar));
        assert_eq!(JdbcType::from_name("nope"), None);
    }

    #[test]
    fn null_substitutes_as_empty_text() {
        assert_eq!(Value::Null.to_sql_text(), "");
        assert_eq!(Value::from("abc").to_sql_text(), "abc");
        assert_eq!(Value::from(Some(5i64)), Value::Long(5));
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn json_numbers_narrow_to_int_when_they_fit() {
        assert_eq!(Value::from(&serde_json::json!(7)), Value::Int(7));
        assert_eq!(Value::from(&serde_json::json!(5_000_000_000i64)), Value::Long(5_000_000_000));
        assert_eq!(Value::from(&serde_json::json!(1.5)), Value::Double(1.5));
    }
}
