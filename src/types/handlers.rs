use super::TypeHandler;
use crate::error::{MapperError, MapperResult};
use crate::value::{JdbcType, Value, ValueType, TIMESTAMP_FORMAT};
use chrono::NaiveDateTime;

/// Coerce a value to the given host type; null passes through.
pub fn coerce(value: Value, target: ValueType) -> MapperResult<Value> {
    let fail = |v: &Value| MapperError::conversion(v, target);
    Ok(match (target, value) {
        (_, Value::Null) => Value::Null,
        (ValueType::Object, v) => v,

        (ValueType::Boolean, Value::Bool(b)) => Value::Bool(b),
        (ValueType::Boolean, v @ (Value::Int(_) | Value::Long(_))) => Value::Bool(v.as_i64() != Some(0)),
        (ValueType::Boolean, Value::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" | "y" | "yes" => Value::Bool(true),
            "false" | "f" | "0" | "n" | "no" => Value::Bool(false),
            _ => return Err(fail(&Value::Text(s.clone()))),
        },

        (ValueType::Integer, Value::Int(i)) => Value::Int(i),
        (ValueType::Integer, Value::Long(l)) => Value::Int(i32::try_from(l).map_err(|_| fail(&Value::Long(l)))?),
        (ValueType::Integer, Value::Double(d)) if d.fract() == 0.0 && d.abs() <= i32::MAX as f64 => Value::Int(d as i32),
        (ValueType::Integer, Value::Bool(b)) => Value::Int(b as i32),
        (ValueType::Integer, Value::Text(s)) => Value::Int(s.trim().parse().map_err(|_| fail(&Value::Text(s.clone())))?),

        (ValueType::Long, v @ (Value::Int(_) | Value::Long(_))) => Value::Long(v.as_i64().unwrap_or_default()),
        (ValueType::Long, Value::Double(d)) if d.fract() == 0.0 && d.abs() <= i64::MAX as f64 => Value::Long(d as i64),
        (ValueType::Long, Value::Bool(b)) => Value::Long(b as i64),
        (ValueType::Long, Value::Text(s)) => Value::Long(s.trim().parse().map_err(|_| fail(&Value::Text(s.clone())))?),

        (ValueType::Double, v @ (Value::Int(_) | Value::Long(_) | Value::Double(_))) => Value::Double(v.as_f64().unwrap_or_default()),
        (ValueType::Double, Value::Text(s)) => Value::Double(s.trim().parse().map_err(|_| fail(&Value::Text(s.clone())))?),

        (ValueType::String, Value::Text(s)) => Value::Text(s),
        (ValueType::String, v) => Value::Text(v.to_string()),

        (ValueType::Timestamp, Value::Timestamp(t)) => Value::Timestamp(t),
        (ValueType::Timestamp, Value::Text(s)) => Value::Timestamp(parse_timestamp(&s).ok_or_else(|| fail(&Value::Text(s.clone())))?),

        (_, v) => return Err(fail(&v)),
    })
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

macro_rules! value_type_handler {
    ($name:ident, $label:literal, $vt:expr) => {
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $name;

        impl TypeHandler for $name {
            fn name(&self) -> &'static str { $label }
            fn value_type(&self) -> ValueType { $vt }
            fn to_wire(&self, value: &Value, _jdbc_type: Option<JdbcType>) -> MapperResult<Value> { coerce(value.clone(), $vt) }
            fn convert_result(&self, value: Value) -> MapperResult<Value> { coerce(value, $vt) }
        }
    };
}

value_type_handler!(BooleanTypeHandler, "boolean", ValueType::Boolean);
value_type_handler!(IntegerTypeHandler, "integer", ValueType::Integer);
value_type_handler!(LongTypeHandler, "long", ValueType::Long);
value_type_handler!(DoubleTypeHandler, "double", ValueType::Double);
value_type_handler!(StringTypeHandler, "string", ValueType::String);
value_type_handler!(TimestampTypeHandler, "timestamp", ValueType::Timestamp);

/// Fallback handler: binds values as-is, or converts to the declared wire type when one is given.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjectTypeHandler;

impl TypeHandler for ObjectTypeHandler {
    fn name(&self) -> &'static str { "object" }
    fn value_type(&self) -> ValueType { ValueType::Object }

    fn to_wire(&self, value: &Value, jdbc_type: Option<JdbcType>) -> MapperResult<Value> {
        let target = match jdbc_type {
            Some(JdbcType::Boolean) => ValueType::Boolean,
            Some(JdbcType::Integer) => ValueType::Integer,
            Some(JdbcType::BigInt) => ValueType::Long,
            Some(JdbcType::Float | JdbcType::Double | JdbcType::Decimal) => ValueType::Double,
            Some(JdbcType::Varchar | JdbcType::Char) => ValueType::String,
            Some(JdbcType::Timestamp) => ValueType::Timestamp,
            Some(JdbcType::Null | JdbcType::Other) | None => ValueType::Object,
        };
        coerce(value.clone(), target)
    }

    fn convert_result(&self, value: Value) -> MapperResult<Value> { Ok(value) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_coercions_respect_range() {
        assert_eq!(coerce(Value::Long(7), ValueType::Integer).unwrap(), Value::Int(7));
        assert!(coerce(Value::Long(i64::MAX), ValueType::Integer).is_err());
        assert_eq!(coerce(Value::Int(7), ValueType::Double).unwrap(), Value::Double(7.0));
        assert_eq!(coerce(Value::from(" 42 "), ValueType::Long).unwrap(), Value::Long(42));
        assert!(coerce(Value::from("x"), ValueType::Long).is_err());
    }

    #[test]
    fn text_forms_parse() {
        assert_eq!(coerce(Value::from("yes"), ValueType::Boolean).unwrap(), Value::Bool(true));
        assert!(matches!(coerce(Value::from("2024-01-02 03:04:05"), ValueType::Timestamp).unwrap(), Value::Timestamp(_)));
        assert!(matches!(coerce(Value::from("2024-01-02T03:04:05.250"), ValueType::Timestamp).unwrap(), Value::Timestamp(_)));
        assert_eq!(coerce(Value::Int(3), ValueType::String).unwrap(), Value::from("3"));
    }

    #[test]
    fn object_handler_follows_declared_wire_type() {
        let h = ObjectTypeHandler;
        assert_eq!(h.to_wire(&Value::Int(3), Some(JdbcType::BigInt)).unwrap(), Value::Long(3));
        assert_eq!(h.to_wire(&Value::Int(3), None).unwrap(), Value::Int(3));
        assert_eq!(h.convert_result(Value::Null).unwrap(), Value::Null);
    }
}
