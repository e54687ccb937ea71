//! Structural property access.
//!
//! Parameter objects and result objects are read and written through [`MetaObject`], a
//! per-type accessor table instead of runtime reflection. Structs get one generated by the
//! [`mapped_entity!`](crate::mapped_entity) macro; [`Record`] is an open, map-backed object
//! that accepts any property (the equivalent of passing a map as parameter).

use crate::error::{MapperError, MapperResult};
use crate::value::{Value, ValueType};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

/// Declared shape of one property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyInfo {
    pub value_type: ValueType,
    /// False for properties that cannot hold null (plain `i64`, `String`, ...); result mapping
    /// skips null column values for those instead of coercing them.
    pub nullable: bool,
}

impl PropertyInfo {
    pub fn of<F: FieldValue>() -> Self { Self { value_type: F::VALUE_TYPE, nullable: F::NULLABLE } }
}

pub trait MetaObject: Send + Sync {
    fn type_name(&self) -> &str;

    /// Shape of a property by exact name; `None` when the object has no such property.
    fn property(&self, name: &str) -> Option<PropertyInfo>;

    fn property_names(&self) -> Vec<String>;

    fn get_value(&self, name: &str) -> MapperResult<Value>;

    fn set_value(&mut self, name: &str, value: Value) -> MapperResult<()>;

    /// Case-insensitive lookup of a property name, returning its declared spelling.
    fn find_property(&self, name: &str) -> Option<String> {
        if self.property(name).is_some() { return Some(name.to_string()); }
        self.property_names().into_iter().find(|p| p.eq_ignore_ascii_case(name))
    }

    fn has_getter(&self, name: &str) -> bool { self.property(name).is_some() }

    fn has_setter(&self, name: &str) -> bool { self.property(name).is_some() }

    /// Ordered (name, value) pairs used for structural cache keys. Types that cannot be
    /// compared structurally return `None` and bypass caching.
    fn snapshot(&self) -> Option<Vec<(String, Value)>> {
        let mut out = Vec::new();
        for name in self.property_names() {
            let v = self.get_value(&name).ok()?;
            out.push((name, v));
        }
        Some(out)
    }
}

/// A parameter handed to `query`/`update`: absent, a bare scalar, or a structured object.
pub trait ParameterObject: Send + Sync {
    fn scalar(&self) -> Option<Value> { None }
    fn meta(&self) -> Option<&dyn MetaObject> { None }
    fn meta_mut(&mut self) -> Option<&mut dyn MetaObject> { None }

    fn is_absent(&self) -> bool { self.scalar().is_none() && self.meta().is_none() }

    fn describe(&self) -> String {
        if let Some(v) = self.scalar() { return format!("{:?}", v); }
        match self.meta().and_then(|m| m.snapshot()) {
            Some(fields) => format!("{:?}", fields),
            None if self.is_absent() => "null".to_string(),
            None => "<opaque>".to_string(),
        }
    }
}

/// The absent parameter.
impl ParameterObject for () {}

impl ParameterObject for Value {
    fn scalar(&self) -> Option<Value> { if self.is_null() { None } else { Some(self.clone()) } }
}

macro_rules! scalar_parameter {
    ($($t:ty),*) => {
        $(impl ParameterObject for $t {
            fn scalar(&self) -> Option<Value> { Some(Value::from(self.clone())) }
        })*
    };
}

scalar_parameter!(bool, i32, i64, f64, String, NaiveDateTime);

impl ParameterObject for &str {
    fn scalar(&self) -> Option<Value> { Some(Value::from(*self)) }
}

/// Conversion between a Rust field type and [`Value`], used by generated accessors.
pub trait FieldValue: Sized {
    const VALUE_TYPE: ValueType;
    const NULLABLE: bool;
    fn to_value(&self) -> Value;
    fn from_value(v: Value) -> MapperResult<Self>;
}

impl FieldValue for bool {
    const VALUE_TYPE: ValueType = ValueType::Boolean;
    const NULLABLE: bool = false;
    fn to_value(&self) -> Value { Value::Bool(*self) }
    fn from_value(v: Value) -> MapperResult<Self> {
        match v {
            Value::Bool(b) => Ok(b),
            other => Err(MapperError::conversion(&other, Self::VALUE_TYPE)),
        }
    }
}

impl FieldValue for i32 {
    const VALUE_TYPE: ValueType = ValueType::Integer;
    const NULLABLE: bool = false;
    fn to_value(&self) -> Value { Value::Int(*self) }
    fn from_value(v: Value) -> MapperResult<Self> {
        match v {
            Value::Int(i) => Ok(i),
            Value::Long(l) => i32::try_from(l).map_err(|_| MapperError::conversion(&Value::Long(l), Self::VALUE_TYPE)),
            other => Err(MapperError::conversion(&other, Self::VALUE_TYPE)),
        }
    }
}

impl FieldValue for i64 {
    const VALUE_TYPE: ValueType = ValueType::Long;
    const NULLABLE: bool = false;
    fn to_value(&self) -> Value { Value::Long(*self) }
    fn from_value(v: Value) -> MapperResult<Self> {
        v.as_i64().ok_or_else(|| MapperError::conversion(&v, Self::VALUE_TYPE))
    }
}

impl FieldValue for f64 {
    const VALUE_TYPE: ValueType = ValueType::Double;
    const NULLABLE: bool = false;
    fn to_value(&self) -> Value { Value::Double(*self) }
    fn from_value(v: Value) -> MapperResult<Self> {
        v.as_f64().ok_or_else(|| MapperError::conversion(&v, Self::VALUE_TYPE))
    }
}

impl FieldValue for String {
    const VALUE_TYPE: ValueType = ValueType::String;
    const NULLABLE: bool = false;
    fn to_value(&self) -> Value { Value::Text(self.clone()) }
    fn from_value(v: Value) -> MapperResult<Self> {
        match v {
            Value::Text(s) => Ok(s),
            other => Err(MapperError::conversion(&other, Self::VALUE_TYPE)),
        }
    }
}

impl FieldValue for NaiveDateTime {
    const VALUE_TYPE: ValueType = ValueType::Timestamp;
    const NULLABLE: bool = false;
    fn to_value(&self) -> Value { Value::Timestamp(*self) }
    fn from_value(v: Value) -> MapperResult<Self> {
        match v {
            Value::Timestamp(t) => Ok(t),
            other => Err(MapperError::conversion(&other, Self::VALUE_TYPE)),
        }
    }
}

impl FieldValue for Value {
    const VALUE_TYPE: ValueType = ValueType::Object;
    const NULLABLE: bool = true;
    fn to_value(&self) -> Value { self.clone() }
    fn from_value(v: Value) -> MapperResult<Self> { Ok(v) }
}

impl<T: FieldValue> FieldValue for Option<T> {
    const VALUE_TYPE: ValueType = T::VALUE_TYPE;
    const NULLABLE: bool = true;
    fn to_value(&self) -> Value {
        match self { Some(v) => v.to_value(), None => Value::Null }
    }
    fn from_value(v: Value) -> MapperResult<Self> {
        if v.is_null() { Ok(None) } else { T::from_value(v).map(Some) }
    }
}

/// Open, map-backed object. Every property name is accepted; unknown properties read as null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self { Self::default() }

    pub fn with<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> { self.fields.get(key) }

    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize { self.fields.len() }
    pub fn is_empty(&self) -> bool { self.fields.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> { self.fields.iter() }

    /// Build from a JSON object; nested arrays/objects are kept as their JSON text.
    pub fn from_json(json: &serde_json::Value) -> MapperResult<Self> {
        let obj = json.as_object().ok_or_else(|| MapperError::property("Record", "<root>", "expected a JSON object"))?;
        Ok(Self { fields: obj.iter().map(|(k, v)| (k.clone(), Value::from(v))).collect() })
    }
}

impl MetaObject for Record {
    fn type_name(&self) -> &str { "Record" }

    fn property(&self, name: &str) -> Option<PropertyInfo> {
        let value_type = self.fields.get(name).map(|v| v.value_type()).unwrap_or(ValueType::Object);
        Some(PropertyInfo { value_type, nullable: true })
    }

    fn property_names(&self) -> Vec<String> { self.fields.keys().cloned().collect() }

    fn get_value(&self, name: &str) -> MapperResult<Value> {
        Ok(self.fields.get(name).cloned().unwrap_or(Value::Null))
    }

    fn set_value(&mut self, name: &str, value: Value) -> MapperResult<()> {
        self.fields.insert(name.to_string(), value);
        Ok(())
    }

    fn find_property(&self, name: &str) -> Option<String> {
        if self.fields.contains_key(name) { return Some(name.to_string()); }
        Some(self.fields.keys().find(|k| k.eq_ignore_ascii_case(name)).cloned().unwrap_or_else(|| name.to_string()))
    }
}

impl ParameterObject for Record {
    fn meta(&self) -> Option<&dyn MetaObject> { Some(self) }
    fn meta_mut(&mut self) -> Option<&mut dyn MetaObject> { Some(self) }
}

/// Declare a struct as a mapped entity: generates its [`MetaObject`] accessors and makes it
/// usable as a parameter object and as a query result type. The struct must implement
/// `Default` (result rows are populated into fresh default instances).
///
/// ```ignore
/// #[derive(Debug, Clone, Default)]
/// struct User { id: Option<i64>, name: Option<String> }
/// sqlmapper::mapped_entity!(User { id: Option<i64>, name: Option<String> });
/// ```
#[macro_export]
macro_rules! mapped_entity {
    ($ty:ident { $($field:ident : $fty:ty),* $(,)? }) => {
        impl $crate::reflection::MetaObject for $ty {
            fn type_name(&self) -> &str { stringify!($ty) }

            fn property(&self, name: &str) -> Option<$crate::reflection::PropertyInfo> {
                $( if name == stringify!($field) { return Some($crate::reflection::PropertyInfo::of::<$fty>()); } )*
                None
            }

            fn property_names(&self) -> Vec<String> { vec![$(stringify!($field).to_string()),*] }

            fn get_value(&self, name: &str) -> $crate::error::MapperResult<$crate::value::Value> {
                $( if name == stringify!($field) { return Ok(<$fty as $crate::reflection::FieldValue>::to_value(&self.$field)); } )*
                Err($crate::error::MapperError::property(stringify!($ty), name, "no getter"))
            }

            #[allow(unused_variables)]
            fn set_value(&mut self, name: &str, value: $crate::value::Value) -> $crate::error::MapperResult<()> {
                $( if name == stringify!($field) {
                    self.$field = <$fty as $crate::reflection::FieldValue>::from_value(value)?;
                    return Ok(());
                } )*
                Err($crate::error::MapperError::property(stringify!($ty), name, "no setter"))
            }
        }

        impl $crate::reflection::ParameterObject for $ty {
            fn meta(&self) -> Option<&dyn $crate::reflection::MetaObject> { Some(self) }
            fn meta_mut(&mut self) -> Option<&mut dyn $crate::reflection::MetaObject> { Some(self) }
        }

        impl $crate::executor::resultset::ResultTarget for $ty {
            fn map_row(row: &$crate::driver::Row, ctx: &$crate::executor::resultset::RowContext<'_>) -> $crate::error::MapperResult<Self> {
                let mut target = <$ty as ::std::default::Default>::default();
                $crate::executor::resultset::populate_object(&mut target, row, ctx)?;
                Ok(target)
            }
        }
    };
}
