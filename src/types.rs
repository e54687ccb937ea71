//! Type handlers: conversion between host values and wire values at bind and fetch time.

pub mod handlers;
pub mod registry;

pub use handlers::{
    BooleanTypeHandler, DoubleTypeHandler, IntegerTypeHandler, LongTypeHandler, ObjectTypeHandler,
    StringTypeHandler, TimestampTypeHandler,
};
pub use registry::TypeHandlerRegistry;

use crate::driver::{DriverError, PreparedStatement, Row};
use crate::error::{MapperError, MapperResult};
use crate::value::{JdbcType, Value, ValueType};

pub trait TypeHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Host type this handler produces from result columns.
    fn value_type(&self) -> ValueType;

    /// Convert a non-null host value to the wire representation bound on a statement.
    fn to_wire(&self, value: &Value, jdbc_type: Option<JdbcType>) -> MapperResult<Value>;

    /// Convert a fetched wire value to the host representation; null stays null.
    fn convert_result(&self, value: Value) -> MapperResult<Value>;

    /// Bind `value` at 1-based `index`. A null value needs a declared wire type.
    fn set_parameter(&self, ps: &mut dyn PreparedStatement, index: usize, value: &Value, jdbc_type: Option<JdbcType>) -> MapperResult<()> {
        if value.is_null() {
            let jdbc_type = jdbc_type.ok_or(MapperError::NullTypeRequired { index })?;
            ps.set_null(index, jdbc_type)?;
            return Ok(());
        }
        let wire = self.to_wire(value, jdbc_type)?;
        ps.set_value(index, wire)?;
        Ok(())
    }

    fn get_result(&self, row: &Row, column: &str) -> MapperResult<Value> {
        match row.get_by_name(column) {
            Some(v) => self.convert_result(v.clone()),
            None => Err(DriverError::with_state(format!("column '{}' not in result", column), "42703").into()),
        }
    }

    fn get_result_at(&self, row: &Row, index: usize) -> MapperResult<Value> {
        match row.get(index) {
            Some(v) => self.convert_result(v.clone()),
            None => Err(DriverError::with_state(format!("column #{} not in result", index), "07009").into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{ColumnMeta, DriverResult, ResultSet};
    use chrono::NaiveDate;

    /// Records what a handler binds instead of talking to a store.
    #[derive(Default)]
    struct CapturingStatement {
        bound: Vec<(usize, Value, Option<JdbcType>)>,
    }

    impl PreparedStatement for CapturingStatement {
        fn sql(&self) -> &str { "?" }
        fn set_value(&mut self, index: usize, value: Value) -> DriverResult<()> {
            self.bound.push((index, value, None));
            Ok(())
        }
        fn set_null(&mut self, index: usize, jdbc_type: JdbcType) -> DriverResult<()> {
            self.bound.push((index, Value::Null, Some(jdbc_type)));
            Ok(())
        }
        fn execute_query(&mut self) -> DriverResult<ResultSet> { Ok(ResultSet::default()) }
        fn execute_update(&mut self) -> DriverResult<u64> { Ok(0) }
        fn generated_keys(&mut self) -> DriverResult<ResultSet> { Ok(ResultSet::default()) }
        fn close(&mut self) -> DriverResult<()> { Ok(()) }
    }

    fn sample(vt: ValueType) -> (Value, JdbcType) {
        let ts = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap().and_hms_opt(23, 59, 1).unwrap();
        match vt {
            ValueType::Boolean => (Value::Bool(true), JdbcType::Boolean),
            ValueType::Integer => (Value::Int(-4), JdbcType::Integer),
            ValueType::Long => (Value::Long(1 << 40), JdbcType::BigInt),
            ValueType::Double => (Value::Double(2.5), JdbcType::Double),
            ValueType::String => (Value::from("héllo"), JdbcType::Varchar),
            ValueType::Timestamp => (Value::Timestamp(ts), JdbcType::Timestamp),
            ValueType::Object => (Value::Long(7), JdbcType::Other),
        }
    }

    #[test]
    fn bind_then_fetch_returns_equal_value() {
        let registry = TypeHandlerRegistry::new();
        let pairs = registry.registered_pairs();
        assert_eq!(pairs.len(), 16);
        for (vt, jdbc_type) in pairs {
            let (value, default_column) = sample(vt);
            let column_type = jdbc_type.unwrap_or(default_column);
            let handler = registry.get(vt, jdbc_type).unwrap();
            assert_eq!(handler.value_type(), vt);
            let mut ps = CapturingStatement::default();
            handler.set_parameter(&mut ps, 1, &value, jdbc_type).unwrap();
            let (index, wire, _) = ps.bound.pop().unwrap();
            assert_eq!(index, 1);
            let rs = ResultSet::new(vec![ColumnMeta::new("c", column_type)], vec![vec![wire]]);
            assert_eq!(handler.get_result(&rs.rows()[0], "C").unwrap(), value, "{:?}/{:?}", vt, jdbc_type);
        }
    }

    #[test]
    fn null_needs_declared_wire_type() {
        let registry = TypeHandlerRegistry::new();
        let handler = registry.get(ValueType::Object, None).unwrap();
        let mut ps = CapturingStatement::default();
        let err = handler.set_parameter(&mut ps, 3, &Value::Null, None).unwrap_err();
        assert!(matches!(err, MapperError::NullTypeRequired { index: 3 }));
        handler.set_parameter(&mut ps, 3, &Value::Null, Some(JdbcType::Varchar)).unwrap();
        assert_eq!(ps.bound, vec![(3, Value::Null, Some(JdbcType::Varchar))]);
    }

    #[test]
    fn missing_column_is_reported() {
        let registry = TypeHandlerRegistry::new();
        let rs = ResultSet::new(vec![ColumnMeta::new("a", JdbcType::Integer)], vec![vec![Value::Int(1)]]);
        let h = registry.get(ValueType::Integer, None).unwrap();
        assert!(h.get_result(&rs.rows()[0], "b").is_err());
        assert_eq!(h.get_result_at(&rs.rows()[0], 1).unwrap(), Value::Int(1));
    }
}
