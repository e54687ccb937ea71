//! Row-to-object mapping.

use crate::cache::CachedList;
use crate::driver::{ResultSet, Row};
use crate::error::{MapperError, MapperResult};
use crate::mapping::{MappedStatement, ResultDescriptor, ResultMap};
use crate::reflection::{FieldValue, MetaObject, Record};
use crate::types::TypeHandlerRegistry;
use crate::value::{Value, ValueType};
use chrono::NaiveDateTime;
use std::marker::PhantomData;
use std::sync::Arc;

/// Per-query mapping state, fixed before the first row is read.
pub struct RowContext<'a> {
    pub registry: &'a TypeHandlerRegistry,
    /// `Some` selects the result-map strategy; `None` maps columns to same-named properties.
    pub result_map: Option<&'a ResultMap>,
    pub statement_id: &'a str,
}

/// Row shape a target type consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    /// First column only.
    Scalar,
    /// Columns mapped onto properties.
    Object,
    /// Fits either declaration.
    Any,
}

impl ResultShape {
    fn admits(self, declared: ResultShape) -> bool {
        self == ResultShape::Any || declared == ResultShape::Any || self == declared
    }
}

/// A type query rows can be mapped into.
pub trait ResultTarget: Sized + Send + Sync + 'static {
    const SHAPE: ResultShape = ResultShape::Object;

    fn map_row(row: &Row, ctx: &RowContext<'_>) -> MapperResult<Self>;
}

/// Shape the statement declares; a result map always means objects.
fn declared_shape(ms: &MappedStatement) -> Option<(ResultShape, String)> {
    if let Some(rm) = ms.result_map() {
        return Some((ResultShape::Object, format!("result map '{}'", rm.id())));
    }
    match ms.result_type()? {
        ResultDescriptor::Scalar(vt) => Some((ResultShape::Scalar, format!("scalar {:?}", vt))),
        ResultDescriptor::Object(name) => Some((ResultShape::Object, format!("object '{}'", name))),
    }
}

/// Turns a whole result set into a type-erased `Vec<T>`.
pub trait ResultListHandler: Send + Sync {
    fn handle_result_set(&self, ms: &MappedStatement, rs: ResultSet, registry: &TypeHandlerRegistry) -> MapperResult<CachedList>;

    /// Whether a cached list has the element type this handler produces.
    fn accepts(&self, cached: &CachedList) -> bool;
}

pub struct DefaultResultSetHandler<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> DefaultResultSetHandler<T> {
    pub fn new() -> Self { Self { _marker: PhantomData } }
}

impl<T> Default for DefaultResultSetHandler<T> {
    fn default() -> Self { Self::new() }
}

impl<T: ResultTarget> DefaultResultSetHandler<T> {
    pub fn map_rows(&self, ms: &MappedStatement, rs: &ResultSet, registry: &TypeHandlerRegistry) -> MapperResult<Vec<T>> {
        if let Some((shape, declared)) = declared_shape(ms) {
            if !T::SHAPE.admits(shape) {
                return Err(MapperError::ResultTypeMismatch {
                    statement: ms.id().to_string(),
                    declared,
                    requested: std::any::type_name::<T>().to_string(),
                });
            }
        }
        let ctx = RowContext { registry, result_map: ms.result_map().map(|m| m.as_ref()), statement_id: ms.id() };
        rs.rows().iter().map(|row| T::map_row(row, &ctx)).collect()
    }
}

impl<T: ResultTarget> ResultListHandler for DefaultResultSetHandler<T> {
    fn handle_result_set(&self, ms: &MappedStatement, rs: ResultSet, registry: &TypeHandlerRegistry) -> MapperResult<CachedList> {
        let rows = self.map_rows(ms, &rs, registry)?;
        Ok(Arc::new(rows))
    }

    fn accepts(&self, cached: &CachedList) -> bool { (**cached).is::<Vec<T>>() }
}

/// Fill a fresh object from one row using the strategy chosen in `ctx`. Null values are
/// skipped for properties that cannot hold null.
pub fn populate_object(target: &mut dyn MetaObject, row: &Row, ctx: &RowContext<'_>) -> MapperResult<()> {
    match ctx.result_map {
        Some(rm) => {
            for m in rm.mappings() {
                let Some(index) = row.column_index(&m.column) else { continue; };
                let name = target.find_property(&m.property)
                    .ok_or_else(|| MapperError::property(target.type_name(), &m.property, "no setter"))?;
                let info = target.property(&name);
                let handler = match &m.type_handler {
                    Some(h) => h.clone(),
                    None => {
                        let vt = m.value_type.or(info.map(|i| i.value_type)).unwrap_or(ValueType::Object);
                        ctx.registry.get(vt, m.jdbc_type.or(row.jdbc_type(index + 1)))?
                    }
                };
                let value = handler.get_result_at(row, index + 1)?;
                assign(target, &name, value, info.map(|i| i.nullable).unwrap_or(true))?;
            }
        }
        None => {
            for (i, col) in row.columns().iter().enumerate() {
                let Some(name) = target.find_property(&col.name) else { continue; };
                let Some(info) = target.property(&name) else { continue; };
                let handler = ctx.registry.get(info.value_type, Some(col.jdbc_type))?;
                let value = handler.get_result_at(row, i + 1)?;
                assign(target, &name, value, info.nullable)?;
            }
        }
    }
    Ok(())
}

fn assign(target: &mut dyn MetaObject, name: &str, value: Value, nullable: bool) -> MapperResult<()> {
    if value.is_null() && !nullable { return Ok(()); }
    target.set_value(name, value)
}

fn read_scalar(row: &Row, ctx: &RowContext<'_>, vt: ValueType) -> MapperResult<Value> {
    if row.is_empty() {
        return Err(MapperError::property(ctx.statement_id, "<column 1>", "result row has no columns"));
    }
    ctx.registry.get(vt, row.jdbc_type(1))?.get_result_at(row, 1)
}

macro_rules! scalar_target {
    ($($t:ty),*) => {
        $(
        impl ResultTarget for $t {
            const SHAPE: ResultShape = ResultShape::Scalar;

            fn map_row(row: &Row, ctx: &RowContext<'_>) -> MapperResult<Self> {
                <$t as FieldValue>::from_value(read_scalar(row, ctx, <$t as FieldValue>::VALUE_TYPE)?)
            }
        }

        impl ResultTarget for Option<$t> {
            const SHAPE: ResultShape = ResultShape::Scalar;

            fn map_row(row: &Row, ctx: &RowContext<'_>) -> MapperResult<Self> {
                <Option<$t> as FieldValue>::from_value(read_scalar(row, ctx, <$t as FieldValue>::VALUE_TYPE)?)
            }
        }
        )*
    };
}

scalar_target!(i32, i64, f64, bool, String, NaiveDateTime);

impl ResultTarget for Value {
    const SHAPE: ResultShape = ResultShape::Scalar;

    fn map_row(row: &Row, ctx: &RowContext<'_>) -> MapperResult<Self> { read_scalar(row, ctx, ValueType::Object) }
}

impl ResultTarget for Record {
    const SHAPE: ResultShape = ResultShape::Any;

    fn map_row(row: &Row, ctx: &RowContext<'_>) -> MapperResult<Self> {
        let mut record = Record::new();
        populate_object(&mut record, row, ctx)?;
        Ok(record)
    }
}

#[cfg(test)]
#[path = "resultset_tests.rs"]
mod resultset_tests;
