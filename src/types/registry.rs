use super::handlers::*;
use super::TypeHandler;
use crate::error::{MapperError, MapperResult};
use crate::value::{JdbcType, Value, ValueType};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

type HandlerTable = HashMap<ValueType, HashMap<Option<JdbcType>, Arc<dyn TypeHandler>>>;

/// Maps (host type, wire type) to a handler. `None` as wire type is the wildcard entry.
/// Lookup order: exact pair, the type's wildcard, then the same two lookups for `Object`.
pub struct TypeHandlerRegistry {
    handlers: RwLock<HandlerTable>,
}

impl Default for TypeHandlerRegistry {
    fn default() -> Self { Self::new() }
}

impl TypeHandlerRegistry {
    /// Registry with the built-in handlers.
    pub fn new() -> Self {
        let reg = Self::empty();
        let boolean: Arc<dyn TypeHandler> = Arc::new(BooleanTypeHandler);
        let integer: Arc<dyn TypeHandler> = Arc::new(IntegerTypeHandler);
        let long: Arc<dyn TypeHandler> = Arc::new(LongTypeHandler);
        let double: Arc<dyn TypeHandler> = Arc::new(DoubleTypeHandler);
        let string: Arc<dyn TypeHandler> = Arc::new(StringTypeHandler);
        let timestamp: Arc<dyn TypeHandler> = Arc::new(TimestampTypeHandler);
        let object: Arc<dyn TypeHandler> = Arc::new(ObjectTypeHandler);

        for jt in [None, Some(JdbcType::Boolean)] { reg.register(ValueType::Boolean, jt, boolean.clone()); }
        for jt in [None, Some(JdbcType::Integer)] { reg.register(ValueType::Integer, jt, integer.clone()); }
        for jt in [None, Some(JdbcType::BigInt)] { reg.register(ValueType::Long, jt, long.clone()); }
        for jt in [None, Some(JdbcType::Double), Some(JdbcType::Float), Some(JdbcType::Decimal)] {
            reg.register(ValueType::Double, jt, double.clone());
        }
        for jt in [None, Some(JdbcType::Varchar), Some(JdbcType::Char)] { reg.register(ValueType::String, jt, string.clone()); }
        for jt in [None, Some(JdbcType::Timestamp)] { reg.register(ValueType::Timestamp, jt, timestamp.clone()); }
        reg.register(ValueType::Object, None, object);
        reg
    }

    /// Registry without any handler; every lookup fails until something is registered.
    pub fn empty() -> Self { Self { handlers: RwLock::new(HashMap::new()) } }

    pub fn register(&self, value_type: ValueType, jdbc_type: Option<JdbcType>, handler: Arc<dyn TypeHandler>) {
        self.handlers.write().entry(value_type).or_default().insert(jdbc_type, handler);
    }

    fn lookup(table: &HandlerTable, value_type: ValueType, jdbc_type: Option<JdbcType>) -> Option<Arc<dyn TypeHandler>> {
        let by_jdbc = table.get(&value_type)?;
        by_jdbc.get(&jdbc_type).or_else(|| by_jdbc.get(&None)).cloned()
    }

    pub fn get(&self, value_type: ValueType, jdbc_type: Option<JdbcType>) -> MapperResult<Arc<dyn TypeHandler>> {
        let g = self.handlers.read();
        Self::lookup(&g, value_type, jdbc_type)
            .or_else(|| Self::lookup(&g, ValueType::Object, jdbc_type))
            .ok_or(MapperError::NoTypeHandlerFound { value_type, jdbc_type })
    }

    pub fn has_handler(&self, value_type: ValueType, jdbc_type: Option<JdbcType>) -> bool {
        Self::lookup(&self.handlers.read(), value_type, jdbc_type).is_some()
    }

    pub fn has_type_handler(&self, value_type: ValueType) -> bool { self.has_handler(value_type, None) }

    /// Every registered (host type, wire type) pair, in declaration order of the two enums.
    pub fn registered_pairs(&self) -> Vec<(ValueType, Option<JdbcType>)> {
        let mut pairs: Vec<_> = self
            .handlers
            .read()
            .iter()
            .flat_map(|(vt, by_jdbc)| by_jdbc.keys().map(move |jt| (*vt, *jt)))
            .collect();
        pairs.sort_by_key(|(vt, jt)| (*vt as u8, jt.map_or(0, |j| j as u8 + 1)));
        pairs
    }

    /// Handler chosen from the runtime type of a value.
    pub fn for_value(&self, value: &Value, jdbc_type: Option<JdbcType>) -> MapperResult<Arc<dyn TypeHandler>> {
        self.get(value.value_type(), jdbc_type)
    }

    /// Handler for a declared type alias (`javaType=long` and friends).
    pub fn by_alias(&self, alias: &str, jdbc_type: Option<JdbcType>) -> MapperResult<Arc<dyn TypeHandler>> {
        let vt = ValueType::from_name(alias).ok_or_else(|| MapperError::builder(format!("unknown type alias '{}'", alias)))?;
        self.get(vt, jdbc_type)
    }
}
