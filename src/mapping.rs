//! Mapped statements and the descriptors hanging off them.

use crate::cache::Cache;
use crate::error::{MapperError, MapperResult};
use crate::executor::keygen::{Jdbc3KeyGenerator, KeyGenerator, NoKeyGenerator};
use crate::ident::{column_key, namespace_of};
use crate::reflection::ParameterObject;
use crate::scripting::SqlSource;
use crate::types::TypeHandler;
use crate::value::{JdbcType, Value, ValueType};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlCommandType {
    Select,
    Insert,
    Update,
    Delete,
}

impl SqlCommandType {
    pub fn is_select(&self) -> bool { matches!(self, SqlCommandType::Select) }
}

/// What a row is turned into: a single scalar column or a named object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultDescriptor {
    Scalar(ValueType),
    Object(String),
}

#[derive(Clone)]
pub struct ResultMapping {
    pub property: String,
    pub column: String,
    pub value_type: Option<ValueType>,
    pub jdbc_type: Option<JdbcType>,
    pub type_handler: Option<Arc<dyn TypeHandler>>,
}

impl ResultMapping {
    pub fn new<P: Into<String>, C: Into<String>>(property: P, column: C) -> Self {
        Self { property: property.into(), column: column.into(), value_type: None, jdbc_type: None, type_handler: None }
    }
    pub fn value_type(mut self, vt: ValueType) -> Self { self.value_type = Some(vt); self }
    pub fn jdbc_type(mut self, jt: JdbcType) -> Self { self.jdbc_type = Some(jt); self }
    pub fn type_handler(mut self, h: Arc<dyn TypeHandler>) -> Self { self.type_handler = Some(h); self }
}

impl fmt::Debug for ResultMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultMapping")
            .field("property", &self.property)
            .field("column", &self.column)
            .field("value_type", &self.value_type)
            .field("jdbc_type", &self.jdbc_type)
            .field("type_handler", &self.type_handler.as_ref().map(|h| h.name()))
            .finish()
    }
}

/// Explicit column-to-property mapping for one result type.
#[derive(Debug, Clone)]
pub struct ResultMap {
    id: String,
    type_name: String,
    mappings: Vec<ResultMapping>,
    mapped_columns: HashSet<String>,
}

impl ResultMap {
    pub fn builder<I: Into<String>, T: Into<String>>(id: I, type_name: T) -> ResultMapBuilder {
        ResultMapBuilder { id: id.into(), type_name: type_name.into(), mappings: Vec::new() }
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn type_name(&self) -> &str { &self.type_name }
    pub fn mappings(&self) -> &[ResultMapping] { &self.mappings }
    /// Upper-cased column names covered by the mappings.
    pub fn mapped_columns(&self) -> &HashSet<String> { &self.mapped_columns }
    pub fn is_mapped(&self, column: &str) -> bool { self.mapped_columns.contains(&column_key(column)) }
}

pub struct ResultMapBuilder {
    id: String,
    type_name: String,
    mappings: Vec<ResultMapping>,
}

impl ResultMapBuilder {
    pub fn mapping(mut self, m: ResultMapping) -> Self { self.mappings.push(m); self }

    pub fn build(self) -> MapperResult<ResultMap> {
        let mut mapped_columns = HashSet::new();
        for m in &self.mappings {
            if m.property.trim().is_empty() || m.column.trim().is_empty() {
                return Err(MapperError::builder(format!("result map '{}' has a mapping without property or column", self.id)));
            }
            if !mapped_columns.insert(column_key(&m.column)) {
                return Err(MapperError::builder(format!("result map '{}' maps column '{}' twice", self.id, m.column)));
            }
        }
        Ok(ResultMap { id: self.id, type_name: self.type_name, mappings: self.mappings, mapped_columns })
    }
}

/// One `#{...}` placeholder; position in the list is the 1-based bind index minus one.
#[derive(Clone)]
pub struct ParameterMapping {
    pub property: String,
    pub jdbc_type: Option<JdbcType>,
    pub type_handler: Option<Arc<dyn TypeHandler>>,
}

impl ParameterMapping {
    pub fn new<S: Into<String>>(property: S) -> Self { Self { property: property.into(), jdbc_type: None, type_handler: None } }
}

impl fmt::Debug for ParameterMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterMapping")
            .field("property", &self.property)
            .field("jdbc_type", &self.jdbc_type)
            .field("type_handler", &self.type_handler.as_ref().map(|h| h.name()))
            .finish()
    }
}

impl PartialEq for ParameterMapping {
    fn eq(&self, other: &Self) -> bool {
        self.property == other.property
            && self.jdbc_type == other.jdbc_type
            && self.type_handler.as_ref().map(|h| h.name()) == other.type_handler.as_ref().map(|h| h.name())
    }
}

/// Rendered SQL for one call, with its placeholders and the side bindings produced while rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    pub parameter_mappings: Vec<ParameterMapping>,
    pub additional_parameters: HashMap<String, Value>,
}

impl BoundStatement {
    pub fn new<S: Into<String>>(sql: S, parameter_mappings: Vec<ParameterMapping>) -> Self {
        Self { sql: sql.into(), parameter_mappings, additional_parameters: HashMap::new() }
    }

    pub fn has_additional_parameter(&self, name: &str) -> bool { self.additional_parameters.contains_key(name) }
    pub fn additional_parameter(&self, name: &str) -> Option<&Value> { self.additional_parameters.get(name) }
}

pub struct MappedStatement {
    id: String,
    command: SqlCommandType,
    sql_source: SqlSource,
    result_type: Option<ResultDescriptor>,
    result_map: Option<Arc<ResultMap>>,
    use_generated_keys: bool,
    key_property: Option<String>,
    use_cache: bool,
    flush_cache: bool,
    cache: Option<Arc<dyn Cache>>,
    key_generator: Arc<dyn KeyGenerator>,
}

impl MappedStatement {
    pub fn builder<S: Into<String>>(id: S, command: SqlCommandType, sql_source: SqlSource) -> MappedStatementBuilder {
        MappedStatementBuilder {
            id: id.into(),
            command,
            sql_source,
            result_type: None,
            result_map: None,
            key_property: None,
            use_cache: command.is_select(),
            flush_cache: !command.is_select(),
            cache: None,
        }
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn namespace(&self) -> &str { namespace_of(&self.id) }
    pub fn command(&self) -> SqlCommandType { self.command }
    pub fn sql_source(&self) -> &SqlSource { &self.sql_source }
    pub fn result_type(&self) -> Option<&ResultDescriptor> { self.result_type.as_ref() }
    pub fn result_map(&self) -> Option<&Arc<ResultMap>> { self.result_map.as_ref() }
    pub fn use_generated_keys(&self) -> bool { self.use_generated_keys }
    pub fn key_property(&self) -> Option<&str> { self.key_property.as_deref() }
    pub fn is_cache_enabled(&self) -> bool { self.use_cache }
    /// Whether running the statement invalidates the local cache and the namespace cache.
    pub fn flush_cache_required(&self) -> bool { self.flush_cache }
    pub fn cache(&self) -> Option<&Arc<dyn Cache>> { self.cache.as_ref() }
    pub fn key_generator(&self) -> &dyn KeyGenerator { self.key_generator.as_ref() }

    pub fn bound_statement(&self, parameter: &dyn ParameterObject) -> MapperResult<BoundStatement> {
        self.sql_source.bound_statement(parameter)
    }
}

impl fmt::Debug for MappedStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedStatement")
            .field("id", &self.id)
            .field("command", &self.command)
            .field("dynamic", &self.sql_source.is_dynamic())
            .field("result_type", &self.result_type)
            .field("result_map", &self.result_map.as_ref().map(|m| m.id()))
            .field("use_generated_keys", &self.use_generated_keys)
            .field("use_cache", &self.use_cache)
            .field("cache", &self.cache.as_ref().map(|c| c.id().to_string()))
            .finish()
    }
}

pub struct MappedStatementBuilder {
    id: String,
    command: SqlCommandType,
    sql_source: SqlSource,
    result_type: Option<ResultDescriptor>,
    result_map: Option<Arc<ResultMap>>,
    key_property: Option<String>,
    use_cache: bool,
    flush_cache: bool,
    cache: Option<Arc<dyn Cache>>,
}

impl MappedStatementBuilder {
    pub fn result_type(mut self, rt: ResultDescriptor) -> Self { self.result_type = Some(rt); self }
    pub fn result_map(mut self, rm: Arc<ResultMap>) -> Self { self.result_map = Some(rm); self }
    /// Write the store-generated key of an INSERT back onto `key_property` of the parameter.
    pub fn generated_keys<S: Into<String>>(mut self, key_property: S) -> Self { self.key_property = Some(key_property.into()); self }
    pub fn use_cache(mut self, on: bool) -> Self { self.use_cache = on; self }
    pub fn flush_cache(mut self, on: bool) -> Self { self.flush_cache = on; self }
    pub fn cache(mut self, cache: Arc<dyn Cache>) -> Self { self.cache = Some(cache); self }

    pub fn build(self) -> MapperResult<MappedStatement> {
        if self.id.trim().is_empty() {
            return Err(MapperError::builder("mapped statement id must not be empty"));
        }
        if self.command.is_select() && self.result_type.is_none() && self.result_map.is_none() {
            return Err(MapperError::builder(format!("select '{}' needs a result type or a result map", self.id)));
        }
        let use_generated_keys = self.key_property.is_some() && self.command == SqlCommandType::Insert;
        let key_generator: Arc<dyn KeyGenerator> = if use_generated_keys { Arc::new(Jdbc3KeyGenerator) } else { Arc::new(NoKeyGenerator) };
        Ok(MappedStatement {
            id: self.id,
            command: self.command,
            sql_source: self.sql_source,
            result_type: self.result_type,
            result_map: self.result_map,
            use_generated_keys,
            key_property: self.key_property,
            use_cache: self.use_cache,
            flush_cache: self.flush_cache,
            cache: self.cache,
            key_generator,
        })
    }
}
