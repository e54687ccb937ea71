use super::builder::ScriptBuilder;
use super::context::DynamicContext;
use super::node::SqlNode;
use super::tokens::parse_parameter_tokens;
use crate::error::MapperResult;
use crate::mapping::{BoundStatement, ParameterMapping};
use crate::reflection::ParameterObject;
use crate::types::TypeHandlerRegistry;
use std::sync::Arc;

/// SQL rendered once up front; every call gets the same text and placeholders.
#[derive(Debug, Clone)]
pub struct StaticSqlSource {
    sql: String,
    parameter_mappings: Vec<ParameterMapping>,
}

impl StaticSqlSource {
    pub fn new<S: Into<String>>(sql: S, parameter_mappings: Vec<ParameterMapping>) -> Self {
        Self { sql: sql.into(), parameter_mappings }
    }

    /// Render a parameter-independent tree now.
    pub fn from_node(root: &SqlNode, registry: &TypeHandlerRegistry) -> MapperResult<Self> {
        let mut ctx = DynamicContext::new(&());
        root.apply(&mut ctx)?;
        let (sql, parameter_mappings) = parse_parameter_tokens(ctx.sql(), registry)?;
        Ok(Self { sql, parameter_mappings })
    }

    pub fn sql(&self) -> &str { &self.sql }

    pub fn bound_statement(&self) -> BoundStatement {
        BoundStatement::new(self.sql.clone(), self.parameter_mappings.clone())
    }
}

/// SQL re-rendered for every call from the parameter.
pub struct DynamicSqlSource {
    root: SqlNode,
    registry: Arc<TypeHandlerRegistry>,
}

impl DynamicSqlSource {
    pub fn new(root: SqlNode, registry: Arc<TypeHandlerRegistry>) -> Self { Self { root, registry } }

    pub fn root(&self) -> &SqlNode { &self.root }

    pub fn bound_statement(&self, parameter: &dyn ParameterObject) -> MapperResult<BoundStatement> {
        let mut ctx = DynamicContext::new(parameter);
        self.root.apply(&mut ctx)?;
        let (sql, bindings) = ctx.into_parts();
        let (sql, parameter_mappings) = parse_parameter_tokens(&sql, &self.registry)?;
        let mut bound = BoundStatement::new(sql, parameter_mappings);
        bound.additional_parameters = bindings;
        Ok(bound)
    }
}

pub enum SqlSource {
    Static(StaticSqlSource),
    Dynamic(DynamicSqlSource),
}

impl SqlSource {
    /// Build from template markup; parameter-independent templates are rendered once.
    pub fn from_script(template: &str, registry: &Arc<TypeHandlerRegistry>) -> MapperResult<Self> {
        let (root, dynamic) = ScriptBuilder::parse(template)?;
        Self::from_node(root, dynamic, registry)
    }

    pub fn from_node(root: SqlNode, dynamic: bool, registry: &Arc<TypeHandlerRegistry>) -> MapperResult<Self> {
        if dynamic {
            Ok(SqlSource::Dynamic(DynamicSqlSource::new(root, registry.clone())))
        } else {
            Ok(SqlSource::Static(StaticSqlSource::from_node(&root, registry)?))
        }
    }

    pub fn is_dynamic(&self) -> bool { matches!(self, SqlSource::Dynamic(_)) }

    pub fn bound_statement(&self, parameter: &dyn ParameterObject) -> MapperResult<BoundStatement> {
        match self {
            SqlSource::Static(s) => Ok(s.bound_statement()),
            SqlSource::Dynamic(d) => d.bound_statement(parameter),
        }
    }
}
