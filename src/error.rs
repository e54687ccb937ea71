//! Unified engine error model.
//! Every fallible operation of the mapping pipeline returns `MapperResult<T>`; driver failures
//! cross the connection-provider boundary as `DriverError` and are wrapped here.

use crate::driver::DriverError;
use crate::value::{JdbcType, ValueType};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapperError {
    /// Malformed or unresolvable dynamic-SQL expression.
    #[error("error evaluating expression '{expression}': {message}")]
    ExpressionEvaluation { expression: String, message: String },

    #[error("no type handler found for type {value_type:?} and jdbcType {jdbc_type:?}")]
    NoTypeHandlerFound { value_type: ValueType, jdbc_type: Option<JdbcType> },

    /// A null bind value without a declared wire type.
    #[error("parameter #{index} is null; a jdbcType must be specified for all nullable parameters")]
    NullTypeRequired { index: usize },

    #[error("error executing statement '{statement}': {source}")]
    StatementExecution {
        statement: String,
        #[source]
        source: DriverError,
    },

    /// A parameter object that cannot produce a structural cache key.
    #[error("cannot build cache key: {0}")]
    CacheKey(String),

    #[error("statement '{statement}' expected one row (or none) but found {rows}")]
    AmbiguousSingleResult { statement: String, rows: usize },

    #[error("mapped statement '{0}' not found")]
    StatementNotFound(String),

    #[error("cannot convert {found} to {target:?}")]
    TypeConversion { found: String, target: ValueType },

    #[error("property '{property}' of '{type_name}': {message}")]
    Property { type_name: String, property: String, message: String },

    /// The requested row type contradicts the statement's declared result.
    #[error("statement '{statement}' declares {declared} results; cannot map rows to {requested}")]
    ResultTypeMismatch { statement: String, declared: String, requested: String },

    #[error("invalid statement definition: {0}")]
    Builder(String),

    #[error("executor was closed")]
    ExecutorClosed,

    #[error(transparent)]
    Driver(#[from] DriverError),
}

pub type MapperResult<T> = Result<T, MapperError>;

impl MapperError {
    /// Stable snake_case code for logs and assertions.
    pub fn code_str(&self) -> &'static str {
        match self {
            MapperError::ExpressionEvaluation { .. } => "expression_evaluation",
            MapperError::NoTypeHandlerFound { .. } => "no_type_handler",
            MapperError::NullTypeRequired { .. } => "null_type_required",
            MapperError::StatementExecution { .. } => "statement_execution",
            MapperError::CacheKey(_) => "cache_key",
            MapperError::AmbiguousSingleResult { .. } => "ambiguous_single_result",
            MapperError::StatementNotFound(_) => "statement_not_found",
            MapperError::TypeConversion { .. } => "type_conversion",
            MapperError::Property { .. } => "property",
            MapperError::ResultTypeMismatch { .. } => "result_type_mismatch",
            MapperError::Builder(_) => "builder",
            MapperError::ExecutorClosed => "executor_closed",
            MapperError::Driver(_) => "driver",
        }
    }

    pub fn expression<S: Into<String>, M: Into<String>>(expression: S, message: M) -> Self {
        MapperError::ExpressionEvaluation { expression: expression.into(), message: message.into() }
    }
    pub fn property<T: Into<String>, P: Into<String>, M: Into<String>>(type_name: T, property: P, message: M) -> Self {
        MapperError::Property { type_name: type_name.into(), property: property.into(), message: message.into() }
    }
    pub fn conversion(found: &crate::value::Value, target: ValueType) -> Self {
        MapperError::TypeConversion { found: format!("{:?}", found), target }
    }
    pub fn builder<S: Into<String>>(msg: S) -> Self { MapperError::Builder(msg.into()) }
    pub fn execution<S: Into<String>>(statement: S, source: DriverError) -> Self {
        MapperError::StatementExecution { statement: statement.into(), source }
    }

    /// Wraps a driver failure raised while running `statement`; other errors pass through unchanged.
    pub fn within_statement(self, statement: &str) -> Self {
        match self {
            MapperError::Driver(source) => MapperError::execution(statement, source),
            other => other,
        }
    }

    /// Fatal configuration gaps (type resolution) as opposed to per-call data problems.
    pub fn is_configuration_gap(&self) -> bool {
        matches!(self, MapperError::NoTypeHandlerFound { .. } | MapperError::NullTypeRequired { .. } | MapperError::StatementNotFound(_))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
