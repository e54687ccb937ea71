//! Dynamic SQL: template markup, node tree, expression evaluation and SQL sources.

pub mod builder;
pub mod context;
pub mod expr;
pub mod node;
pub mod source;
pub mod tokens;

pub use builder::ScriptBuilder;
pub use context::DynamicContext;
pub use node::SqlNode;
pub use source::{DynamicSqlSource, SqlSource, StaticSqlSource};
