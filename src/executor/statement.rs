use super::parameter::DefaultParameterHandler;
use super::resultset::ResultListHandler;
use crate::cache::CachedList;
use crate::driver::{Connection, PreparedStatement, StatementGuard};
use crate::error::{MapperError, MapperResult};
use crate::mapping::{BoundStatement, MappedStatement, SqlCommandType};
use crate::reflection::ParameterObject;
use crate::types::TypeHandlerRegistry;
use tracing::debug;

/// Drives one statement through prepare, parameterize and execute.
pub trait StatementHandler: Send {
    fn statement_id(&self) -> &str;
    fn bound_statement(&self) -> &BoundStatement;
    fn prepare<'c>(&self, conn: &'c mut dyn Connection) -> MapperResult<StatementGuard<'c>>;
    fn parameterize(&self, stmt: &mut dyn PreparedStatement, parameter: &dyn ParameterObject) -> MapperResult<()>;
    fn query(&self, stmt: &mut dyn PreparedStatement, handler: &dyn ResultListHandler) -> MapperResult<CachedList>;
    /// Execute an update and run key generation; returns the affected row count.
    fn update(&self, stmt: &mut dyn PreparedStatement, parameter: &mut dyn ParameterObject) -> MapperResult<u64>;
}

pub struct PreparedStatementHandler<'a> {
    ms: &'a MappedStatement,
    bound: BoundStatement,
    registry: &'a TypeHandlerRegistry,
}

impl<'a> PreparedStatementHandler<'a> {
    pub fn new(ms: &'a MappedStatement, bound: BoundStatement, registry: &'a TypeHandlerRegistry) -> Self {
        Self { ms, bound, registry }
    }

    fn wants_generated_keys(&self) -> bool {
        self.ms.command() == SqlCommandType::Insert && self.ms.use_generated_keys() && self.ms.key_generator().requests_generated_keys()
    }
}

impl StatementHandler for PreparedStatementHandler<'_> {
    fn statement_id(&self) -> &str { self.ms.id() }

    fn bound_statement(&self) -> &BoundStatement { &self.bound }

    fn prepare<'c>(&self, conn: &'c mut dyn Connection) -> MapperResult<StatementGuard<'c>> {
        debug!(target: "sqlmapper::exec", "{}: preparing: {}", self.ms.id(), self.bound.sql);
        let stmt = conn
            .prepare(&self.bound.sql, self.wants_generated_keys())
            .map_err(|e| MapperError::execution(self.ms.id(), e))?;
        Ok(StatementGuard::new(stmt))
    }

    fn parameterize(&self, stmt: &mut dyn PreparedStatement, parameter: &dyn ParameterObject) -> MapperResult<()> {
        DefaultParameterHandler::new(self.registry, &self.bound)
            .set_parameters(stmt, parameter)
            .map_err(|e| e.within_statement(self.ms.id()))
    }

    fn query(&self, stmt: &mut dyn PreparedStatement, handler: &dyn ResultListHandler) -> MapperResult<CachedList> {
        let rs = stmt.execute_query().map_err(|e| MapperError::execution(self.ms.id(), e))?;
        debug!(target: "sqlmapper::exec", "{}: fetched {} rows", self.ms.id(), rs.len());
        handler.handle_result_set(self.ms, rs, self.registry).map_err(|e| e.within_statement(self.ms.id()))
    }

    fn update(&self, stmt: &mut dyn PreparedStatement, parameter: &mut dyn ParameterObject) -> MapperResult<u64> {
        let rows = stmt.execute_update().map_err(|e| MapperError::execution(self.ms.id(), e))?;
        debug!(target: "sqlmapper::exec", "{}: {} rows affected", self.ms.id(), rows);
        self.ms.key_generator().process_after(self.ms, stmt, parameter)?;
        Ok(rows)
    }
}
