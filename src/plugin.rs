//! Interceptor chain. Interceptors are registered on the `Configuration` during setup and
//! wrap each executor and statement handler once, in registration order, when it is built.

use crate::cache::CachedList;
use crate::driver::{Connection, PreparedStatement, StatementGuard};
use crate::error::MapperResult;
use crate::executor::resultset::ResultListHandler;
use crate::executor::statement::StatementHandler;
use crate::executor::Executor;
use crate::mapping::BoundStatement;
use crate::reflection::ParameterObject;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

pub trait Interceptor: Send + Sync {
    fn name(&self) -> &str;

    fn plugin_executor(&self, executor: Box<dyn Executor>) -> Box<dyn Executor> { executor }

    fn plugin_statement_handler<'a>(&self, handler: Box<dyn StatementHandler + 'a>) -> Box<dyn StatementHandler + 'a> { handler }
}

#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self { Self::default() }

    pub fn add(&mut self, interceptor: Arc<dyn Interceptor>) { self.interceptors.push(interceptor); }

    pub fn len(&self) -> usize { self.interceptors.len() }
    pub fn is_empty(&self) -> bool { self.interceptors.is_empty() }

    pub fn names(&self) -> Vec<String> { self.interceptors.iter().map(|i| i.name().to_string()).collect() }

    /// The last registered interceptor ends up outermost.
    pub fn plugin_executor(&self, executor: Box<dyn Executor>) -> Box<dyn Executor> {
        self.interceptors.iter().fold(executor, |acc, i| i.plugin_executor(acc))
    }

    pub fn plugin_statement_handler<'a>(&self, handler: Box<dyn StatementHandler + 'a>) -> Box<dyn StatementHandler + 'a> {
        self.interceptors.iter().fold(handler, |acc, i| i.plugin_statement_handler(acc))
    }
}

/// Logs every statement's SQL, parameters and elapsed time on target `sqlmapper::sql`.
/// Installed by `Settings::log_sql`.
#[derive(Debug, Default)]
pub struct SqlLogInterceptor;

impl Interceptor for SqlLogInterceptor {
    fn name(&self) -> &str { "sql-log" }

    fn plugin_statement_handler<'a>(&self, handler: Box<dyn StatementHandler + 'a>) -> Box<dyn StatementHandler + 'a> {
        Box::new(LoggingStatementHandler { inner: handler })
    }
}

struct LoggingStatementHandler<'a> {
    inner: Box<dyn StatementHandler + 'a>,
}

impl StatementHandler for LoggingStatementHandler<'_> {
    fn statement_id(&self) -> &str { self.inner.statement_id() }

    fn bound_statement(&self) -> &BoundStatement { self.inner.bound_statement() }

    fn prepare<'c>(&self, conn: &'c mut dyn Connection) -> MapperResult<StatementGuard<'c>> { self.inner.prepare(conn) }

    fn parameterize(&self, stmt: &mut dyn PreparedStatement, parameter: &dyn ParameterObject) -> MapperResult<()> {
        info!(target: "sqlmapper::sql", "{} | {} | params: {}", self.statement_id(), self.bound_statement().sql, parameter.describe());
        self.inner.parameterize(stmt, parameter)
    }

    fn query(&self, stmt: &mut dyn PreparedStatement, handler: &dyn ResultListHandler) -> MapperResult<CachedList> {
        let started = Instant::now();
        let res = self.inner.query(stmt, handler);
        info!(target: "sqlmapper::sql", "{} | query finished in {:?} (ok={})", self.statement_id(), started.elapsed(), res.is_ok());
        res
    }

    fn update(&self, stmt: &mut dyn PreparedStatement, parameter: &mut dyn ParameterObject) -> MapperResult<u64> {
        let started = Instant::now();
        let res = self.inner.update(stmt, parameter);
        match &res {
            Ok(rows) => info!(target: "sqlmapper::sql", "{} | {} rows in {:?}", self.statement_id(), rows, started.elapsed()),
            Err(e) => info!(target: "sqlmapper::sql", "{} | failed after {:?}: {}", self.statement_id(), started.elapsed(), e),
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::statement::PreparedStatementHandler;
    use crate::mapping::{MappedStatement, SqlCommandType};
    use crate::scripting::SqlSource;
    use crate::types::TypeHandlerRegistry;
    use parking_lot::Mutex;

    struct Tagging {
        tag: &'static str,
        seen: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Interceptor for Tagging {
        fn name(&self) -> &str { self.tag }

        fn plugin_statement_handler<'a>(&self, handler: Box<dyn StatementHandler + 'a>) -> Box<dyn StatementHandler + 'a> {
            self.seen.lock().push(self.tag);
            handler
        }
    }

    #[test]
    fn interceptors_apply_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut chain = InterceptorChain::new();
        chain.add(Arc::new(Tagging { tag: "first", seen: seen.clone() }));
        chain.add(Arc::new(Tagging { tag: "second", seen: seen.clone() }));
        chain.add(Arc::new(SqlLogInterceptor));
        assert_eq!(chain.names(), vec!["first", "second", "sql-log"]);

        let registry = Arc::new(TypeHandlerRegistry::new());
        let ms = MappedStatement::builder("t.del", SqlCommandType::Delete, SqlSource::from_script("DELETE FROM t", &registry).unwrap())
            .build()
            .unwrap();
        let bound = ms.bound_statement(&()).unwrap();
        let handler = chain.plugin_statement_handler(Box::new(PreparedStatementHandler::new(&ms, bound, &registry)));
        assert_eq!(handler.statement_id(), "t.del");
        assert_eq!(handler.bound_statement().sql, "DELETE FROM t");
        assert_eq!(*seen.lock(), vec!["first", "second"]);
    }
}
