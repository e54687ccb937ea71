//! Session surface: the statement registry (`Configuration`), the session factory and
//! `SqlSession`, which routes calls through the executor chain.

use crate::cache::CacheManager;
use crate::driver::DataSource;
use crate::error::{MapperError, MapperResult};
use crate::executor::resultset::{DefaultResultSetHandler, ResultTarget};
use crate::executor::statement::{PreparedStatementHandler, StatementHandler};
use crate::executor::{CachingExecutor, Executor, SimpleExecutor};
use crate::ident::namespace_of;
use crate::mapping::{BoundStatement, MappedStatement, MappedStatementBuilder, SqlCommandType};
use crate::plugin::{Interceptor, InterceptorChain, SqlLogInterceptor};
use crate::reflection::ParameterObject;
use crate::scripting::SqlSource;
use crate::settings::Settings;
use crate::transaction::{JdbcTransaction, Transaction};
use crate::types::TypeHandlerRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// A named data source. The id takes part in every cache key.
#[derive(Clone)]
pub struct Environment {
    id: String,
    data_source: Arc<dyn DataSource>,
}

impl Environment {
    pub fn new<S: Into<String>>(id: S, data_source: Arc<dyn DataSource>) -> Self {
        Self { id: id.into(), data_source }
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn data_source(&self) -> &Arc<dyn DataSource> { &self.data_source }
}

/// Everything fixed at startup: settings, environment, type handlers, caches, statements
/// and interceptors. Read-only once wrapped in an `Arc` by the session factory.
pub struct Configuration {
    settings: Settings,
    environment: Environment,
    type_handler_registry: Arc<TypeHandlerRegistry>,
    cache_manager: CacheManager,
    mapped_statements: HashMap<String, Arc<MappedStatement>>,
    interceptors: InterceptorChain,
}

impl Configuration {
    pub fn new(settings: Settings, environment: Environment) -> Self {
        let mut interceptors = InterceptorChain::new();
        if settings.log_sql {
            interceptors.add(Arc::new(SqlLogInterceptor));
        }
        Self {
            settings,
            environment,
            type_handler_registry: Arc::new(TypeHandlerRegistry::new()),
            cache_manager: CacheManager::new(),
            mapped_statements: HashMap::new(),
            interceptors,
        }
    }

    /// Environment named after `settings.environment_id`.
    pub fn with_data_source(settings: Settings, data_source: Arc<dyn DataSource>) -> Self {
        let env = Environment::new(settings.environment_id.clone(), data_source);
        Self::new(settings, env)
    }

    pub fn settings(&self) -> &Settings { &self.settings }
    pub fn environment(&self) -> &Environment { &self.environment }
    pub fn type_handler_registry(&self) -> &Arc<TypeHandlerRegistry> { &self.type_handler_registry }
    pub fn cache_manager(&self) -> &CacheManager { &self.cache_manager }
    pub fn interceptors(&self) -> &InterceptorChain { &self.interceptors }

    pub fn add_interceptor(&mut self, interceptor: Arc<dyn Interceptor>) { self.interceptors.add(interceptor); }

    /// Start a statement from a template. With second-level caching on, the namespace
    /// cache is attached so selects can use it and other commands can flush it.
    pub fn statement(&self, id: &str, command: SqlCommandType, template: &str) -> MapperResult<MappedStatementBuilder> {
        let source = SqlSource::from_script(template, &self.type_handler_registry)?;
        let mut builder = MappedStatement::builder(id, command, source);
        if self.settings.cache_enabled {
            builder = builder.cache(self.cache_manager.get_or_create_cache(namespace_of(id)));
        }
        Ok(builder)
    }

    pub fn add_mapped_statement(&mut self, ms: MappedStatement) -> MapperResult<()> {
        if self.mapped_statements.contains_key(ms.id()) {
            return Err(MapperError::builder(format!("mapped statement '{}' is already registered", ms.id())));
        }
        debug!(target: "sqlmapper::session", "registered statement {:?}", ms);
        self.mapped_statements.insert(ms.id().to_string(), Arc::new(ms));
        Ok(())
    }

    pub fn mapped_statement(&self, id: &str) -> MapperResult<Arc<MappedStatement>> {
        self.mapped_statements.get(id).cloned().ok_or_else(|| MapperError::StatementNotFound(id.to_string()))
    }

    pub fn has_statement(&self, id: &str) -> bool { self.mapped_statements.contains_key(id) }

    pub fn statement_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.mapped_statements.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn new_executor(self: &Arc<Self>, transaction: Box<dyn Transaction>) -> Box<dyn Executor> {
        let mut executor: Box<dyn Executor> = Box::new(SimpleExecutor::new(Arc::clone(self), transaction));
        if self.settings.cache_enabled {
            executor = Box::new(CachingExecutor::new(executor));
        }
        self.interceptors.plugin_executor(executor)
    }

    pub fn new_statement_handler<'a>(&'a self, ms: &'a MappedStatement, bound: BoundStatement) -> Box<dyn StatementHandler + 'a> {
        let handler: Box<dyn StatementHandler + 'a> = Box::new(PreparedStatementHandler::new(ms, bound, &self.type_handler_registry));
        self.interceptors.plugin_statement_handler(handler)
    }
}

pub struct SqlSessionFactory {
    configuration: Arc<Configuration>,
}

impl SqlSessionFactory {
    pub fn new(configuration: Configuration) -> Self { Self { configuration: Arc::new(configuration) } }

    pub fn configuration(&self) -> &Arc<Configuration> { &self.configuration }

    pub fn open_session(&self) -> SqlSession { self.open_session_with(self.configuration.settings.default_autocommit) }

    pub fn open_session_with(&self, autocommit: bool) -> SqlSession {
        let tx = Box::new(JdbcTransaction::new(self.configuration.environment.data_source.clone(), autocommit));
        let executor = self.configuration.new_executor(tx);
        debug!(target: "sqlmapper::session", "opened session (autocommit={})", autocommit);
        SqlSession { configuration: self.configuration.clone(), executor, autocommit, dirty: false }
    }
}

/// One unit of work. Not shared between threads; closing (or dropping) releases the
/// connection and rolls back uncommitted changes.
pub struct SqlSession {
    configuration: Arc<Configuration>,
    executor: Box<dyn Executor>,
    autocommit: bool,
    dirty: bool,
}

impl SqlSession {
    pub fn configuration(&self) -> &Arc<Configuration> { &self.configuration }

    pub fn select_list<T: ResultTarget>(&mut self, id: &str, parameter: &dyn ParameterObject) -> MapperResult<Arc<Vec<T>>> {
        let ms = self.configuration.mapped_statement(id)?;
        let handler = DefaultResultSetHandler::<T>::new();
        let list = self.executor.query(&ms, parameter, &handler)?;
        list.downcast::<Vec<T>>()
            .map_err(|_| MapperError::builder(format!("statement '{}' produced an unexpected result type", id)))
    }

    /// At most one row; more than one is an error rather than a silent pick.
    pub fn select_one<T: ResultTarget + Clone>(&mut self, id: &str, parameter: &dyn ParameterObject) -> MapperResult<Option<T>> {
        let list = self.select_list::<T>(id, parameter)?;
        match list.len() {
            0 => Ok(None),
            1 => Ok(list.first().cloned()),
            rows => Err(MapperError::AmbiguousSingleResult { statement: id.to_string(), rows }),
        }
    }

    pub fn insert(&mut self, id: &str, parameter: &mut dyn ParameterObject) -> MapperResult<u64> { self.update(id, parameter) }

    pub fn update(&mut self, id: &str, parameter: &mut dyn ParameterObject) -> MapperResult<u64> {
        let ms = self.configuration.mapped_statement(id)?;
        self.dirty = true;
        self.executor.update(&ms, parameter)
    }

    pub fn delete(&mut self, id: &str, parameter: &mut dyn ParameterObject) -> MapperResult<u64> { self.update(id, parameter) }

    pub fn commit(&mut self) -> MapperResult<()> { self.commit_with(false) }
    pub fn commit_force(&mut self) -> MapperResult<()> { self.commit_with(true) }
    pub fn rollback(&mut self) -> MapperResult<()> { self.rollback_with(false) }
    pub fn rollback_force(&mut self) -> MapperResult<()> { self.rollback_with(true) }

    fn commit_with(&mut self, force: bool) -> MapperResult<()> {
        let required = self.commit_or_rollback_required(force);
        self.executor.commit(required)?;
        info!(target: "sqlmapper::session", "commit (transaction committed={})", required);
        self.dirty = false;
        Ok(())
    }

    fn rollback_with(&mut self, force: bool) -> MapperResult<()> {
        let required = self.commit_or_rollback_required(force);
        self.executor.rollback(required)?;
        info!(target: "sqlmapper::session", "rollback (transaction rolled back={})", required);
        self.dirty = false;
        Ok(())
    }

    pub fn close(&mut self) {
        if self.executor.is_closed() { return; }
        let required = self.commit_or_rollback_required(false);
        self.executor.close(required);
        self.dirty = false;
        debug!(target: "sqlmapper::session", "session closed");
    }

    pub fn clear_cache(&mut self) { self.executor.clear_local_cache(); }

    pub fn is_dirty(&self) -> bool { self.dirty }

    pub fn is_closed(&self) -> bool { self.executor.is_closed() }

    fn commit_or_rollback_required(&self, force: bool) -> bool { (!self.autocommit && self.dirty) || force }
}

impl Drop for SqlSession {
    fn drop(&mut self) { self.close(); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::memory::{ColumnSpec, MemoryDatabase};
    use crate::mapping::ResultDescriptor;
    use crate::value::{JdbcType, ValueType};

    fn configuration(settings: Settings) -> (MemoryDatabase, Configuration) {
        let db = MemoryDatabase::new();
        db.create_table("items", vec![ColumnSpec::new("id", JdbcType::BigInt), ColumnSpec::new("label", JdbcType::Varchar)]).unwrap();
        let cfg = Configuration::with_data_source(settings, Arc::new(db.clone()));
        (db, cfg)
    }

    #[test]
    fn statements_get_the_namespace_cache_only_when_enabled() {
        let (_db, cfg) = configuration(Settings::default());
        let ms = cfg.statement("items.all", SqlCommandType::Select, "SELECT * FROM items").unwrap()
            .result_type(ResultDescriptor::Scalar(ValueType::Long)).build().unwrap();
        assert_eq!(ms.cache().map(|c| c.id().to_string()), Some("items".to_string()));

        let (_db, cfg) = configuration(Settings { cache_enabled: false, ..Settings::default() });
        let ms = cfg.statement("items.all", SqlCommandType::Select, "SELECT * FROM items").unwrap()
            .result_type(ResultDescriptor::Scalar(ValueType::Long)).build().unwrap();
        assert!(ms.cache().is_none());
    }

    #[test]
    fn duplicate_and_unknown_statements() {
        let (_db, mut cfg) = configuration(Settings::default());
        let del = || cfg.statement("items.clear", SqlCommandType::Delete, "DELETE FROM items").unwrap().build().unwrap();
        let (a, b) = (del(), del());
        cfg.add_mapped_statement(a).unwrap();
        assert_eq!(cfg.add_mapped_statement(b).unwrap_err().code_str(), "builder");
        assert!(cfg.has_statement("items.clear"));
        assert_eq!(cfg.statement_ids(), vec!["items.clear".to_string()]);
        assert_eq!(cfg.mapped_statement("items.nope").unwrap_err().code_str(), "statement_not_found");
    }

    #[test]
    fn log_sql_installs_the_logging_interceptor() {
        let (_db, cfg) = configuration(Settings { log_sql: true, ..Settings::default() });
        assert_eq!(cfg.interceptors().names(), vec!["sql-log".to_string()]);
    }

    #[test]
    fn dirty_flag_tracks_writes_until_commit() {
        let (db, mut cfg) = configuration(Settings::default());
        let ins = cfg.statement("items.add", SqlCommandType::Insert, "INSERT INTO items (id, label) VALUES (#{id}, #{label})").unwrap().build().unwrap();
        cfg.add_mapped_statement(ins).unwrap();
        let factory = SqlSessionFactory::new(cfg);
        let mut session = factory.open_session();
        assert!(!session.is_dirty());
        let mut row = crate::reflection::Record::new().with("id", 1i64).with("label", "a");
        assert_eq!(session.insert("items.add", &mut row).unwrap(), 1);
        assert!(session.is_dirty());
        assert_eq!(db.row_count("items"), 0);
        session.commit().unwrap();
        assert!(!session.is_dirty());
        assert_eq!(db.row_count("items"), 1);
        session.close();
        assert!(session.is_closed());
    }
}
