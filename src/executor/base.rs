use super::resultset::ResultListHandler;
use super::Executor;
use crate::cache::{Cache, CacheKey, CachedList, PerpetualCache};
use crate::error::{MapperError, MapperResult};
use crate::mapping::{BoundStatement, MappedStatement};
use crate::reflection::ParameterObject;
use crate::session::Configuration;
use crate::transaction::Transaction;
use std::sync::Arc;
use tracing::debug;

/// Executes every statement with a fresh prepared statement and keeps the session-local
/// result cache. Any update, commit, rollback or close empties the local cache.
pub struct SimpleExecutor {
    configuration: Arc<Configuration>,
    transaction: Box<dyn Transaction>,
    local_cache: PerpetualCache,
    closed: bool,
}

impl SimpleExecutor {
    pub fn new(configuration: Arc<Configuration>, transaction: Box<dyn Transaction>) -> Self {
        Self { configuration, transaction, local_cache: PerpetualCache::new("LocalCache"), closed: false }
    }

    pub fn local_cache_size(&self) -> usize { self.local_cache.size() }

    fn ensure_open(&self) -> MapperResult<()> {
        if self.closed { Err(MapperError::ExecutorClosed) } else { Ok(()) }
    }

    fn do_query(&mut self, ms: &MappedStatement, parameter: &dyn ParameterObject, handler: &dyn ResultListHandler, bound: &BoundStatement) -> MapperResult<CachedList> {
        let configuration = self.configuration.clone();
        let sh = configuration.new_statement_handler(ms, bound.clone());
        let conn = self.transaction.connection()?;
        let mut stmt = sh.prepare(conn)?;
        sh.parameterize(&mut *stmt, parameter)?;
        let list = sh.query(&mut *stmt, handler)?;
        stmt.close().map_err(|e| MapperError::execution(ms.id(), e))?;
        Ok(list)
    }

    fn do_update(&mut self, ms: &MappedStatement, parameter: &mut dyn ParameterObject) -> MapperResult<u64> {
        let bound = ms.bound_statement(&*parameter)?;
        let configuration = self.configuration.clone();
        let sh = configuration.new_statement_handler(ms, bound);
        let conn = self.transaction.connection()?;
        let mut stmt = sh.prepare(conn)?;
        sh.parameterize(&mut *stmt, &*parameter)?;
        let rows = sh.update(&mut *stmt, parameter)?;
        stmt.close().map_err(|e| MapperError::execution(ms.id(), e))?;
        Ok(rows)
    }
}

impl Executor for SimpleExecutor {
    fn query_bound(
        &mut self,
        ms: &MappedStatement,
        parameter: &dyn ParameterObject,
        handler: &dyn ResultListHandler,
        bound: &BoundStatement,
        key: Option<&CacheKey>,
    ) -> MapperResult<CachedList> {
        self.ensure_open()?;
        if ms.flush_cache_required() {
            self.clear_local_cache();
        }
        if let Some(k) = key {
            if let Some(hit) = self.local_cache.get_object(k) {
                if handler.accepts(&hit) {
                    debug!(target: "sqlmapper::cache", "{}: local cache hit", ms.id());
                    return Ok(hit);
                }
                debug!(target: "sqlmapper::cache", "{}: local cache entry has another element type; re-running", ms.id());
            }
        }
        let list = self.do_query(ms, parameter, handler, bound)?;
        if let Some(k) = key {
            self.local_cache.put_object(k.clone(), list.clone());
        }
        if !self.configuration.settings().local_cache_enabled {
            self.clear_local_cache();
        }
        Ok(list)
    }

    fn update(&mut self, ms: &MappedStatement, parameter: &mut dyn ParameterObject) -> MapperResult<u64> {
        self.ensure_open()?;
        self.clear_local_cache();
        self.do_update(ms, parameter)
    }

    fn create_cache_key(&self, ms: &MappedStatement, parameter: &dyn ParameterObject, bound: &BoundStatement) -> MapperResult<CacheKey> {
        self.ensure_open()?;
        CacheKey::for_query(ms.id(), &bound.sql, parameter, self.configuration.environment().id())
    }

    fn commit(&mut self, required: bool) -> MapperResult<()> {
        self.ensure_open()?;
        self.clear_local_cache();
        if required {
            self.transaction.commit()?;
        }
        Ok(())
    }

    fn rollback(&mut self, required: bool) -> MapperResult<()> {
        if self.closed { return Ok(()); }
        self.clear_local_cache();
        if required {
            self.transaction.rollback()?;
        }
        Ok(())
    }

    fn close(&mut self, force_rollback: bool) {
        if self.closed { return; }
        if let Err(e) = self.rollback(force_rollback) {
            debug!(target: "sqlmapper::session", "rollback on close failed: {}", e);
        }
        if let Err(e) = self.transaction.close() {
            debug!(target: "sqlmapper::session", "closing transaction failed: {}", e);
        }
        self.closed = true;
    }

    fn clear_local_cache(&mut self) {
        if !self.closed {
            self.local_cache.clear();
        }
    }

    fn is_closed(&self) -> bool { self.closed }
}
