use super::resultset::ResultListHandler;
use super::Executor;
use crate::cache::{CacheKey, CachedList, TransactionalCache};
use crate::error::{MapperError, MapperResult};
use crate::mapping::{BoundStatement, MappedStatement};
use crate::reflection::ParameterObject;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Decorates another executor with the namespace (second-level) caches. Reads and writes go
/// through a per-session overlay per cache, flushed on commit and discarded on rollback or close.
pub struct CachingExecutor {
    delegate: Box<dyn Executor>,
    overlays: HashMap<String, TransactionalCache>,
}

impl CachingExecutor {
    pub fn new(delegate: Box<dyn Executor>) -> Self { Self { delegate, overlays: HashMap::new() } }

    fn overlay(&mut self, ms: &MappedStatement) -> Option<&mut TransactionalCache> {
        let cache = ms.cache()?;
        Some(
            self.overlays
                .entry(cache.id().to_string())
                .or_insert_with(|| TransactionalCache::new(Arc::clone(cache))),
        )
    }

    fn flush_if_required(&mut self, ms: &MappedStatement) {
        if !ms.flush_cache_required() { return; }
        if let Some(tc) = self.overlay(ms) {
            debug!(target: "sqlmapper::cache", "{}: clearing overlay for cache '{}'", ms.id(), tc.id());
            tc.clear();
        }
    }

    fn commit_overlays(&mut self) {
        for tc in self.overlays.values_mut() { tc.commit(); }
    }

    fn rollback_overlays(&mut self) {
        for tc in self.overlays.values_mut() { tc.rollback(); }
    }
}

impl Executor for CachingExecutor {
    fn query_bound(
        &mut self,
        ms: &MappedStatement,
        parameter: &dyn ParameterObject,
        handler: &dyn ResultListHandler,
        bound: &BoundStatement,
        key: Option<&CacheKey>,
    ) -> MapperResult<CachedList> {
        if self.delegate.is_closed() {
            return Err(MapperError::ExecutorClosed);
        }
        self.flush_if_required(ms);
        let cacheable = ms.is_cache_enabled() && ms.cache().is_some();
        let Some(k) = key.filter(|_| cacheable) else {
            return self.delegate.query_bound(ms, parameter, handler, bound, key);
        };
        if let Some(hit) = self.overlay(ms).and_then(|tc| tc.get_object(k)) {
            if handler.accepts(&hit) {
                debug!(target: "sqlmapper::cache", "{}: second-level cache hit", ms.id());
                return Ok(hit);
            }
        }
        let list = self.delegate.query_bound(ms, parameter, handler, bound, Some(k))?;
        if let Some(tc) = self.overlay(ms) {
            tc.put_object(k.clone(), list.clone());
        }
        Ok(list)
    }

    fn update(&mut self, ms: &MappedStatement, parameter: &mut dyn ParameterObject) -> MapperResult<u64> {
        if self.delegate.is_closed() {
            return Err(MapperError::ExecutorClosed);
        }
        self.flush_if_required(ms);
        self.delegate.update(ms, parameter)
    }

    fn create_cache_key(&self, ms: &MappedStatement, parameter: &dyn ParameterObject, bound: &BoundStatement) -> MapperResult<CacheKey> {
        self.delegate.create_cache_key(ms, parameter, bound)
    }

    fn commit(&mut self, required: bool) -> MapperResult<()> {
        self.delegate.commit(required)?;
        self.commit_overlays();
        Ok(())
    }

    fn rollback(&mut self, required: bool) -> MapperResult<()> {
        let res = self.delegate.rollback(required);
        self.rollback_overlays();
        res
    }

    /// Entries staged since the last commit never reach the shared caches.
    fn close(&mut self, force_rollback: bool) {
        self.rollback_overlays();
        self.overlays.clear();
        self.delegate.close(force_rollback);
    }

    fn clear_local_cache(&mut self) { self.delegate.clear_local_cache(); }

    fn is_closed(&self) -> bool { self.delegate.is_closed() }
}
