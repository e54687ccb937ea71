//! Executors: the base executor (local cache plus statement execution) and the caching
//! decorator for second-level caches.

pub mod base;
pub mod caching;
pub mod keygen;
pub mod parameter;
pub mod resultset;
pub mod statement;

pub use base::SimpleExecutor;
pub use caching::CachingExecutor;

use crate::cache::{CacheKey, CachedList};
use crate::error::{MapperError, MapperResult};
use crate::mapping::{BoundStatement, MappedStatement};
use crate::reflection::ParameterObject;
use resultset::ResultListHandler;
use tracing::debug;

pub trait Executor: Send {
    /// Render, key and run a query. A parameter that cannot be keyed bypasses caching.
    fn query(&mut self, ms: &MappedStatement, parameter: &dyn ParameterObject, handler: &dyn ResultListHandler) -> MapperResult<CachedList> {
        let bound = ms.bound_statement(parameter)?;
        let key = match self.create_cache_key(ms, parameter, &bound) {
            Ok(k) => Some(k),
            Err(MapperError::CacheKey(msg)) => {
                debug!(target: "sqlmapper::cache", "{}: caching bypassed: {}", ms.id(), msg);
                None
            }
            Err(e) => return Err(e),
        };
        self.query_bound(ms, parameter, handler, &bound, key.as_ref())
    }

    fn query_bound(
        &mut self,
        ms: &MappedStatement,
        parameter: &dyn ParameterObject,
        handler: &dyn ResultListHandler,
        bound: &BoundStatement,
        key: Option<&CacheKey>,
    ) -> MapperResult<CachedList>;

    fn update(&mut self, ms: &MappedStatement, parameter: &mut dyn ParameterObject) -> MapperResult<u64>;

    fn create_cache_key(&self, ms: &MappedStatement, parameter: &dyn ParameterObject, bound: &BoundStatement) -> MapperResult<CacheKey>;

    fn commit(&mut self, required: bool) -> MapperResult<()>;

    fn rollback(&mut self, required: bool) -> MapperResult<()>;

    /// Release the transaction; failures are logged, never raised.
    fn close(&mut self, force_rollback: bool);

    fn clear_local_cache(&mut self);

    fn is_closed(&self) -> bool;
}
