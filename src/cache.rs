//! Result caches: the per-executor local cache and the per-namespace second-level caches.

pub mod key;
pub mod manager;
pub mod perpetual;
pub mod transactional;

pub use key::{CacheKey, CacheKeyPart};
pub use manager::CacheManager;
pub use perpetual::PerpetualCache;
pub use transactional::TransactionalCache;

use std::any::Any;
use std::sync::Arc;

/// A cached query result: the mapped `Vec<T>`, type-erased.
pub type CachedList = Arc<dyn Any + Send + Sync>;

pub trait Cache: Send + Sync {
    fn id(&self) -> &str;
    fn put_object(&self, key: CacheKey, value: CachedList);
    fn get_object(&self, key: &CacheKey) -> Option<CachedList>;
    fn remove_object(&self, key: &CacheKey) -> Option<CachedList>;
    fn clear(&self);
    fn size(&self) -> usize;
}
