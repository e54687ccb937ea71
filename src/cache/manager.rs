use super::{Cache, PerpetualCache};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Registry of second-level caches, one per namespace, created on first use.
#[derive(Default)]
pub struct CacheManager {
    caches: RwLock<HashMap<String, Arc<dyn Cache>>>,
}

impl CacheManager {
    pub fn new() -> Self { Self::default() }

    pub fn get_or_create_cache(&self, namespace: &str) -> Arc<dyn Cache> {
        // Fast path read
        if let Some(c) = self.caches.read().get(namespace).cloned() { return c; }
        let mut w = self.caches.write();
        w.entry(namespace.to_string())
            .or_insert_with(|| {
                debug!(target: "sqlmapper::cache", "creating cache for namespace '{}'", namespace);
                Arc::new(PerpetualCache::new(namespace))
            })
            .clone()
    }

    /// Install a custom cache implementation for a namespace.
    pub fn register_cache(&self, cache: Arc<dyn Cache>) {
        self.caches.write().insert(cache.id().to_string(), cache);
    }

    pub fn cache(&self, namespace: &str) -> Option<Arc<dyn Cache>> { self.caches.read().get(namespace).cloned() }

    pub fn clear_cache(&self, namespace: &str) {
        if let Some(c) = self.cache(namespace) { c.clear(); }
    }

    pub fn clear_all_cache(&self) {
        for c in self.caches.read().values() { c.clear(); }
    }

    pub fn cache_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.caches.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;

    #[test]
    fn caches_are_created_once_per_namespace() {
        let m = CacheManager::new();
        let a = m.get_or_create_cache("users");
        let b = m.get_or_create_cache("users");
        assert!(Arc::ptr_eq(&a, &b));
        m.get_or_create_cache("orders");
        assert_eq!(m.cache_ids(), vec!["orders".to_string(), "users".to_string()]);
    }

    #[test]
    fn clear_one_or_all() {
        let m = CacheManager::new();
        let mut k = CacheKey::new();
        k.update_text("q");
        m.get_or_create_cache("a").put_object(k.clone(), Arc::new(vec![1i32]));
        m.get_or_create_cache("b").put_object(k.clone(), Arc::new(vec![1i32]));
        m.clear_cache("a");
        assert_eq!(m.get_or_create_cache("a").size(), 0);
        assert_eq!(m.get_or_create_cache("b").size(), 1);
        m.clear_cache("missing");
        m.clear_all_cache();
        assert_eq!(m.get_or_create_cache("b").size(), 0);
    }
}
