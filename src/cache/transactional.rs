use super::{Cache, CacheKey, CachedList};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Per-session overlay on a shared cache. Writes are staged and only reach the shared cache
/// on commit; a clear is deferred the same way.
pub struct TransactionalCache {
    delegate: Arc<dyn Cache>,
    clear_on_commit: bool,
    entries_to_add: HashMap<CacheKey, CachedList>,
}

impl TransactionalCache {
    pub fn new(delegate: Arc<dyn Cache>) -> Self {
        Self { delegate, clear_on_commit: false, entries_to_add: HashMap::new() }
    }

    pub fn id(&self) -> &str { self.delegate.id() }

    /// Staged entries first; after a pending clear the shared cache is treated as empty.
    pub fn get_object(&self, key: &CacheKey) -> Option<CachedList> {
        if let Some(v) = self.entries_to_add.get(key) { return Some(v.clone()); }
        if self.clear_on_commit { return None; }
        self.delegate.get_object(key)
    }

    pub fn put_object(&mut self, key: CacheKey, value: CachedList) { self.entries_to_add.insert(key, value); }

    pub fn clear(&mut self) {
        self.clear_on_commit = true;
        self.entries_to_add.clear();
    }

    pub fn commit(&mut self) {
        if self.clear_on_commit {
            self.delegate.clear();
        }
        let staged = self.entries_to_add.len();
        for (k, v) in self.entries_to_add.drain() {
            self.delegate.put_object(k, v);
        }
        debug!(target: "sqlmapper::cache", "flushed {} entries to cache '{}' (cleared={})", staged, self.delegate.id(), self.clear_on_commit);
        self.reset();
    }

    pub fn rollback(&mut self) { self.reset(); }

    pub fn staged(&self) -> usize { self.entries_to_add.len() }

    fn reset(&mut self) {
        self.clear_on_commit = false;
        self.entries_to_add.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PerpetualCache;

    fn key(s: &str) -> CacheKey {
        let mut k = CacheKey::new();
        k.update_text(s);
        k
    }

    #[test]
    fn writes_are_invisible_to_shared_cache_until_commit() {
        let shared: Arc<dyn Cache> = Arc::new(PerpetualCache::new("ns"));
        let mut tx = TransactionalCache::new(shared.clone());
        tx.put_object(key("a"), Arc::new(vec![1i32]));
        assert!(shared.get_object(&key("a")).is_none());
        assert!(tx.get_object(&key("a")).is_some());
        tx.commit();
        assert!(shared.get_object(&key("a")).is_some());
        assert_eq!(tx.staged(), 0);
    }

    #[test]
    fn rollback_discards_staged_writes() {
        let shared: Arc<dyn Cache> = Arc::new(PerpetualCache::new("ns"));
        let mut tx = TransactionalCache::new(shared.clone());
        tx.put_object(key("a"), Arc::new(vec![1i32]));
        tx.rollback();
        tx.commit();
        assert_eq!(shared.size(), 0);
    }

    #[test]
    fn clear_is_deferred_to_commit() {
        let shared: Arc<dyn Cache> = Arc::new(PerpetualCache::new("ns"));
        shared.put_object(key("old"), Arc::new(vec![0i32]));
        let mut tx = TransactionalCache::new(shared.clone());
        tx.clear();
        assert!(tx.get_object(&key("old")).is_none());
        assert_eq!(shared.size(), 1);
        tx.put_object(key("new"), Arc::new(vec![1i32]));
        tx.commit();
        assert!(shared.get_object(&key("old")).is_none());
        assert!(shared.get_object(&key("new")).is_some());
    }
}
