use super::{Cache, CacheKey, CachedList};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Unbounded map-backed cache.
pub struct PerpetualCache {
    id: String,
    entries: RwLock<HashMap<CacheKey, CachedList>>,
}

impl PerpetualCache {
    pub fn new<S: Into<String>>(id: S) -> Self { Self { id: id.into(), entries: RwLock::new(HashMap::new()) } }
}

impl Cache for PerpetualCache {
    fn id(&self) -> &str { &self.id }
    fn put_object(&self, key: CacheKey, value: CachedList) { self.entries.write().insert(key, value); }
    fn get_object(&self, key: &CacheKey) -> Option<CachedList> { self.entries.read().get(key).cloned() }
    fn remove_object(&self, key: &CacheKey) -> Option<CachedList> { self.entries.write().remove(key) }
    fn clear(&self) { self.entries.write().clear(); }
    fn size(&self) -> usize { self.entries.read().len() }
}

impl std::fmt::Debug for PerpetualCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerpetualCache").field("id", &self.id).field("size", &self.size()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn key(s: &str) -> CacheKey {
        let mut k = CacheKey::new();
        k.update_text(s);
        k
    }

    #[test]
    fn put_get_remove_clear() {
        let c = PerpetualCache::new("ns");
        c.put_object(key("a"), Arc::new(vec![1i64, 2]));
        c.put_object(key("b"), Arc::new(vec![3i64]));
        assert_eq!(c.size(), 2);
        let hit = c.get_object(&key("a")).unwrap();
        assert_eq!(hit.downcast_ref::<Vec<i64>>(), Some(&vec![1, 2]));
        assert!(c.remove_object(&key("b")).is_some());
        assert!(c.get_object(&key("b")).is_none());
        c.clear();
        assert_eq!(c.size(), 0);
    }
}
