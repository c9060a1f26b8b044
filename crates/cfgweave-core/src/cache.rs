//! Thread-safe, cost-bounded cache of `scope::path -> Node` lookups.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

use crate::node::Node;

const DEFAULT_CAPACITY: usize = 512;

/// A bounded cache keyed by `scope::path`. Composite hits are shallow-copied
/// before being returned so a caller mutating the result cannot corrupt a
/// future hit on the same key.
pub struct PathCache {
    inner: Mutex<LruCache<String, Node>>,
}

impl PathCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &str) -> Option<Node> {
        let mut guard = self.inner.lock();
        guard.get(key).cloned()
    }

    pub fn insert(&self, key: String, value: Node) {
        let mut guard = self.inner.lock();
        guard.put(key, value);
    }
}

impl Default for PathCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
