//! LRU (Least Recently Used) eviction policy implementation

use crate::eviction::traits::EvictionPolicy;
use ::lru::LruCache;
use objacl_core::ObjectIdentity;
use parking_lot::Mutex;

/// LRU (Least Recently Used) eviction policy
pub struct LruPolicy {
    /// Access order tracking, least recent first
    access_order: Mutex<LruCache<ObjectIdentity, ()>>,
    /// Maximum number of entries allowed
    capacity: usize,
}

impl LruPolicy {
    pub fn new(capacity: usize) -> Self {
        Self {
            access_order: Mutex::new(LruCache::unbounded()),
            capacity,
        }
    }
}

impl EvictionPolicy for LruPolicy {
    fn on_access(&self, key: &ObjectIdentity) {
        self.access_order.lock().promote(key);
    }

    fn on_insert(&self, key: &ObjectIdentity) {
        self.access_order.lock().put(key.clone(), ());
    }

    fn on_remove(&self, key: &ObjectIdentity) {
        self.access_order.lock().pop(key);
    }

    fn next_eviction(&self, len: usize) -> Option<ObjectIdentity> {
        if len <= self.capacity {
            return None;
        }

        self.access_order
            .lock()
            .peek_lru()
            .map(|(key, _)| key.clone())
    }

    fn clear(&self) {
        self.access_order.lock().clear();
    }

    fn capacity(&self) -> Option<usize> {
        Some(self.capacity)
    }
}
