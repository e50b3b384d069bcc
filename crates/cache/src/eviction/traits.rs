//! Core eviction policy trait definition

use objacl_core::ObjectIdentity;

/// Eviction policy trait
pub trait EvictionPolicy: Send + Sync {
    /// Record access to a key
    fn on_access(&self, key: &ObjectIdentity);

    /// Record insertion of a key
    fn on_insert(&self, key: &ObjectIdentity);

    /// Record removal of a key
    fn on_remove(&self, key: &ObjectIdentity);

    /// Next key to evict while the cache holds `len` entries
    fn next_eviction(&self, len: usize) -> Option<ObjectIdentity>;

    /// Clear all tracking data
    fn clear(&self);

    /// Configured bound, if any
    fn capacity(&self) -> Option<usize>;
}
