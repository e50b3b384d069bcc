//! Eviction policy implementations

mod lru;

pub use self::lru::LruPolicy;

use super::traits::EvictionPolicy;
use objacl_core::ObjectIdentity;

/// Keeps every entry
#[derive(Debug, Default)]
pub struct UnboundedPolicy;

impl EvictionPolicy for UnboundedPolicy {
    fn on_access(&self, _key: &ObjectIdentity) {}

    fn on_insert(&self, _key: &ObjectIdentity) {}

    fn on_remove(&self, _key: &ObjectIdentity) {}

    fn next_eviction(&self, _len: usize) -> Option<ObjectIdentity> {
        None
    }

    fn clear(&self) {}

    fn capacity(&self) -> Option<usize> {
        None
    }
}
