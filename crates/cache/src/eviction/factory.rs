//! Factory for creating eviction policies

use super::policies::{LruPolicy, UnboundedPolicy};
use super::traits::EvictionPolicy;

/// LRU policy when a capacity is given, otherwise no eviction
pub fn create_eviction_policy(capacity: Option<usize>) -> Box<dyn EvictionPolicy> {
    match capacity {
        Some(capacity) => Box::new(LruPolicy::new(capacity)),
        None => Box::new(UnboundedPolicy),
    }
}
