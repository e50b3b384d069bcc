//! Eviction policies for bounding the ACL cache
//!
//! The cache is unbounded unless a capacity is configured, in which case the
//! least recently used ACL is dropped first. Eviction never affects
//! correctness: an evicted ACL is simply reloaded from the store.

mod factory;
mod policies;
mod traits;

pub use factory::create_eviction_policy;
pub use policies::{LruPolicy, UnboundedPolicy};
pub use traits::EvictionPolicy;

#[cfg(test)]
mod tests;
