//! ACL cache for objacl
//!
//! This crate provides the process-wide, write-through ACL cache:
//! - Concurrent access through a sharded map
//! - Optional capacity bound with LRU eviction
//! - Hit/miss/eviction statistics

pub mod acl_cache;
pub mod eviction;
pub mod stats;

pub use acl_cache::AclCache;
pub use eviction::{create_eviction_policy, EvictionPolicy, LruPolicy, UnboundedPolicy};
pub use stats::{CacheStatistics, CacheStats};
