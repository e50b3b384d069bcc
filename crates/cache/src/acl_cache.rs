//! Process-wide ACL cache
//!
//! Lifecycle: populated lazily by the lookup strategy, refreshed or
//! invalidated by the mutable ACL service after each successful store write,
//! never expired by time. The store stays authoritative; `put` is
//! last-writer-wins.
//!
//! Writes and evictions stamp the identity with a fresh generation. A reader
//! that loaded a row from the store fills the cache through
//! `put_if_unchanged` with the generation it saw before the load, so a row
//! read before a concurrent write can never replace the newer entry.

use crate::eviction::{create_eviction_policy, EvictionPolicy};
use crate::stats::{CacheStatistics, CacheStats};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use objacl_core::{Acl, AclConfig, ObjectIdentity};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Concurrent map from object identity to ACL
#[derive(Clone)]
pub struct AclCache {
    inner: Arc<AclCacheInner>,
}

struct AclCacheInner {
    entries: DashMap<ObjectIdentity, Arc<Acl>>,
    /// Generation of the last write or eviction per identity
    written: DashMap<ObjectIdentity, u64>,
    /// Upper bound of the generations dropped from `written`
    floor: AtomicU64,
    generation: AtomicU64,
    eviction_policy: Box<dyn EvictionPolicy>,
    stats: CacheStats,
}

impl AclCache {
    /// Unbounded cache
    pub fn new() -> Self {
        Self::with_policy(create_eviction_policy(None))
    }

    /// Cache holding at most `capacity` ACLs, least recently used evicted first
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_policy(create_eviction_policy(Some(capacity.max(1))))
    }

    pub fn from_config(config: &AclConfig) -> Self {
        match config.cache_capacity {
            Some(capacity) => Self::with_capacity(capacity),
            None => Self::new(),
        }
    }

    pub fn with_policy(eviction_policy: Box<dyn EvictionPolicy>) -> Self {
        Self {
            inner: Arc::new(AclCacheInner {
                entries: DashMap::new(),
                written: DashMap::new(),
                floor: AtomicU64::new(0),
                generation: AtomicU64::new(0),
                eviction_policy,
                stats: CacheStats::default(),
            }),
        }
    }

    pub fn get(&self, object_identity: &ObjectIdentity) -> Option<Arc<Acl>> {
        let found = self
            .inner
            .entries
            .get(object_identity)
            .map(|entry| Arc::clone(entry.value()));

        match &found {
            Some(_) => {
                self.inner.stats.record_hit();
                self.inner.eviction_policy.on_access(object_identity);
                trace!(%object_identity, "ACL cache hit");
            }
            None => {
                self.inner.stats.record_miss();
                trace!(%object_identity, "ACL cache miss");
            }
        }
        found
    }

    /// Current cache generation. Record it before loading rows from the
    /// store and hand it to `put_if_unchanged` afterwards.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    fn next_generation(&self) -> u64 {
        self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Insert or replace the entry for the ACL's object identity
    pub fn put(&self, acl: impl Into<Arc<Acl>>) {
        let acl = acl.into();
        let key = acl.object_identity().clone();
        {
            let mut written = self.inner.written.entry(key.clone()).or_insert(0);
            *written = self.next_generation();
            self.insert_entry(key, acl);
        }
        self.enforce_capacity();
    }

    /// Insert `acl` only if its identity has not been written or evicted
    /// since generation `seen`. Returns whether the entry was stored.
    pub fn put_if_unchanged(&self, acl: impl Into<Arc<Acl>>, seen: u64) -> bool {
        let acl = acl.into();
        let key = acl.object_identity().clone();
        {
            let written = self.inner.written.entry(key.clone());
            let last = match &written {
                Entry::Occupied(entry) => *entry.get(),
                Entry::Vacant(_) => self.inner.floor.load(Ordering::SeqCst),
            };
            if last > seen {
                trace!(object_identity = %key, last, seen, "skipped stale ACL fill");
                return false;
            }
            self.insert_entry(key, acl);
        }
        self.enforce_capacity();
        true
    }

    fn insert_entry(&self, key: ObjectIdentity, acl: Arc<Acl>) {
        self.inner.entries.insert(key.clone(), acl);
        self.inner.eviction_policy.on_insert(&key);
        self.inner.stats.record_put();
    }

    fn enforce_capacity(&self) {
        while let Some(victim) = self
            .inner
            .eviction_policy
            .next_eviction(self.inner.entries.len())
        {
            self.inner.entries.remove(&victim);
            self.inner.eviction_policy.on_remove(&victim);
            self.inner.stats.record_eviction();
            trace!(object_identity = %victim, "ACL evicted by capacity bound");
        }
    }

    /// Remove one entry, returning whether it was present
    pub fn evict(&self, object_identity: &ObjectIdentity) -> bool {
        let written = self.inner.written.entry(object_identity.clone());
        // The identity's generation is folded into the floor so `written`
        // does not keep a slot for every identity ever seen
        self.inner.floor.fetch_max(self.next_generation(), Ordering::SeqCst);
        if let Entry::Occupied(entry) = written {
            entry.remove();
        }

        let removed = self.inner.entries.remove(object_identity).is_some();
        self.inner.eviction_policy.on_remove(object_identity);
        if removed {
            self.inner.stats.record_invalidation();
        }
        removed
    }

    pub fn evict_all(&self) {
        let mut keys: HashSet<ObjectIdentity> = self
            .inner
            .entries
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        keys.extend(self.inner.written.iter().map(|entry| entry.key().clone()));
        for key in &keys {
            self.evict(key);
        }
    }

    pub fn contains(&self, object_identity: &ObjectIdentity) -> bool {
        self.inner.entries.contains_key(object_identity)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Cached ACLs whose parent is `object_identity`
    pub fn children_of(&self, object_identity: &ObjectIdentity) -> Vec<ObjectIdentity> {
        self.inner
            .entries
            .iter()
            .filter(|entry| entry.value().parent() == Some(object_identity))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Every cached ACL below `object_identity`, nearest first
    pub fn descendants_of(&self, object_identity: &ObjectIdentity) -> Vec<ObjectIdentity> {
        let mut seen = HashSet::from([object_identity.clone()]);
        let mut queue = VecDeque::from([object_identity.clone()]);
        let mut descendants = Vec::new();

        while let Some(current) = queue.pop_front() {
            for child in self.children_of(&current) {
                if seen.insert(child.clone()) {
                    queue.push_back(child.clone());
                    descendants.push(child);
                }
            }
        }
        descendants
    }

    pub fn statistics(&self) -> CacheStatistics {
        self.inner.stats.snapshot(
            self.inner.entries.len(),
            self.inner.eviction_policy.capacity(),
        )
    }
}

impl Default for AclCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AclCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AclCache")
            .field("entry_count", &self.inner.entries.len())
            .field("capacity", &self.inner.eviction_policy.capacity())
            .finish()
    }
}
