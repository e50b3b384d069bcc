//! Batch resolution of ACL chains
//!
//! Identities whose whole ancestor chain is cached never reach the store.
//! Everything else is loaded in batches, then missing ancestors are fetched
//! with follow-up queries until every chain closes. Chains are assembled
//! bottom-up from the loaded set, so ACLs shared by several requested
//! objects (a common parent) are resolved once per call. Loaded rows only
//! enter the cache when no write touched their identity during the load.

use crate::deadline;
use async_trait::async_trait;
use objacl_cache::AclCache;
use objacl_core::{Acl, AclConfig, Error, ObjectIdentity, Result, Sid};
use objacl_store::AclStore;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// An ACL together with its resolved parent chain
#[derive(Debug, Clone)]
pub struct ResolvedAcl {
    acl: Arc<Acl>,
    parent: Option<Arc<ResolvedAcl>>,
}

impl ResolvedAcl {
    pub fn new(acl: Arc<Acl>, parent: Option<Arc<ResolvedAcl>>) -> Self {
        Self { acl, parent }
    }

    pub fn acl(&self) -> &Arc<Acl> {
        &self.acl
    }

    pub fn object_identity(&self) -> &ObjectIdentity {
        self.acl.object_identity()
    }

    /// The resolved parent, absent when the ACL has no parent or the parent
    /// row is missing
    pub fn parent(&self) -> Option<&Arc<ResolvedAcl>> {
        self.parent.as_ref()
    }

    /// This ACL followed by its ancestors, nearest first
    pub fn chain(&self) -> impl Iterator<Item = &Acl> {
        std::iter::successors(Some(self), |level| {
            let level: &ResolvedAcl = *level;
            level.parent.as_deref()
        })
        .map(|level| level.acl.as_ref())
    }
}

/// Outcome of looking up one object identity
#[derive(Debug, Clone)]
pub enum AclLookup {
    Found(Arc<ResolvedAcl>),
    /// No ACL row exists, which is different from an ACL with no entries
    NotFound,
}

impl AclLookup {
    pub fn is_found(&self) -> bool {
        matches!(self, AclLookup::Found(_))
    }

    pub fn found(self) -> Option<Arc<ResolvedAcl>> {
        match self {
            AclLookup::Found(resolved) => Some(resolved),
            AclLookup::NotFound => None,
        }
    }
}

/// Resolves ACL chains for many object identities at once
#[async_trait]
pub trait LookupStrategy: Send + Sync {
    /// Resolve every identity in `object_identities`. `sids` lets a strategy
    /// load only the entries relevant to those SIDs; strategies that always
    /// load full ACLs may ignore it.
    async fn read_acls_by_id(
        &self,
        object_identities: &[ObjectIdentity],
        sids: &[Sid],
    ) -> Result<HashMap<ObjectIdentity, AclLookup>>;

    /// Resolve a single identity, failing with `NotFound` when it has no ACL
    async fn read_acl_by_id(
        &self,
        object_identity: &ObjectIdentity,
        sids: &[Sid],
    ) -> Result<Arc<ResolvedAcl>> {
        let mut found = self
            .read_acls_by_id(std::slice::from_ref(object_identity), sids)
            .await?;
        found
            .remove(object_identity)
            .and_then(AclLookup::found)
            .ok_or_else(|| Error::not_found(object_identity))
    }
}

/// Cache-first lookup that batches store queries
pub struct BasicLookupStrategy {
    store: Arc<dyn AclStore>,
    cache: AclCache,
    batch_size: usize,
    timeout: Duration,
}

impl BasicLookupStrategy {
    pub fn new(store: Arc<dyn AclStore>, cache: AclCache, config: &AclConfig) -> Self {
        Self {
            store,
            cache,
            batch_size: config.lookup_batch_size.max(1),
            timeout: config.lookup_timeout,
        }
    }

    /// Copy `object_identity` and its ancestors from the cache into
    /// `available`. Returns false when some link of the chain is not cached.
    fn collect_cached_chain(
        &self,
        object_identity: &ObjectIdentity,
        available: &mut HashMap<ObjectIdentity, Arc<Acl>>,
    ) -> bool {
        let mut visited = HashSet::new();
        let mut current = object_identity.clone();
        loop {
            if !visited.insert(current.clone()) {
                // Cycle; let assembly report it
                return true;
            }
            let acl = match available.get(&current) {
                Some(acl) => Arc::clone(acl),
                None => match self.cache.get(&current) {
                    Some(acl) => {
                        available.insert(current.clone(), Arc::clone(&acl));
                        acl
                    }
                    None => return false,
                },
            };
            match acl.parent() {
                Some(parent) => current = parent.clone(),
                None => return true,
            }
        }
    }

    async fn load_batch(
        &self,
        batch: &[ObjectIdentity],
        available: &mut HashMap<ObjectIdentity, Arc<Acl>>,
    ) -> Result<()> {
        let mut requested: HashSet<ObjectIdentity> = batch.iter().cloned().collect();
        self.query(batch, available).await?;

        loop {
            let missing: HashSet<ObjectIdentity> = available
                .values()
                .filter_map(|acl| acl.parent())
                .filter(|parent| !available.contains_key(*parent) && !requested.contains(*parent))
                .cloned()
                .collect();
            if missing.is_empty() {
                return Ok(());
            }

            let mut wanted = Vec::new();
            for parent in missing {
                match self.cache.get(&parent) {
                    Some(acl) => {
                        available.insert(parent, acl);
                    }
                    None => wanted.push(parent),
                }
            }
            if wanted.is_empty() {
                continue;
            }

            debug!(count = wanted.len(), "loading missing ancestor ACLs");
            requested.extend(wanted.iter().cloned());
            for chunk in wanted.chunks(self.batch_size) {
                self.query(chunk, available).await?;
            }
        }
    }

    async fn query(
        &self,
        object_identities: &[ObjectIdentity],
        available: &mut HashMap<ObjectIdentity, Arc<Acl>>,
    ) -> Result<()> {
        let seen = self.cache.generation();
        let rows = deadline::within(
            "load_acl_rows",
            self.timeout,
            self.store.load_acl_rows(object_identities),
        )
        .await?;

        debug!(
            requested = object_identities.len(),
            returned = rows.len(),
            "ACL batch loaded"
        );
        for row in rows {
            let acl = Arc::new(row.into_acl());
            self.cache.put_if_unchanged(Arc::clone(&acl), seen);
            available.insert(acl.object_identity().clone(), acl);
        }
        Ok(())
    }
}

#[async_trait]
impl LookupStrategy for BasicLookupStrategy {
    async fn read_acls_by_id(
        &self,
        object_identities: &[ObjectIdentity],
        _sids: &[Sid],
    ) -> Result<HashMap<ObjectIdentity, AclLookup>> {
        let mut unique = Vec::new();
        let mut seen = HashSet::new();
        for object_identity in object_identities {
            if seen.insert(object_identity) {
                unique.push(object_identity.clone());
            }
        }

        let mut available = HashMap::new();
        let to_load: Vec<ObjectIdentity> = unique
            .iter()
            .filter(|object_identity| !self.collect_cached_chain(object_identity, &mut available))
            .cloned()
            .collect();

        debug!(
            requested = unique.len(),
            cached = unique.len() - to_load.len(),
            "resolving ACLs"
        );
        for batch in to_load.chunks(self.batch_size) {
            self.load_batch(batch, &mut available).await?;
        }

        let mut assembled = HashMap::new();
        let mut result = HashMap::with_capacity(unique.len());
        for object_identity in unique {
            let lookup = if available.contains_key(&object_identity) {
                AclLookup::Found(assemble(&object_identity, &available, &mut assembled)?)
            } else {
                AclLookup::NotFound
            };
            result.insert(object_identity, lookup);
        }
        Ok(result)
    }
}

/// Build the resolved chain for `object_identity`, reusing chains already
/// assembled during this call.
fn assemble(
    object_identity: &ObjectIdentity,
    available: &HashMap<ObjectIdentity, Arc<Acl>>,
    assembled: &mut HashMap<ObjectIdentity, Arc<ResolvedAcl>>,
) -> Result<Arc<ResolvedAcl>> {
    let mut path: Vec<Arc<Acl>> = Vec::new();
    let mut visited = HashSet::new();
    let mut base = None;
    let mut current = Some(object_identity.clone());

    while let Some(id) = current {
        if let Some(done) = assembled.get(&id) {
            base = Some(Arc::clone(done));
            break;
        }
        if !visited.insert(id.clone()) {
            let mut chain: Vec<String> = path
                .iter()
                .map(|acl| acl.object_identity().to_string())
                .collect();
            chain.push(id.to_string());
            return Err(Error::cycle_detected(object_identity, chain));
        }
        match available.get(&id) {
            Some(acl) => {
                current = acl.parent().cloned();
                path.push(Arc::clone(acl));
            }
            None => {
                warn!(
                    object_identity = %object_identity,
                    missing_parent = %id,
                    "parent ACL not found, chain ends here"
                );
                current = None;
            }
        }
    }

    let mut parent = base;
    for acl in path.into_iter().rev() {
        let resolved = Arc::new(ResolvedAcl::new(Arc::clone(&acl), parent));
        assembled.insert(acl.object_identity().clone(), Arc::clone(&resolved));
        parent = Some(resolved);
    }
    parent.ok_or_else(|| Error::not_found(object_identity))
}
