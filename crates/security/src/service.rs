//! ACL creation, mutation and deletion
//!
//! Every mutation runs under an async mutex keyed by object identity, writes
//! the store first and only then refreshes the cache. When a store write
//! fails the cache entry is evicted so the next lookup reloads the
//! authoritative row. Parent changes and deletions additionally hold a
//! hierarchy lock so two concurrent re-parentings cannot close a cycle
//! between them.

use crate::authorization::{AclAuthorizationStrategy, ChangeType};
use crate::deadline;
use crate::lookup::{AclLookup, LookupStrategy, ResolvedAcl};
use dashmap::DashMap;
use objacl_cache::AclCache;
use objacl_core::{Acl, Caller, Error, ObjectIdentity, Permission, Result, Sid};
use objacl_store::{AclRow, AclStore};
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// CRUD facade over the store and cache
pub struct MutableAclService {
    store: Arc<dyn AclStore>,
    cache: AclCache,
    lookup: Arc<dyn LookupStrategy>,
    authorization: Arc<dyn AclAuthorizationStrategy>,
    store_timeout: Duration,
    locks: DashMap<ObjectIdentity, Arc<Mutex<()>>>,
    hierarchy: Mutex<()>,
}

impl MutableAclService {
    pub fn new(
        store: Arc<dyn AclStore>,
        cache: AclCache,
        lookup: Arc<dyn LookupStrategy>,
        authorization: Arc<dyn AclAuthorizationStrategy>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            lookup,
            authorization,
            store_timeout,
            locks: DashMap::new(),
            hierarchy: Mutex::new(()),
        }
    }

    pub async fn read_acl_by_id(
        &self,
        object_identity: &ObjectIdentity,
    ) -> Result<Arc<ResolvedAcl>> {
        self.lookup.read_acl_by_id(object_identity, &[]).await
    }

    pub async fn read_acls_by_id(
        &self,
        object_identities: &[ObjectIdentity],
    ) -> Result<HashMap<ObjectIdentity, AclLookup>> {
        self.lookup.read_acls_by_id(object_identities, &[]).await
    }

    /// Direct children of `object_identity`, as recorded in the store
    pub async fn find_children(
        &self,
        object_identity: &ObjectIdentity,
    ) -> Result<Vec<ObjectIdentity>> {
        deadline::within(
            "find_children",
            self.store_timeout,
            self.store.find_children(object_identity),
        )
        .await
    }

    /// Create an empty, inheriting ACL owned by the caller
    pub async fn create_acl(
        &self,
        caller: &Caller,
        object_identity: &ObjectIdentity,
    ) -> Result<Arc<Acl>> {
        let lock = self.lock_for(object_identity);
        let _guard = lock.lock().await;

        if self.cache.contains(object_identity) {
            return Err(Error::already_exists(object_identity));
        }

        let acl = Acl::new(object_identity.clone(), caller.principal_sid());
        self.write(
            "insert_acl",
            object_identity,
            self.store.insert_acl(AclRow::from(&acl)),
        )
        .await?;

        let acl = Arc::new(acl);
        self.cache.put(Arc::clone(&acl));
        info!(%object_identity, owner = caller.principal(), "ACL created");
        Ok(acl)
    }

    /// Insert an ACE at `index`, shifting later entries
    pub async fn insert_ace(
        &self,
        caller: &Caller,
        object_identity: &ObjectIdentity,
        index: usize,
        sid: Sid,
        mask: Permission,
        granting: bool,
    ) -> Result<Arc<Acl>> {
        self.modify(caller, object_identity, ChangeType::General, move |acl| {
            acl.insert_ace(index, sid, mask, granting)
        })
        .await
    }

    pub async fn delete_ace(
        &self,
        caller: &Caller,
        object_identity: &ObjectIdentity,
        index: usize,
    ) -> Result<Arc<Acl>> {
        self.modify(caller, object_identity, ChangeType::General, move |acl| {
            acl.delete_ace(index).map(drop)
        })
        .await
    }

    /// Replace the mask of the ACE at `index`
    pub async fn update_ace(
        &self,
        caller: &Caller,
        object_identity: &ObjectIdentity,
        index: usize,
        mask: Permission,
    ) -> Result<Arc<Acl>> {
        self.modify(caller, object_identity, ChangeType::General, move |acl| {
            acl.update_ace(index, mask)
        })
        .await
    }

    pub async fn update_auditing(
        &self,
        caller: &Caller,
        object_identity: &ObjectIdentity,
        index: usize,
        audit_success: bool,
        audit_failure: bool,
    ) -> Result<Arc<Acl>> {
        self.modify(caller, object_identity, ChangeType::Auditing, move |acl| {
            acl.update_auditing(index, audit_success, audit_failure)
        })
        .await
    }

    pub async fn set_owner(
        &self,
        caller: &Caller,
        object_identity: &ObjectIdentity,
        owner: Sid,
    ) -> Result<Arc<Acl>> {
        self.modify(caller, object_identity, ChangeType::Ownership, move |acl| {
            acl.set_owner(owner);
            Ok(())
        })
        .await
    }

    pub async fn set_entries_inheriting(
        &self,
        caller: &Caller,
        object_identity: &ObjectIdentity,
        entries_inheriting: bool,
    ) -> Result<Arc<Acl>> {
        self.modify(caller, object_identity, ChangeType::General, move |acl| {
            acl.set_entries_inheriting(entries_inheriting);
            Ok(())
        })
        .await
    }

    /// Re-parent an ACL. Fails with `CycleDetected` when `parent` is the ACL
    /// itself or one of its descendants, and with `NotFound` when `parent`
    /// has no ACL.
    pub async fn set_parent(
        &self,
        caller: &Caller,
        object_identity: &ObjectIdentity,
        parent: Option<ObjectIdentity>,
    ) -> Result<Arc<Acl>> {
        self.modify(caller, object_identity, ChangeType::General, move |acl| {
            acl.set_parent(parent)
        })
        .await
    }

    /// Persist a whole ACL. Each kind of change it carries relative to the
    /// stored ACL is authorized separately.
    pub async fn update_acl(&self, caller: &Caller, acl: Acl) -> Result<Arc<Acl>> {
        let object_identity = acl.object_identity().clone();
        let lock = self.lock_for(&object_identity);
        let _guard = lock.lock().await;

        let current = self.lookup.read_acl_by_id(&object_identity, &[]).await?;
        self.commit(caller, &current, acl, None).await
    }

    /// Delete an ACL. With `delete_children` every descendant goes too, in
    /// the same store call; without it an ACL that has children is kept and
    /// `HasChildren` returned. Returns the number of ACLs deleted.
    pub async fn delete_acl(
        &self,
        caller: &Caller,
        object_identity: &ObjectIdentity,
        delete_children: bool,
    ) -> Result<usize> {
        let lock = self.lock_for(object_identity);
        let outcome = {
            let _guard = lock.lock().await;
            self.delete_tree(caller, object_identity, delete_children).await
        };
        drop(lock);

        self.release_lock(object_identity);
        let (deleted, doomed) = outcome?;
        for gone in &doomed {
            self.release_lock(gone);
        }
        Ok(deleted)
    }

    async fn delete_tree(
        &self,
        caller: &Caller,
        object_identity: &ObjectIdentity,
        delete_children: bool,
    ) -> Result<(usize, Vec<ObjectIdentity>)> {
        let _hierarchy = self.hierarchy.lock().await;

        let current = self.lookup.read_acl_by_id(object_identity, &[]).await?;
        self.authorization
            .security_check(caller, &current, ChangeType::General)?;

        let children = self.find_children(object_identity).await?;
        if !children.is_empty() && !delete_children {
            return Err(Error::has_children(object_identity, children.len()));
        }

        let mut doomed = vec![object_identity.clone()];
        let mut seen: HashSet<ObjectIdentity> = doomed.iter().cloned().collect();
        let mut queue: VecDeque<ObjectIdentity> = children.into();
        while let Some(child) = queue.pop_front() {
            if !seen.insert(child.clone()) {
                continue;
            }
            queue.extend(self.find_children(&child).await?);
            doomed.push(child);
        }

        let result = deadline::within(
            "delete_acls",
            self.store_timeout,
            self.store.delete_acls(&doomed),
        )
        .await;
        for gone in &doomed {
            self.cache.evict(gone);
        }
        let deleted = result?;

        info!(
            %object_identity,
            deleted,
            descendants = doomed.len() - 1,
            principal = caller.principal(),
            "ACL deleted"
        );
        Ok((deleted, doomed))
    }

    /// Drop the lock entry of `object_identity` unless some task still holds
    /// or waits on it. `lock_for` clones under the same shard lock, so a
    /// waiter is always counted.
    fn release_lock(&self, object_identity: &ObjectIdentity) {
        self.locks.remove_if(object_identity, |_, lock| Arc::strong_count(lock) == 1);
    }

    fn lock_for(&self, object_identity: &ObjectIdentity) -> Arc<Mutex<()>> {
        Arc::clone(
            self.locks
                .entry(object_identity.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    async fn modify<F>(
        &self,
        caller: &Caller,
        object_identity: &ObjectIdentity,
        change: ChangeType,
        edit: F,
    ) -> Result<Arc<Acl>>
    where
        F: FnOnce(&mut Acl) -> Result<()>,
    {
        let lock = self.lock_for(object_identity);
        let _guard = lock.lock().await;

        let current = self.lookup.read_acl_by_id(object_identity, &[]).await?;
        self.authorization.security_check(caller, &current, change)?;

        let mut updated = Acl::clone(current.acl());
        edit(&mut updated)?;
        self.commit(caller, &current, updated, Some(change)).await
    }

    async fn commit(
        &self,
        caller: &Caller,
        current: &ResolvedAcl,
        updated: Acl,
        checked: Option<ChangeType>,
    ) -> Result<Arc<Acl>> {
        let changes = changes_between(current.acl(), &updated);
        for change in changes.iter().filter(|change| Some(**change) != checked) {
            self.authorization.security_check(caller, current, *change)?;
        }
        if changes.is_empty() {
            return Ok(Arc::clone(current.acl()));
        }

        if updated.parent() != current.acl().parent() {
            let _hierarchy = self.hierarchy.lock().await;
            if let Some(parent) = updated.parent() {
                self.ensure_acyclic(updated.object_identity(), parent).await?;
            }
            return self.persist(updated).await;
        }
        self.persist(updated).await
    }

    /// Fail when `parent` is `object_identity` or has it as an ancestor
    async fn ensure_acyclic(
        &self,
        object_identity: &ObjectIdentity,
        parent: &ObjectIdentity,
    ) -> Result<()> {
        let mut chain = vec![object_identity.to_string()];
        if parent == object_identity {
            chain.push(parent.to_string());
            return Err(Error::cycle_detected(object_identity, chain));
        }

        let ancestors = self.lookup.read_acl_by_id(parent, &[]).await?;
        for acl in ancestors.chain() {
            chain.push(acl.object_identity().to_string());
            if acl.object_identity() == object_identity {
                warn!(%object_identity, %parent, "rejected parent change that would form a cycle");
                return Err(Error::cycle_detected(object_identity, chain));
            }
        }
        Ok(())
    }

    async fn persist(&self, acl: Acl) -> Result<Arc<Acl>> {
        let object_identity = acl.object_identity().clone();
        self.write(
            "save_acl",
            &object_identity,
            self.store.save_acl(AclRow::from(&acl)),
        )
        .await?;

        let acl = Arc::new(acl);
        self.cache.put(Arc::clone(&acl));
        let descendants = self.cache.descendants_of(&object_identity);
        for descendant in &descendants {
            self.cache.evict(descendant);
        }
        debug!(
            %object_identity,
            entries = acl.entries().len(),
            evicted_descendants = descendants.len(),
            "ACL saved"
        );
        Ok(acl)
    }

    /// Run a store write under the deadline, evicting the cache entry on
    /// failure
    async fn write<F>(
        &self,
        operation: &str,
        object_identity: &ObjectIdentity,
        call: F,
    ) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        let result = deadline::within(operation, self.store_timeout, call).await;
        if let Err(err) = &result {
            warn!(operation, %object_identity, error = %err, "store write failed");
            self.cache.evict(object_identity);
        }
        result
    }
}

/// Kinds of change needed to turn `before` into `after`
fn changes_between(before: &Acl, after: &Acl) -> Vec<ChangeType> {
    let mut changes = Vec::new();

    if before.owner() != after.owner() {
        changes.push(ChangeType::Ownership);
    }

    let rules_differ = before.entries().len() != after.entries().len()
        || before
            .entries()
            .iter()
            .zip(after.entries())
            .any(|(a, b)| a.sid != b.sid || a.mask != b.mask || a.granting != b.granting);
    if rules_differ
        || before.parent() != after.parent()
        || before.entries_inheriting() != after.entries_inheriting()
    {
        changes.push(ChangeType::General);
    }

    let audit_differs = before
        .entries()
        .iter()
        .zip(after.entries())
        .any(|(a, b)| a.audit_success != b.audit_success || a.audit_failure != b.audit_failure);
    if audit_differs {
        changes.push(ChangeType::Auditing);
    }

    changes
}
