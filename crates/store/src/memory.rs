//! In-memory reference store
//!
//! Each operation runs under a single lock acquisition, which gives it the
//! same all-or-nothing behavior a database transaction would. Latency and
//! outage injection exist so callers can exercise timeout and failure paths.

use crate::rows::AclRow;
use crate::traits::AclStore;
use async_trait::async_trait;
use objacl_core::{Error, ObjectIdentity, Result};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Store backed by a lock-guarded map
pub struct InMemoryAclStore {
    rows: RwLock<HashMap<ObjectIdentity, AclRow>>,
    include_ancestors: bool,
    latency: Option<Duration>,
    unavailable: AtomicBool,
    load_queries: AtomicU64,
}

impl InMemoryAclStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            include_ancestors: true,
            latency: None,
            unavailable: AtomicBool::new(false),
            load_queries: AtomicU64::new(0),
        }
    }

    /// Return only the requested rows from `load_acl_rows`, like a store
    /// without recursive queries
    pub fn without_ancestor_loading(mut self) -> Self {
        self.include_ancestors = false;
        self
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every following call fail with `StoreUnavailable` until reset
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `load_acl_rows` calls served so far
    pub fn load_queries(&self) -> u64 {
        self.load_queries.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Current stored row, bypassing latency and outage injection
    pub fn row(&self, object_identity: &ObjectIdentity) -> Option<AclRow> {
        self.rows.read().get(object_identity).cloned()
    }

    async fn enter(&self, operation: &str) -> Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::store_unavailable(operation, "store is offline"));
        }
        Ok(())
    }
}

impl Default for InMemoryAclStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AclStore for InMemoryAclStore {
    async fn load_acl_rows(&self, object_identities: &[ObjectIdentity]) -> Result<Vec<AclRow>> {
        self.load_queries.fetch_add(1, Ordering::SeqCst);
        self.enter("load_acl_rows").await?;

        let rows = self.rows.read();
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        let mut pending: Vec<&ObjectIdentity> = object_identities.iter().collect();

        while let Some(object_identity) = pending.pop() {
            if !seen.insert(object_identity.clone()) {
                continue;
            }
            if let Some(row) = rows.get(object_identity) {
                if self.include_ancestors {
                    if let Some(parent) = &row.parent {
                        pending.push(parent);
                    }
                }
                result.push(row.clone());
            }
        }

        debug!(
            requested = object_identities.len(),
            returned = result.len(),
            "loaded ACL rows"
        );
        Ok(result)
    }

    async fn find_children(&self, parent: &ObjectIdentity) -> Result<Vec<ObjectIdentity>> {
        self.enter("find_children").await?;

        let mut children: Vec<_> = self
            .rows
            .read()
            .values()
            .filter(|row| row.parent.as_ref() == Some(parent))
            .map(|row| row.object_identity.clone())
            .collect();
        children.sort();
        Ok(children)
    }

    async fn insert_acl(&self, row: AclRow) -> Result<()> {
        self.enter("insert_acl").await?;

        let mut rows = self.rows.write();
        if rows.contains_key(&row.object_identity) {
            return Err(Error::already_exists(&row.object_identity));
        }
        rows.insert(row.object_identity.clone(), row);
        Ok(())
    }

    async fn save_acl(&self, row: AclRow) -> Result<()> {
        self.enter("save_acl").await?;

        let mut rows = self.rows.write();
        match rows.get_mut(&row.object_identity) {
            Some(existing) => {
                *existing = row;
                Ok(())
            }
            None => Err(Error::not_found(&row.object_identity)),
        }
    }

    async fn delete_acls(&self, object_identities: &[ObjectIdentity]) -> Result<usize> {
        self.enter("delete_acls").await?;

        let mut rows = self.rows.write();
        Ok(object_identities
            .iter()
            .filter(|object_identity| rows.remove(*object_identity).is_some())
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objacl_core::{Acl, Sid};

    fn oid(id: i64) -> ObjectIdentity {
        ObjectIdentity::new("Folder", id).unwrap()
    }

    fn row(id: i64, parent: Option<i64>) -> AclRow {
        let mut acl = Acl::new(oid(id), Sid::principal("owner"));
        acl.set_parent(parent.map(oid)).unwrap();
        AclRow::from(&acl)
    }

    #[tokio::test]
    async fn test_load_includes_ancestors() {
        let store = InMemoryAclStore::new();
        store.insert_acl(row(1, None)).await.unwrap();
        store.insert_acl(row(2, Some(1))).await.unwrap();
        store.insert_acl(row(3, Some(2))).await.unwrap();

        let rows = store.load_acl_rows(&[oid(3), oid(99)]).await.unwrap();
        let mut ids: Vec<_> = rows.into_iter().map(|r| r.object_identity).collect();
        ids.sort();
        assert_eq!(ids, vec![oid(1), oid(2), oid(3)]);
        assert_eq!(store.load_queries(), 1);
    }

    #[tokio::test]
    async fn test_load_without_ancestors() {
        let store = InMemoryAclStore::new().without_ancestor_loading();
        store.insert_acl(row(1, None)).await.unwrap();
        store.insert_acl(row(2, Some(1))).await.unwrap();

        let rows = store.load_acl_rows(&[oid(2)]).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_insert_twice_fails() {
        let store = InMemoryAclStore::new();
        store.insert_acl(row(1, None)).await.unwrap();
        let err = store.insert_acl(row(1, None)).await.unwrap_err();
        assert_eq!(err.kind(), objacl_core::ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn test_save_requires_existing_row() {
        let store = InMemoryAclStore::new();
        assert!(store.save_acl(row(1, None)).await.is_err());
        store.insert_acl(row(1, None)).await.unwrap();
        store.save_acl(row(1, Some(7))).await.unwrap();
        assert_eq!(store.row(&oid(1)).unwrap().parent, Some(oid(7)));
    }

    #[tokio::test]
    async fn test_children_and_delete() {
        let store = InMemoryAclStore::new();
        store.insert_acl(row(1, None)).await.unwrap();
        store.insert_acl(row(3, Some(1))).await.unwrap();
        store.insert_acl(row(2, Some(1))).await.unwrap();

        assert_eq!(store.find_children(&oid(1)).await.unwrap(), vec![oid(2), oid(3)]);
        assert_eq!(store.delete_acls(&[oid(2), oid(3), oid(4)]).await.unwrap(), 2);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_store() {
        let store = InMemoryAclStore::new();
        store.set_unavailable(true);
        let err = store.load_acl_rows(&[oid(1)]).await.unwrap_err();
        assert_eq!(err.kind(), objacl_core::ErrorKind::StoreUnavailable);

        store.set_unavailable(false);
        assert!(store.load_acl_rows(&[oid(1)]).await.unwrap().is_empty());
    }
}
