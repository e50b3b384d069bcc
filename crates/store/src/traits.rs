//! Store trait definition

use crate::rows::AclRow;
use async_trait::async_trait;
use objacl_core::{ObjectIdentity, Result};

/// Backing store for ACL rows.
///
/// Every method is one atomic unit of work (a single transaction for a
/// database-backed store). Driver failures are reported as
/// `Error::StoreUnavailable`.
#[async_trait]
pub trait AclStore: Send + Sync {
    /// Rows for `object_identities` plus, where the store can do so in the
    /// same query, every ancestor of those rows. Identities without a row are
    /// simply absent from the result.
    async fn load_acl_rows(&self, object_identities: &[ObjectIdentity]) -> Result<Vec<AclRow>>;

    /// Identities of the ACLs whose parent is `parent`
    async fn find_children(&self, parent: &ObjectIdentity) -> Result<Vec<ObjectIdentity>>;

    /// Persist a new ACL; `Error::AlreadyExists` if one is stored already
    async fn insert_acl(&self, row: AclRow) -> Result<()>;

    /// Replace an existing ACL with its entries; `Error::NotFound` if absent
    async fn save_acl(&self, row: AclRow) -> Result<()>;

    /// Delete every listed ACL in one unit of work, returning how many existed
    async fn delete_acls(&self, object_identities: &[ObjectIdentity]) -> Result<usize>;
}
