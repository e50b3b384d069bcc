//! Row shapes exchanged with the store

use objacl_core::{AccessControlEntry, Acl, ObjectIdentity, Permission, Sid};
use serde::{Deserialize, Serialize};

/// One stored ACE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AceRow {
    pub order: usize,
    pub sid: Sid,
    pub mask: u32,
    pub granting: bool,
    pub audit_success: bool,
    pub audit_failure: bool,
}

/// One stored ACL with its entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclRow {
    pub object_identity: ObjectIdentity,
    pub parent: Option<ObjectIdentity>,
    pub owner: Sid,
    pub entries_inheriting: bool,
    pub entries: Vec<AceRow>,
}

impl AclRow {
    /// Rebuild the domain ACL; entries are ordered by their stored order
    pub fn into_acl(self) -> Acl {
        let entries = self
            .entries
            .into_iter()
            .map(|row| AccessControlEntry {
                order: row.order,
                sid: row.sid,
                mask: Permission::from_mask(row.mask),
                granting: row.granting,
                audit_success: row.audit_success,
                audit_failure: row.audit_failure,
            })
            .collect();
        Acl::from_parts(
            self.object_identity,
            self.owner,
            self.entries_inheriting,
            self.parent,
            entries,
        )
    }
}

impl From<&Acl> for AclRow {
    fn from(acl: &Acl) -> Self {
        Self {
            object_identity: acl.object_identity().clone(),
            parent: acl.parent().cloned(),
            owner: acl.owner().clone(),
            entries_inheriting: acl.entries_inheriting(),
            entries: acl
                .entries()
                .iter()
                .map(|ace| AceRow {
                    order: ace.order,
                    sid: ace.sid.clone(),
                    mask: ace.mask.mask(),
                    granting: ace.granting,
                    audit_success: ace.audit_success,
                    audit_failure: ace.audit_failure,
                })
                .collect(),
        }
    }
}
