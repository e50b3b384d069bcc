//! Access control entries and lists
//!
//! An [`Acl`] owns its entries. Every mutation keeps `order` equal to the
//! entry's position, so orders are always zero-based, unique and gap-free.

use super::identity::ObjectIdentity;
use super::permission::Permission;
use super::sid::Sid;
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};

/// One ordered grant/deny rule binding a SID to a permission mask
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlEntry {
    pub order: usize,
    pub sid: Sid,
    pub mask: Permission,
    pub granting: bool,
    pub audit_success: bool,
    pub audit_failure: bool,
}

impl AccessControlEntry {
    /// Create an entry with auditing disabled
    pub fn new(order: usize, sid: Sid, mask: Permission, granting: bool) -> Self {
        Self {
            order,
            sid,
            mask,
            granting,
            audit_success: false,
            audit_failure: false,
        }
    }

    /// Whether this entry speaks for `sid` about the single permission `bit`
    pub fn matches(&self, sid: &Sid, bit: Permission) -> bool {
        self.sid == *sid && self.mask.contains(bit)
    }

    /// Whether the decision made by this entry should be audited
    pub fn audits(&self) -> bool {
        if self.granting {
            self.audit_success
        } else {
            self.audit_failure
        }
    }
}

/// The ordered rule set plus inheritance metadata for one secured object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    object_identity: ObjectIdentity,
    owner: Sid,
    entries_inheriting: bool,
    parent: Option<ObjectIdentity>,
    entries: Vec<AccessControlEntry>,
}

impl Acl {
    /// Empty ACL that inherits from its (absent) parent
    pub fn new(object_identity: ObjectIdentity, owner: Sid) -> Self {
        Self {
            object_identity,
            owner,
            entries_inheriting: true,
            parent: None,
            entries: Vec::new(),
        }
    }

    /// Assemble an ACL from stored parts. Entries are sorted by their stored
    /// order and renumbered.
    pub fn from_parts(
        object_identity: ObjectIdentity,
        owner: Sid,
        entries_inheriting: bool,
        parent: Option<ObjectIdentity>,
        mut entries: Vec<AccessControlEntry>,
    ) -> Self {
        entries.sort_by_key(|ace| ace.order);
        let mut acl = Self {
            object_identity,
            owner,
            entries_inheriting,
            parent,
            entries,
        };
        acl.renumber();
        acl
    }

    pub fn object_identity(&self) -> &ObjectIdentity {
        &self.object_identity
    }

    pub fn owner(&self) -> &Sid {
        &self.owner
    }

    pub fn entries_inheriting(&self) -> bool {
        self.entries_inheriting
    }

    pub fn parent(&self) -> Option<&ObjectIdentity> {
        self.parent.as_ref()
    }

    pub fn entries(&self) -> &[AccessControlEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert an entry at `index`, shifting later entries up by one
    pub fn insert_ace(
        &mut self,
        index: usize,
        sid: Sid,
        mask: Permission,
        granting: bool,
    ) -> Result<()> {
        if index > self.entries.len() {
            return Err(Error::invalid_order(index, self.entries.len()));
        }
        if mask.is_empty() {
            return Err(Error::invalid_permission(
                mask.to_string(),
                "an ACE must carry at least one permission bit",
            ));
        }
        self.entries
            .insert(index, AccessControlEntry::new(index, sid, mask, granting));
        self.renumber();
        Ok(())
    }

    /// Remove the entry at `index`, shifting later entries down by one
    pub fn delete_ace(&mut self, index: usize) -> Result<AccessControlEntry> {
        if index >= self.entries.len() {
            return Err(Error::invalid_order(index, self.entries.len()));
        }
        let removed = self.entries.remove(index);
        self.renumber();
        Ok(removed)
    }

    /// Replace the mask of the entry at `index`
    pub fn update_ace(&mut self, index: usize, mask: Permission) -> Result<()> {
        if mask.is_empty() {
            return Err(Error::invalid_permission(
                mask.to_string(),
                "an ACE must carry at least one permission bit",
            ));
        }
        let len = self.entries.len();
        let ace = self
            .entries
            .get_mut(index)
            .ok_or_else(|| Error::invalid_order(index, len))?;
        ace.mask = mask;
        Ok(())
    }

    /// Change the audit flags of the entry at `index`
    pub fn update_auditing(
        &mut self,
        index: usize,
        audit_success: bool,
        audit_failure: bool,
    ) -> Result<()> {
        let len = self.entries.len();
        let ace = self
            .entries
            .get_mut(index)
            .ok_or_else(|| Error::invalid_order(index, len))?;
        ace.audit_success = audit_success;
        ace.audit_failure = audit_failure;
        Ok(())
    }

    pub fn set_owner(&mut self, owner: Sid) {
        self.owner = owner;
    }

    pub fn set_entries_inheriting(&mut self, entries_inheriting: bool) {
        self.entries_inheriting = entries_inheriting;
    }

    /// Set the parent link. Only self-parenting is detectable here; deeper
    /// cycles are checked against the stored chain when the change is saved.
    pub fn set_parent(&mut self, parent: Option<ObjectIdentity>) -> Result<()> {
        if parent.as_ref() == Some(&self.object_identity) {
            let id = self.object_identity.to_string();
            return Err(Error::cycle_detected(&id, vec![id.clone(), id.clone()]));
        }
        self.parent = parent;
        Ok(())
    }

    fn renumber(&mut self) {
        for (position, ace) in self.entries.iter_mut().enumerate() {
            ace.order = position;
        }
    }
}
