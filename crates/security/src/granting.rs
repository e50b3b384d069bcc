//! The grant/deny decision algorithm
//!
//! A request is decomposed into single permission bits and granted only when
//! every bit is granted. For each bit, SIDs are tried in caller order and the
//! ACL's entries in ascending order; the first entry for that SID whose mask
//! holds the bit decides it. A deny decides the whole request. A bit nobody
//! speaks for is looked up in the parent ACL when the ACL inherits, and is
//! denied once the chain runs out.

use crate::audit::{AuditEvent, AuditSink};
use crate::lookup::ResolvedAcl;
use objacl_core::{AccessControlEntry, Permission, Sid};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Outcome of a permission check. Collapses to a bool at the public
/// boundary; the distinction between the two denies is kept for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Granted,
    /// An ACE explicitly denied one of the requested bits
    Denied,
    /// No ACE in the chain spoke for one of the requested bits
    NoMatchingEntry,
}

impl Decision {
    pub fn is_granted(self) -> bool {
        self == Decision::Granted
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Decision::Granted => "granted",
            Decision::Denied => "denied",
            Decision::NoMatchingEntry => "no matching entry",
        };
        f.write_str(text)
    }
}

/// Decides a permission request against a resolved ACL chain
pub trait PermissionGrantingStrategy: Send + Sync {
    /// `administrative_mode` suppresses auditing, for checks the engine
    /// makes on its own behalf.
    fn is_granted(
        &self,
        acl: &ResolvedAcl,
        permission: Permission,
        sids: &[Sid],
        administrative_mode: bool,
    ) -> Decision;
}

/// First-match-wins evaluation with parent inheritance and default deny
pub struct DefaultPermissionGrantingStrategy {
    audit_sink: Arc<dyn AuditSink>,
    audit_enabled: bool,
}

impl DefaultPermissionGrantingStrategy {
    pub fn new(audit_sink: Arc<dyn AuditSink>, audit_enabled: bool) -> Self {
        Self {
            audit_sink,
            audit_enabled,
        }
    }

    /// The ACE deciding `bit`, together with the ACL level holding it
    fn deciding_entry<'a>(
        acl: &'a ResolvedAcl,
        bit: Permission,
        sids: &[Sid],
    ) -> Option<(&'a ResolvedAcl, &'a AccessControlEntry)> {
        let mut level = Some(acl);
        while let Some(current) = level {
            for sid in sids {
                if let Some(ace) = current
                    .acl()
                    .entries()
                    .iter()
                    .find(|ace| ace.matches(sid, bit))
                {
                    return Some((current, ace));
                }
            }
            if !current.acl().entries_inheriting() {
                return None;
            }
            level = current.parent().map(Arc::as_ref);
        }
        None
    }

    fn audit(
        &self,
        requested: &ResolvedAcl,
        level: &ResolvedAcl,
        ace: &AccessControlEntry,
        bit: Permission,
    ) {
        if !self.audit_enabled || !ace.audits() {
            return;
        }
        self.audit_sink.record(&AuditEvent::new(
            ace.sid.clone(),
            requested.object_identity().clone(),
            level.object_identity().clone(),
            bit,
            ace.granting,
            ace.order,
        ));
    }
}

impl PermissionGrantingStrategy for DefaultPermissionGrantingStrategy {
    fn is_granted(
        &self,
        acl: &ResolvedAcl,
        permission: Permission,
        sids: &[Sid],
        administrative_mode: bool,
    ) -> Decision {
        if permission.is_empty() {
            return Decision::NoMatchingEntry;
        }

        for bit in permission.bits() {
            let Some((level, ace)) = Self::deciding_entry(acl, bit, sids) else {
                trace!(
                    object_identity = %acl.object_identity(),
                    permission = %bit,
                    "no entry decides permission bit"
                );
                return Decision::NoMatchingEntry;
            };

            if !administrative_mode {
                self.audit(acl, level, ace, bit);
            }
            trace!(
                object_identity = %acl.object_identity(),
                decided_by = %level.object_identity(),
                sid = %ace.sid,
                ace_order = ace.order,
                granting = ace.granting,
                permission = %bit,
                "permission bit decided"
            );
            if !ace.granting {
                return Decision::Denied;
            }
        }
        Decision::Granted
    }
}
