//! Who may change an ACL

use crate::granting::PermissionGrantingStrategy;
use crate::lookup::ResolvedAcl;
use crate::sid_retrieval::SidRetrievalStrategy;
use objacl_core::{AclConfig, Caller, Error, Permission, Result};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Kind of ACL change being authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    /// Changing the owner
    Ownership,
    /// Changing ACE audit flags
    Auditing,
    /// Any other change: entries, parent, inheritance
    General,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ChangeType::Ownership => "ownership change",
            ChangeType::Auditing => "auditing change",
            ChangeType::General => "general change",
        };
        f.write_str(text)
    }
}

/// Decides whether a caller may make a change to an ACL
pub trait AclAuthorizationStrategy: Send + Sync {
    /// `Ok(())` when allowed, [`Error::AccessDenied`] otherwise
    fn security_check(&self, caller: &Caller, acl: &ResolvedAcl, change: ChangeType) -> Result<()>;
}

/// Owner, configured authority, or ADMINISTRATION on the ACL chain.
///
/// - the owning principal may make ownership and general changes
/// - a caller holding the authority configured for the change type may make it
/// - a caller granted ADMINISTRATION may make general and auditing changes
pub struct DefaultAclAuthorizationStrategy {
    ownership_authority: String,
    auditing_authority: String,
    general_authority: String,
    granting: Arc<dyn PermissionGrantingStrategy>,
    sid_retrieval: Arc<dyn SidRetrievalStrategy>,
}

impl DefaultAclAuthorizationStrategy {
    pub fn new(
        config: &AclConfig,
        granting: Arc<dyn PermissionGrantingStrategy>,
        sid_retrieval: Arc<dyn SidRetrievalStrategy>,
    ) -> Self {
        Self {
            ownership_authority: config.ownership_authority.clone(),
            auditing_authority: config.auditing_authority.clone(),
            general_authority: config.general_authority.clone(),
            granting,
            sid_retrieval,
        }
    }

    fn required_authority(&self, change: ChangeType) -> &str {
        match change {
            ChangeType::Ownership => &self.ownership_authority,
            ChangeType::Auditing => &self.auditing_authority,
            ChangeType::General => &self.general_authority,
        }
    }
}

impl AclAuthorizationStrategy for DefaultAclAuthorizationStrategy {
    fn security_check(&self, caller: &Caller, acl: &ResolvedAcl, change: ChangeType) -> Result<()> {
        let object_identity = acl.object_identity();

        if change != ChangeType::Auditing && acl.acl().owner() == &caller.principal_sid() {
            debug!(principal = caller.principal(), %object_identity, %change, "allowed as owner");
            return Ok(());
        }

        let authority = self.required_authority(change);
        if caller.has_authority(authority) {
            debug!(
                principal = caller.principal(),
                %object_identity,
                %change,
                authority,
                "allowed by authority"
            );
            return Ok(());
        }

        if change != ChangeType::Ownership {
            let sids = self.sid_retrieval.sids(caller);
            if self
                .granting
                .is_granted(acl, Permission::ADMINISTRATION, &sids, true)
                .is_granted()
            {
                debug!(
                    principal = caller.principal(),
                    %object_identity,
                    %change,
                    "allowed by ADMINISTRATION"
                );
                return Ok(());
            }
        }

        debug!(principal = caller.principal(), %object_identity, %change, "ACL change denied");
        Err(Error::access_denied(
            caller.principal(),
            change.to_string(),
            object_identity,
        ))
    }
}
