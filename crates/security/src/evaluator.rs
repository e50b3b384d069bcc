//! Public permission check entry point
//!
//! Only malformed input is reported as an error. Every failure on the read
//! path (missing ACL, store outage, timeout, corrupt hierarchy) is logged and
//! answered with `false`.

use crate::granting::{Decision, PermissionGrantingStrategy};
use crate::lookup::{AclLookup, LookupStrategy};
use crate::sid_retrieval::SidRetrievalStrategy;
use objacl_core::{
    Caller, Error, ErrorKind, Identifier, ObjectIdentity, Permission, PermissionFactory,
    PermissionRef, Result,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Answers "may this caller do this to that object"
pub struct PermissionEvaluator {
    lookup: Arc<dyn LookupStrategy>,
    granting: Arc<dyn PermissionGrantingStrategy>,
    sid_retrieval: Arc<dyn SidRetrievalStrategy>,
    permissions: PermissionFactory,
}

impl PermissionEvaluator {
    pub fn new(
        lookup: Arc<dyn LookupStrategy>,
        granting: Arc<dyn PermissionGrantingStrategy>,
        sid_retrieval: Arc<dyn SidRetrievalStrategy>,
        permissions: PermissionFactory,
    ) -> Self {
        Self {
            lookup,
            granting,
            sid_retrieval,
            permissions,
        }
    }

    /// Names accepted for [`PermissionRef::Name`] requests
    pub fn permissions(&self) -> &PermissionFactory {
        &self.permissions
    }

    /// Decide one permission for one object.
    ///
    /// `permission` is a mask or a name such as `"READ|WRITE"`. Returns an
    /// error only for an unknown name or an empty mask.
    pub async fn has_permission(
        &self,
        caller: &Caller,
        object_identity: &ObjectIdentity,
        permission: impl Into<PermissionRef>,
    ) -> Result<bool> {
        let permission = permission.into().resolve(&self.permissions)?;
        let sids = self.sid_retrieval.sids(caller);

        let resolved = match self.lookup.read_acl_by_id(object_identity, &sids).await {
            Ok(resolved) => resolved,
            Err(err) => {
                fail_closed(caller, object_identity, permission, &err);
                return Ok(false);
            }
        };

        let decision = self.granting.is_granted(&resolved, permission, &sids, false);
        log_decision(caller, object_identity, permission, decision);
        Ok(decision.is_granted())
    }

    /// Same as [`has_permission`](Self::has_permission), naming the object by
    /// type and identifier
    pub async fn has_permission_for(
        &self,
        caller: &Caller,
        object_type: &str,
        identifier: impl Into<Identifier>,
        permission: impl Into<PermissionRef>,
    ) -> Result<bool> {
        let object_identity = ObjectIdentity::new(object_type, identifier)?;
        self.has_permission(caller, &object_identity, permission).await
    }

    /// Decide one permission for many objects with a single batched lookup
    pub async fn has_permissions(
        &self,
        caller: &Caller,
        object_identities: &[ObjectIdentity],
        permission: impl Into<PermissionRef>,
    ) -> Result<HashMap<ObjectIdentity, bool>> {
        let permission = permission.into().resolve(&self.permissions)?;
        let sids = self.sid_retrieval.sids(caller);

        let mut lookups = match self.lookup.read_acls_by_id(object_identities, &sids).await {
            Ok(lookups) => lookups,
            Err(err) => {
                for object_identity in object_identities {
                    fail_closed(caller, object_identity, permission, &err);
                }
                return Ok(object_identities
                    .iter()
                    .map(|object_identity| (object_identity.clone(), false))
                    .collect());
            }
        };

        let mut decisions = HashMap::with_capacity(object_identities.len());
        for object_identity in object_identities {
            let granted = match lookups.remove(object_identity) {
                Some(AclLookup::Found(resolved)) => {
                    let decision = self.granting.is_granted(&resolved, permission, &sids, false);
                    log_decision(caller, object_identity, permission, decision);
                    decision.is_granted()
                }
                Some(AclLookup::NotFound) => {
                    let err = Error::not_found(object_identity);
                    fail_closed(caller, object_identity, permission, &err);
                    false
                }
                // Duplicate identity, already decided
                None => continue,
            };
            decisions.insert(object_identity.clone(), granted);
        }
        Ok(decisions)
    }
}

fn log_decision(
    caller: &Caller,
    object_identity: &ObjectIdentity,
    permission: Permission,
    decision: Decision,
) {
    debug!(
        principal = caller.principal(),
        %object_identity,
        %permission,
        %decision,
        "permission decided"
    );
}

fn fail_closed(
    caller: &Caller,
    object_identity: &ObjectIdentity,
    permission: Permission,
    err: &Error,
) {
    if err.kind() == ErrorKind::NotFound {
        debug!(
            principal = caller.principal(),
            %object_identity,
            %permission,
            "no ACL, denying"
        );
    } else {
        warn!(
            principal = caller.principal(),
            %object_identity,
            %permission,
            error = %err,
            "ACL lookup failed, denying"
        );
    }
}
