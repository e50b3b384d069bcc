//! Caller to SID conversion

use objacl_core::{Caller, Sid};

/// Turns a caller into the ordered SIDs used for evaluation
pub trait SidRetrievalStrategy: Send + Sync {
    fn sids(&self, caller: &Caller) -> Vec<Sid>;
}

/// Principal first, then authorities in the order the caller presents them,
/// with duplicates removed.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSidRetrievalStrategy;

impl SidRetrievalStrategy for DefaultSidRetrievalStrategy {
    fn sids(&self, caller: &Caller) -> Vec<Sid> {
        let mut sids = Vec::with_capacity(caller.authorities().len() + 1);
        sids.push(caller.principal_sid());
        for authority in caller.authorities() {
            let sid = Sid::authority(authority.clone());
            if !sids.contains(&sid) {
                sids.push(sid);
            }
        }
        sids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_first_then_authorities() {
        let caller = Caller::new("alice", ["ROLE_USER", "ROLE_ADMIN", "ROLE_USER"]).unwrap();
        let sids = DefaultSidRetrievalStrategy.sids(&caller);
        assert_eq!(
            sids,
            vec![
                Sid::principal("alice"),
                Sid::authority("ROLE_USER"),
                Sid::authority("ROLE_ADMIN"),
            ]
        );
    }

    #[test]
    fn test_authority_named_like_principal_is_kept() {
        let caller = Caller::new("ops", ["ops"]).unwrap();
        let sids = DefaultSidRetrievalStrategy.sids(&caller);
        assert_eq!(sids, vec![Sid::principal("ops"), Sid::authority("ops")]);
    }
}
