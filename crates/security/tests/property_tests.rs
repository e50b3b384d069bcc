//! Property-based tests for evaluation and lookup
//!
//! Random ACLs and callers are drawn from small pools of names and permission
//! bits so that matches, denies and misses all occur often.

mod common;

use common::{oid, TestEngine};
use objacl_core::{Acl, Caller, ErrorKind, ObjectIdentity, Permission, Sid};
use objacl_store::{AclRow, AclStore, InMemoryAclStore};
use objacl_security::{
    DefaultPermissionGrantingStrategy, NoopAuditSink, PermissionGrantingStrategy, ResolvedAcl,
};
use proptest::prelude::*;
use std::sync::Arc;
use tokio::runtime::Runtime;

const NAMES: [&str; 3] = ["alice", "bob", "carol"];
const ROLES: [&str; 2] = ["ROLE_USER", "ROLE_ADMIN"];

#[derive(Debug, Clone)]
struct EntrySpec {
    sid: Sid,
    mask: Permission,
    granting: bool,
}

fn arb_sid() -> impl Strategy<Value = Sid> {
    prop_oneof![
        (0..NAMES.len()).prop_map(|i| Sid::principal(NAMES[i])),
        (0..ROLES.len()).prop_map(|i| Sid::authority(ROLES[i])),
    ]
}

fn arb_mask() -> impl Strategy<Value = Permission> {
    (1u32..32).prop_map(Permission::from_mask)
}

fn arb_entry() -> impl Strategy<Value = EntrySpec> {
    (arb_sid(), arb_mask(), any::<bool>()).prop_map(|(sid, mask, granting)| EntrySpec {
        sid,
        mask,
        granting,
    })
}

fn arb_caller() -> impl Strategy<Value = Caller> {
    (0..NAMES.len(), prop::collection::vec(0..ROLES.len(), 0..3)).prop_map(|(name, roles)| {
        Caller::new(NAMES[name], roles.into_iter().map(|i| ROLES[i])).unwrap()
    })
}

fn build_acl(id: i64, entries: &[EntrySpec]) -> Acl {
    let mut acl = Acl::new(oid("Document", id), Sid::principal("owner"));
    for (i, entry) in entries.iter().enumerate() {
        acl.insert_ace(i, entry.sid.clone(), entry.mask, entry.granting)
            .unwrap();
    }
    acl
}

/// Straightforward restatement of the evaluation rules for a single ACL
fn expected(entries: &[EntrySpec], sids: &[Sid], requested: Permission) -> bool {
    requested.bits().all(|bit| {
        sids.iter()
            .find_map(|sid| {
                entries
                    .iter()
                    .find(|entry| &entry.sid == sid && entry.mask.contains(bit))
            })
            .is_some_and(|entry| entry.granting)
    })
}

fn sids_of(caller: &Caller) -> Vec<Sid> {
    use objacl_security::{DefaultSidRetrievalStrategy, SidRetrievalStrategy};
    DefaultSidRetrievalStrategy.sids(caller)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_evaluation_matches_rules_and_is_deterministic(
        entries in prop::collection::vec(arb_entry(), 0..8),
        caller in arb_caller(),
        requested in arb_mask(),
    ) {
        let strategy = DefaultPermissionGrantingStrategy::new(Arc::new(NoopAuditSink), false);
        let resolved = ResolvedAcl::new(Arc::new(build_acl(1, &entries)), None);
        let sids = sids_of(&caller);

        let first = strategy.is_granted(&resolved, requested, &sids, false);
        let second = strategy.is_granted(&resolved, requested, &sids, false);
        prop_assert_eq!(first, second);
        prop_assert_eq!(first.is_granted(), expected(&entries, &sids, requested));
    }

    #[test]
    fn prop_no_implicit_grant_without_inheritance(
        parent_entries in prop::collection::vec(arb_entry(), 0..6),
        caller in arb_caller(),
        requested in arb_mask(),
    ) {
        let strategy = DefaultPermissionGrantingStrategy::new(Arc::new(NoopAuditSink), false);
        let parent = Arc::new(ResolvedAcl::new(Arc::new(build_acl(1, &parent_entries)), None));
        let mut child = build_acl(2, &[]);
        child.set_parent(Some(oid("Document", 1))).unwrap();
        child.set_entries_inheriting(false);
        let resolved = ResolvedAcl::new(Arc::new(child), Some(parent));

        let decision = strategy.is_granted(&resolved, requested, &sids_of(&caller), false);
        prop_assert!(!decision.is_granted());
    }

    #[test]
    fn prop_orders_stay_gap_free(
        ops in prop::collection::vec((any::<bool>(), 0usize..10), 1..40),
    ) {
        let mut acl = build_acl(1, &[]);
        for (insert, index) in ops {
            let len = acl.entries().len();
            if insert {
                let index = index.min(len);
                acl.insert_ace(index, Sid::principal("alice"), Permission::READ, true).unwrap();
            } else if len > 0 {
                acl.delete_ace(index % len).unwrap();
            }
            let orders: Vec<_> = acl.entries().iter().map(|ace| ace.order).collect();
            prop_assert_eq!(orders, (0..acl.entries().len()).collect::<Vec<_>>());
        }
    }

    #[test]
    fn prop_batch_lookup_equals_single_lookups(
        acls in prop::collection::vec(
            (
                prop::collection::vec(arb_entry(), 0..4),
                any::<prop::sample::Index>(),
                any::<bool>(),
            ),
            1..12,
        ),
        missing in 0usize..4,
        caller in arb_caller(),
        requested in arb_mask(),
        batch_size in 1usize..5,
        ancestor_loading in any::<bool>(),
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let config = objacl_core::AclConfig::builder()
                .with_lookup_batch_size(batch_size)
                .build()
                .unwrap();
            let store = if ancestor_loading {
                InMemoryAclStore::new()
            } else {
                InMemoryAclStore::new().without_ancestor_loading()
            };
            let t = TestEngine::with(store, config);
            let mut ids: Vec<ObjectIdentity> = Vec::new();

            // Parents always have a lower index, so the hierarchy is acyclic
            for (i, (entries, parent, has_parent)) in acls.iter().enumerate() {
                let mut acl = build_acl(i as i64, entries);
                if *has_parent && i > 0 {
                    acl.set_parent(Some(oid("Document", parent.index(i) as i64))).unwrap();
                }
                t.store.insert_acl(AclRow::from(&acl)).await.unwrap();
                ids.push(acl.object_identity().clone());
            }
            for i in 0..missing {
                ids.push(oid("Missing", i as i64));
            }

            let batched_engine = t.fresh_view();
            let batched = batched_engine
                .service()
                .read_acls_by_id(&ids)
                .await
                .unwrap();
            let decisions = batched_engine
                .evaluator()
                .has_permissions(&caller, &ids, requested)
                .await
                .unwrap();

            let single_engine = t.fresh_view();
            for id in &ids {
                let single = single_engine.service().read_acl_by_id(id).await;
                match (batched[id].clone().found(), single) {
                    (Some(batched_chain), Ok(single_chain)) => {
                        let batched_acls: Vec<Acl> = batched_chain.chain().cloned().collect();
                        let single_acls: Vec<Acl> = single_chain.chain().cloned().collect();
                        assert_eq!(batched_acls, single_acls, "chain for {id}");
                    }
                    (None, Err(err)) => assert_eq!(err.kind(), ErrorKind::NotFound),
                    (batched, single) => panic!(
                        "lookups disagree for {id}: batched found {}, single {:?}",
                        batched.is_some(),
                        single.map(|_| ())
                    ),
                }

                let decision = single_engine
                    .evaluator()
                    .has_permission(&caller, id, requested)
                    .await
                    .unwrap();
                assert_eq!(decisions[id], decision, "decision for {id}");
            }
        });
    }
}
