//! End-to-end permission decisions through the evaluator

mod common;

use common::{admin, caller, init_tracing, oid, TestEngine};
use objacl_core::{ErrorKind, Permission, Sid};

#[tokio::test]
async fn document_42_scenario() {
    init_tracing();
    let t = TestEngine::new();
    let service = t.engine.service();
    let evaluator = t.engine.evaluator();

    let alice = caller("alice", &["ROLE_USER"]);
    let bob = caller("bob", &["ROLE_USER"]);
    let doc = oid("Document", 42);

    service.create_acl(&alice, &doc).await.unwrap();
    service
        .insert_ace(
            &alice,
            &doc,
            0,
            Sid::principal("alice"),
            Permission::READ | Permission::WRITE,
            true,
        )
        .await
        .unwrap();
    service
        .insert_ace(&alice, &doc, 1, Sid::authority("ROLE_ADMIN"), Permission::ADMINISTRATION, true)
        .await
        .unwrap();

    assert!(evaluator.has_permission(&alice, &doc, Permission::WRITE).await.unwrap());
    assert!(evaluator.has_permission(&alice, &doc, "READ|WRITE").await.unwrap());
    assert!(!evaluator.has_permission(&bob, &doc, Permission::WRITE).await.unwrap());
    assert!(!evaluator.has_permission(&alice, &doc, Permission::ADMINISTRATION).await.unwrap());
    assert!(evaluator
        .has_permission(&admin(), &doc, Permission::ADMINISTRATION)
        .await
        .unwrap());
}

#[tokio::test]
async fn first_match_wins_between_deny_and_grant() {
    let t = TestEngine::new();
    let service = t.engine.service();
    let alice = caller("alice", &[]);
    let doc = oid("Document", 1);

    service.create_acl(&alice, &doc).await.unwrap();
    service
        .insert_ace(&alice, &doc, 0, Sid::principal("alice"), Permission::READ, false)
        .await
        .unwrap();
    service
        .insert_ace(&alice, &doc, 1, Sid::principal("alice"), Permission::READ, true)
        .await
        .unwrap();
    assert!(!t.engine.evaluator().has_permission(&alice, &doc, Permission::READ).await.unwrap());

    // Moving the grant in front flips the decision
    service.delete_ace(&alice, &doc, 0).await.unwrap();
    service
        .insert_ace(&alice, &doc, 1, Sid::principal("alice"), Permission::READ, false)
        .await
        .unwrap();
    assert!(t.engine.evaluator().has_permission(&alice, &doc, Permission::READ).await.unwrap());
}

#[tokio::test]
async fn inheritance_from_parent_acl() {
    let t = TestEngine::new();
    let service = t.engine.service();
    let evaluator = t.engine.evaluator();
    let owner = caller("owner", &[]);
    let bob = caller("bob", &["ROLE_EDITOR"]);
    let folder = oid("Folder", 1);
    let doc = oid("Document", 7);

    service.create_acl(&owner, &folder).await.unwrap();
    service
        .insert_ace(&owner, &folder, 0, Sid::authority("ROLE_EDITOR"), Permission::WRITE, true)
        .await
        .unwrap();
    service.create_acl(&owner, &doc).await.unwrap();
    service.set_parent(&owner, &doc, Some(folder.clone())).await.unwrap();

    assert!(evaluator.has_permission(&bob, &doc, Permission::WRITE).await.unwrap());

    service.set_entries_inheriting(&owner, &doc, false).await.unwrap();
    assert!(!evaluator.has_permission(&bob, &doc, Permission::WRITE).await.unwrap());
}

#[tokio::test]
async fn parent_inheritance_flag_applies_at_its_own_level() {
    let t = TestEngine::new();
    let service = t.engine.service();
    let owner = caller("owner", &[]);
    let bob = caller("bob", &[]);
    let (root, middle, leaf) = (oid("Folder", 1), oid("Folder", 2), oid("Document", 3));

    for id in [&root, &middle, &leaf] {
        service.create_acl(&owner, id).await.unwrap();
    }
    service
        .insert_ace(&owner, &root, 0, Sid::principal("bob"), Permission::READ, true)
        .await
        .unwrap();
    service.set_parent(&owner, &middle, Some(root.clone())).await.unwrap();
    service.set_parent(&owner, &leaf, Some(middle.clone())).await.unwrap();
    assert!(t.engine.evaluator().has_permission(&bob, &leaf, Permission::READ).await.unwrap());

    service.set_entries_inheriting(&owner, &middle, false).await.unwrap();
    assert!(!t.engine.evaluator().has_permission(&bob, &leaf, Permission::READ).await.unwrap());
}

#[tokio::test]
async fn grant_must_cover_the_whole_mask() {
    let t = TestEngine::new();
    let service = t.engine.service();
    let alice = caller("alice", &[]);
    let doc = oid("Document", 5);

    service.create_acl(&alice, &doc).await.unwrap();
    service
        .insert_ace(&alice, &doc, 0, Sid::principal("alice"), Permission::READ, true)
        .await
        .unwrap();

    let evaluator = t.engine.evaluator();
    assert!(evaluator.has_permission(&alice, &doc, Permission::READ).await.unwrap());
    assert!(!evaluator
        .has_permission(&alice, &doc, Permission::READ | Permission::WRITE)
        .await
        .unwrap());
}

#[tokio::test]
async fn missing_acl_denies() {
    let t = TestEngine::new();
    let granted = t
        .engine
        .evaluator()
        .has_permission(&admin(), &oid("Document", 404), Permission::READ)
        .await
        .unwrap();
    assert!(!granted);
}

#[tokio::test]
async fn malformed_requests_are_errors() {
    let t = TestEngine::new();
    let evaluator = t.engine.evaluator();
    let alice = caller("alice", &[]);
    let doc = oid("Document", 1);

    let err = evaluator.has_permission(&alice, &doc, "FLY").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPermission);

    let err = evaluator
        .has_permission(&alice, &doc, Permission::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPermission);

    let err = evaluator
        .has_permission_for(&alice, "", 1, Permission::READ)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn type_and_identifier_form() {
    let t = TestEngine::new();
    let alice = caller("alice", &[]);
    let report = oid("Report", 9);
    t.engine.service().create_acl(&alice, &report).await.unwrap();
    t.engine
        .service()
        .insert_ace(&alice, &report, 0, Sid::principal("alice"), Permission::DELETE, true)
        .await
        .unwrap();

    assert!(t
        .engine
        .evaluator()
        .has_permission_for(&alice, "Report", 9, "delete")
        .await
        .unwrap());
}

#[tokio::test]
async fn batch_decisions() {
    let t = TestEngine::new();
    let service = t.engine.service();
    let alice = caller("alice", &[]);
    let docs: Vec<_> = (1..=4).map(|id| oid("Document", id)).collect();

    for (i, doc) in docs.iter().take(3).enumerate() {
        service.create_acl(&alice, doc).await.unwrap();
        service
            .insert_ace(&alice, doc, 0, Sid::principal("alice"), Permission::READ, i != 1)
            .await
            .unwrap();
    }

    let decisions = t
        .engine
        .evaluator()
        .has_permissions(&alice, &docs, Permission::READ)
        .await
        .unwrap();
    assert_eq!(decisions.len(), 4);
    assert!(decisions[&docs[0]]);
    assert!(!decisions[&docs[1]]);
    assert!(decisions[&docs[2]]);
    assert!(!decisions[&docs[3]]);
}

#[tokio::test]
async fn flagged_entries_are_audited() {
    let t = TestEngine::new();
    let service = t.engine.service();
    let alice = caller("alice", &[]);
    let doc = oid("Document", 11);

    service.create_acl(&alice, &doc).await.unwrap();
    service
        .insert_ace(&alice, &doc, 0, Sid::principal("alice"), Permission::READ, true)
        .await
        .unwrap();
    service
        .insert_ace(&alice, &doc, 1, Sid::principal("alice"), Permission::DELETE, false)
        .await
        .unwrap();
    service.update_auditing(&admin(), &doc, 0, true, false).await.unwrap();
    service.update_auditing(&admin(), &doc, 1, false, true).await.unwrap();

    let evaluator = t.engine.evaluator();
    assert!(evaluator.has_permission(&alice, &doc, Permission::READ).await.unwrap());
    assert!(!evaluator.has_permission(&alice, &doc, Permission::DELETE).await.unwrap());

    let events = t.audit.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].sid, Sid::principal("alice"));
    assert_eq!(events[0].object_identity, doc);
    assert!(events[0].granted);
    assert_eq!(events[1].permission_mask, Permission::DELETE.mask());
    assert!(!events[1].granted);
}

#[tokio::test]
async fn custom_permission_names() {
    use objacl_core::{AclConfig, PermissionFactory};
    use objacl_security::AclEngine;
    use objacl_store::InMemoryAclStore;
    use std::sync::Arc;

    let approve = Permission::from_mask(1 << 5);
    let mut permissions = PermissionFactory::new();
    permissions.register("APPROVE", approve).unwrap();

    let engine = AclEngine::builder(Arc::new(InMemoryAclStore::new()))
        .with_config(AclConfig::default())
        .with_permission_factory(permissions)
        .build()
        .unwrap();

    let alice = caller("alice", &[]);
    let doc = oid("Invoice", 3);
    engine.service().create_acl(&alice, &doc).await.unwrap();
    engine
        .service()
        .insert_ace(&alice, &doc, 0, Sid::principal("alice"), approve, true)
        .await
        .unwrap();

    assert!(engine.evaluator().has_permission(&alice, &doc, "approve").await.unwrap());
    assert!(!engine.evaluator().has_permission(&alice, &doc, "APPROVE|READ").await.unwrap());
}
