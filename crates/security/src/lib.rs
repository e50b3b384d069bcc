//! Permission decisions and ACL administration for objacl
//!
//! A caller asks [`PermissionEvaluator::has_permission`]; the caller becomes
//! an ordered list of SIDs, the [`LookupStrategy`] resolves the object's ACL
//! chain (from the cache or in batches from the store) and the
//! [`PermissionGrantingStrategy`] walks the entries. ACLs are changed through
//! [`MutableAclService`], which keeps the store and cache consistent and asks
//! the [`AclAuthorizationStrategy`] before every change.
//!
//! [`AclEngine`] wires all of it together:
//!
//! ```no_run
//! # async fn demo() -> objacl_core::Result<()> {
//! use std::sync::Arc;
//! use objacl_core::{AclConfig, Caller, ObjectIdentity, Permission, Sid};
//! use objacl_security::AclEngine;
//! use objacl_store::InMemoryAclStore;
//!
//! let engine = AclEngine::new(Arc::new(InMemoryAclStore::new()), AclConfig::default())?;
//! let alice = Caller::new("alice", ["ROLE_USER"])?;
//! let doc = ObjectIdentity::new("Document", 42)?;
//!
//! engine.service().create_acl(&alice, &doc).await?;
//! engine
//!     .service()
//!     .insert_ace(&alice, &doc, 0, Sid::principal("alice"), Permission::READ, true)
//!     .await?;
//! assert!(engine.evaluator().has_permission(&alice, &doc, "READ").await?);
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod authorization;
mod deadline;
pub mod engine;
pub mod evaluator;
pub mod granting;
pub mod lookup;
pub mod service;
pub mod sid_retrieval;

pub use audit::{
    AuditEvent, AuditSink, MemoryAuditSink, NoopAuditSink, TracingAuditSink, AUDIT_TARGET,
};
pub use authorization::{AclAuthorizationStrategy, ChangeType, DefaultAclAuthorizationStrategy};
pub use engine::{AclEngine, AclEngineBuilder};
pub use evaluator::PermissionEvaluator;
pub use granting::{Decision, DefaultPermissionGrantingStrategy, PermissionGrantingStrategy};
pub use lookup::{AclLookup, BasicLookupStrategy, LookupStrategy, ResolvedAcl};
pub use service::MutableAclService;
pub use sid_retrieval::{DefaultSidRetrievalStrategy, SidRetrievalStrategy};
