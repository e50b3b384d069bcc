//! Shared helpers for the engine integration tests
#![allow(dead_code)]

use objacl_core::{AclConfig, Caller, ObjectIdentity};
use objacl_security::{AclEngine, MemoryAuditSink};
use objacl_store::InMemoryAclStore;
use std::sync::Arc;

/// Engine over an in-memory store, with audit events captured in memory
pub struct TestEngine {
    pub engine: AclEngine,
    pub store: Arc<InMemoryAclStore>,
    pub audit: Arc<MemoryAuditSink>,
}

impl TestEngine {
    pub fn new() -> Self {
        Self::with(InMemoryAclStore::new(), AclConfig::default())
    }

    pub fn with(store: InMemoryAclStore, config: AclConfig) -> Self {
        let store = Arc::new(store);
        let audit = Arc::new(MemoryAuditSink::new());
        let engine = AclEngine::builder(store.clone())
            .with_config(config)
            .with_audit_sink(audit.clone())
            .build()
            .expect("engine builds");
        Self {
            engine,
            store,
            audit,
        }
    }

    /// A second engine over the same store with a cold cache
    pub fn fresh_view(&self) -> AclEngine {
        AclEngine::new(self.store.clone(), self.engine.config().clone()).expect("engine builds")
    }
}

pub fn caller(principal: &str, authorities: &[&str]) -> Caller {
    Caller::new(principal, authorities.iter().copied()).expect("valid caller")
}

pub fn admin() -> Caller {
    caller("root", &["ROLE_ADMIN"])
}

pub fn oid(object_type: &str, id: i64) -> ObjectIdentity {
    ObjectIdentity::new(object_type, id).expect("valid identity")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("objacl=debug")
        .try_init();
}
