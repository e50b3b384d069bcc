//! Audit events for ACE decisions
//!
//! The granting strategy emits one [`AuditEvent`] whenever the deciding ACE
//! carries the matching audit flag. Where the event goes is up to the
//! [`AuditSink`].

use chrono::{DateTime, Utc};
use objacl_core::{ObjectIdentity, Permission, Sid};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// Tracing target used by [`TracingAuditSink`]
pub const AUDIT_TARGET: &str = "objacl::audit";

/// A single audited grant or deny
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// SID of the deciding ACE
    pub sid: Sid,
    /// Object the permission was requested for
    pub object_identity: ObjectIdentity,
    /// ACL holding the deciding ACE, an ancestor when inherited
    pub decided_by: ObjectIdentity,
    /// The single permission bit the ACE decided
    pub permission_mask: u32,
    pub granted: bool,
    pub ace_order: usize,
}

impl AuditEvent {
    pub fn new(
        sid: Sid,
        object_identity: ObjectIdentity,
        decided_by: ObjectIdentity,
        permission: Permission,
        granted: bool,
        ace_order: usize,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            sid,
            object_identity,
            decided_by,
            permission_mask: permission.mask(),
            granted,
            ace_order,
        }
    }
}

/// Destination for audit events
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent);
}

/// Emits each event as a structured `tracing` event on [`AUDIT_TARGET`]
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) {
        let outcome = if event.granted { "GRANTED" } else { "DENIED" };
        info!(
            target: AUDIT_TARGET,
            event_id = %event.event_id,
            sid = %event.sid,
            object_identity = %event.object_identity,
            decided_by = %event.decided_by,
            permission = %Permission::from_mask(event.permission_mask).pattern(),
            mask = event.permission_mask,
            ace_order = event.ace_order,
            "{outcome} due to ACE"
        );
    }
}

/// Keeps events in memory, for tests and in-process inspection
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &AuditEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}
