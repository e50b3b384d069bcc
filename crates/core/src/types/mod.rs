//! Domain types for object-level access control.
//!
//! ## Organization
//!
//! - **`identity`**: `ObjectIdentity`, the key of a secured domain object
//! - **`sid`**: security identities and the `Caller` they are derived from
//! - **`permission`**: bitmask permissions and name resolution
//! - **`acl`**: access control entries and lists

pub mod acl;
pub mod identity;
pub mod permission;
pub mod sid;

pub use acl::{AccessControlEntry, Acl};
pub use identity::{Identifier, ObjectIdentity};
pub use permission::{Permission, PermissionFactory, PermissionRef};
pub use sid::{Caller, Sid};
