//! Persistence boundary for objacl
//!
//! The engine talks to storage only through the [`AclStore`] trait, in terms
//! of [`AclRow`]s. Schema and driver concerns belong to implementations; the
//! bundled [`InMemoryAclStore`] is a complete reference implementation.

pub mod memory;
pub mod rows;
pub mod traits;

pub use memory::InMemoryAclStore;
pub use rows::{AceRow, AclRow};
pub use traits::AclStore;
