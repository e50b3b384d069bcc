//! Core domain types, errors, and configuration for the `objacl` engine.
//!
//! ## Key Components
//!
//! - **`errors`**: the `Error` enum, its `ErrorKind` classification and the
//!   `Result` alias shared by every crate in the workspace.
//! - **`types`**: object identities, security identities, permissions and
//!   the ACL/ACE data model with its ordering invariants.
//! - **`config`**: `AclConfig` and its loader (defaults, JSON file,
//!   environment variables).

pub mod config;
pub mod errors;
pub mod types;

pub use self::{
    config::{AclConfig, AclConfigBuilder, AclConfigLoader, ConfigSource, LoadedConfig},
    errors::{Error, ErrorKind, Result, ResultExt},
    types::*,
};
