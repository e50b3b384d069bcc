//! Bitmask permissions and permission naming

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::ops::{BitAnd, BitOr, BitOrAssign};

const PATTERN_WIDTH: u32 = 32;

/// A 32-bit permission mask.
///
/// Bits 0..=4 are the built-in permissions; the remaining bits are reserved
/// for application-defined permissions registered with [`PermissionFactory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(u32);

impl Permission {
    pub const READ: Permission = Permission(1);
    pub const WRITE: Permission = Permission(1 << 1);
    pub const CREATE: Permission = Permission(1 << 2);
    pub const DELETE: Permission = Permission(1 << 3);
    pub const ADMINISTRATION: Permission = Permission(1 << 4);

    pub const fn from_mask(mask: u32) -> Self {
        Permission(mask)
    }

    pub const fn mask(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every bit of `other` is set in `self`
    pub const fn contains(self, other: Permission) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Permission) -> bool {
        self.0 & other.0 != 0
    }

    /// Single-bit permissions in ascending bit order
    pub fn bits(self) -> impl Iterator<Item = Permission> {
        (0..PATTERN_WIDTH)
            .map(|bit| 1u32 << bit)
            .filter(move |bit| self.0 & bit != 0)
            .map(Permission)
    }

    /// 32-character rendering, most significant bit first: `.` for clear bits,
    /// the permission code for set bits (`*` for reserved bits).
    pub fn pattern(self) -> String {
        (0..PATTERN_WIDTH)
            .rev()
            .map(|bit| {
                if self.0 & (1 << bit) == 0 {
                    '.'
                } else {
                    Self::code(bit)
                }
            })
            .collect()
    }

    fn code(bit: u32) -> char {
        match bit {
            0 => 'R',
            1 => 'W',
            2 => 'C',
            3 => 'D',
            4 => 'A',
            _ => '*',
        }
    }
}

impl BitOr for Permission {
    type Output = Permission;

    fn bitor(self, rhs: Self) -> Self::Output {
        Permission(self.0 | rhs.0)
    }
}

impl BitOrAssign for Permission {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Permission {
    type Output = Permission;

    fn bitand(self, rhs: Self) -> Self::Output {
        Permission(self.0 & rhs.0)
    }
}

impl Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.pattern(), self.0)
    }
}

/// A requested permission, given either as a mask or by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionRef {
    Mask(Permission),
    Name(String),
}

impl PermissionRef {
    /// Resolve to a non-empty mask
    pub fn resolve(&self, factory: &PermissionFactory) -> Result<Permission> {
        let permission = match self {
            PermissionRef::Mask(permission) => *permission,
            PermissionRef::Name(name) => factory.parse(name)?,
        };
        if permission.is_empty() {
            return Err(Error::invalid_permission(
                permission.to_string(),
                "empty permission mask",
            ));
        }
        Ok(permission)
    }
}

impl From<Permission> for PermissionRef {
    fn from(permission: Permission) -> Self {
        PermissionRef::Mask(permission)
    }
}

impl From<&str> for PermissionRef {
    fn from(name: &str) -> Self {
        PermissionRef::Name(name.to_string())
    }
}

impl From<String> for PermissionRef {
    fn from(name: String) -> Self {
        PermissionRef::Name(name)
    }
}

/// Maps permission names to masks.
///
/// Names are case-insensitive. Combined names use `|`, e.g. `READ|WRITE`.
#[derive(Debug, Clone)]
pub struct PermissionFactory {
    by_name: HashMap<String, Permission>,
}

impl PermissionFactory {
    /// Factory with the built-in permissions registered
    pub fn new() -> Self {
        let by_name = [
            ("READ", Permission::READ),
            ("WRITE", Permission::WRITE),
            ("CREATE", Permission::CREATE),
            ("DELETE", Permission::DELETE),
            ("ADMINISTRATION", Permission::ADMINISTRATION),
        ]
        .into_iter()
        .map(|(name, permission)| (name.to_string(), permission))
        .collect();
        Self { by_name }
    }

    /// Register an application-defined single-bit permission
    pub fn register(&mut self, name: &str, permission: Permission) -> Result<()> {
        let key = name.trim().to_ascii_uppercase();
        if key.is_empty() || key.contains('|') {
            return Err(Error::invalid_permission(name, "invalid permission name"));
        }
        if permission.mask().count_ones() != 1 {
            return Err(Error::invalid_permission(
                name,
                "a registered permission must have exactly one bit set",
            ));
        }
        if self.by_name.contains_key(&key) {
            return Err(Error::invalid_permission(name, "name already registered"));
        }
        if let Some(existing) = self.name_of(permission) {
            return Err(Error::invalid_permission(
                name,
                format!("bit already registered as '{existing}'"),
            ));
        }
        self.by_name.insert(key, permission);
        Ok(())
    }

    /// Parse a name or a `|`-separated list of names
    pub fn parse(&self, names: &str) -> Result<Permission> {
        let mut permission = Permission::default();
        for name in names.split('|') {
            let key = name.trim().to_ascii_uppercase();
            let bit = self.by_name.get(&key).ok_or_else(|| {
                Error::invalid_permission(names, format!("unknown permission '{}'", name.trim()))
            })?;
            permission |= *bit;
        }
        Ok(permission)
    }

    pub fn name_of(&self, permission: Permission) -> Option<&str> {
        self.by_name
            .iter()
            .find(|(_, p)| **p == permission)
            .map(|(name, _)| name.as_str())
    }
}

impl Default for PermissionFactory {
    fn default() -> Self {
        Self::new()
    }
}
