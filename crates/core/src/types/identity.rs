//! Object identities for secured domain objects

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

/// Identifier of a domain object instance, either numeric or textual
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Int(i64),
    Str(String),
}

impl Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Int(id) => write!(f, "{id}"),
            Identifier::Str(id) => f.write_str(id),
        }
    }
}

impl From<i64> for Identifier {
    fn from(id: i64) -> Self {
        Identifier::Int(id)
    }
}

impl From<i32> for Identifier {
    fn from(id: i32) -> Self {
        Identifier::Int(i64::from(id))
    }
}

impl From<u32> for Identifier {
    fn from(id: u32) -> Self {
        Identifier::Int(i64::from(id))
    }
}

impl From<&str> for Identifier {
    fn from(id: &str) -> Self {
        Identifier::Str(id.to_string())
    }
}

impl From<String> for Identifier {
    fn from(id: String) -> Self {
        Identifier::Str(id)
    }
}

/// Identifies exactly one secured domain-object instance.
///
/// Used as the key in both the ACL cache and the store. Rendered as
/// `Type#identifier`, e.g. `Document#42`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectIdentity {
    object_type: String,
    identifier: Identifier,
}

impl ObjectIdentity {
    /// Create a new identity, rejecting a blank type or a blank textual id
    pub fn new(object_type: impl Into<String>, identifier: impl Into<Identifier>) -> Result<Self> {
        let object_type = object_type.into();
        let identifier = identifier.into();
        if object_type.trim().is_empty() {
            return Err(Error::invalid_input("object type must not be empty"));
        }
        if let Identifier::Str(id) = &identifier {
            if id.trim().is_empty() {
                return Err(Error::invalid_input(format!(
                    "identifier of '{object_type}' must not be empty"
                )));
            }
        }
        Ok(Self {
            object_type,
            identifier,
        })
    }

    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }
}

impl Display for ObjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.object_type, self.identifier)
    }
}

impl FromStr for ObjectIdentity {
    type Err = Error;

    /// Parse `Type#identifier`; identifiers that parse as `i64` become numeric
    fn from_str(s: &str) -> Result<Self> {
        let (object_type, id) = s
            .split_once('#')
            .ok_or_else(|| Error::invalid_input(format!("'{s}' is not of the form Type#id")))?;
        match id.parse::<i64>() {
            Ok(n) => Self::new(object_type, n),
            Err(_) => Self::new(object_type, id),
        }
    }
}
