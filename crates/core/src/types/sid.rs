//! Security identities and callers

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// A principal or authority that an ACE grants to or denies.
///
/// Equality is structural: `Principal("x")` and `Authority("x")` are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Sid {
    Principal(String),
    Authority(String),
}

impl Sid {
    pub fn principal(name: impl Into<String>) -> Self {
        Sid::Principal(name.into())
    }

    pub fn authority(name: impl Into<String>) -> Self {
        Sid::Authority(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Sid::Principal(name) | Sid::Authority(name) => name,
        }
    }

    pub fn is_principal(&self) -> bool {
        matches!(self, Sid::Principal(_))
    }
}

impl Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sid::Principal(name) => write!(f, "principal:{name}"),
            Sid::Authority(name) => write!(f, "authority:{name}"),
        }
    }
}

/// The authenticated party asking for a decision or changing an ACL.
///
/// Supplied by the surrounding authentication layer; how the identities were
/// established is of no concern here. Authority order is preserved because
/// evaluation is first-match-wins across SIDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    principal: String,
    authorities: Vec<String>,
}

impl Caller {
    /// Create a caller from a principal name and its authorities
    pub fn new<I, S>(principal: impl Into<String>, authorities: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let principal = principal.into();
        if principal.trim().is_empty() {
            return Err(Error::invalid_caller("principal name must not be empty"));
        }
        let authorities = authorities
            .into_iter()
            .map(Into::into)
            .filter(|a: &String| !a.trim().is_empty())
            .collect();
        Ok(Self {
            principal,
            authorities,
        })
    }

    /// Create a caller from an ordered identity list: principal first, then
    /// authorities.
    pub fn from_identities<I, S>(identities: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut iter = identities.into_iter().map(Into::into);
        let principal = iter
            .next()
            .ok_or_else(|| Error::invalid_caller("identity list is empty"))?;
        Self::new(principal, iter)
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub fn authorities(&self) -> &[String] {
        &self.authorities
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }

    pub fn principal_sid(&self) -> Sid {
        Sid::principal(self.principal.clone())
    }
}
