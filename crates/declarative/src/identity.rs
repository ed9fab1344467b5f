//! Entity identities
//!
//! An identity is the stable key of an entity: its kind plus its name,
//! written as `kind:name` (e.g. `group:wheel`).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of entity kinds this crate manages.
///
/// Variant order is the apply precedence: groups must exist before the
/// users that reference them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Group,
    User,
}

impl EntityKind {
    /// All kinds in apply precedence order
    pub const ALL: [EntityKind; 2] = [EntityKind::Group, EntityKind::User];

    /// Tag used in identities, registry keys and declaration tables
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::User => "user",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "group" | "groups" => Ok(Self::Group),
            "user" | "users" => Ok(Self::User),
            other => Err(Error::InvalidIdentity(format!("unknown entity kind '{other}'"))),
        }
    }
}

/// Stable key of an entity
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityIdentity {
    pub kind: EntityKind,
    pub name: String,
}

impl EntityIdentity {
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(EntityKind::Group, name)
    }

    pub fn user(name: impl Into<String>) -> Self {
        Self::new(EntityKind::User, name)
    }
}

impl fmt::Display for EntityIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

impl FromStr for EntityIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, name) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidIdentity(format!("'{s}' is not of the form kind:name")))?;
        if name.is_empty() {
            return Err(Error::InvalidIdentity(format!("'{s}' has an empty name")));
        }
        Ok(Self::new(kind.parse()?, name))
    }
}

/// Selects entities by kind, or by exact identity
///
/// Accepted forms: `group`, `users`, `group:wheel`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Kind(EntityKind),
    Identity(EntityIdentity),
}

impl Selector {
    pub fn matches(&self, identity: &EntityIdentity) -> bool {
        match self {
            Self::Kind(kind) => identity.kind == *kind,
            Self::Identity(id) => id == identity,
        }
    }

    /// Whether any of `selectors` matches; an empty list matches everything
    pub fn any_matches(selectors: &[Selector], identity: &EntityIdentity) -> bool {
        selectors.is_empty() || selectors.iter().any(|s| s.matches(identity))
    }
}

impl FromStr for Selector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.contains(':') {
            Ok(Self::Identity(s.parse()?))
        } else {
            Ok(Self::Kind(s.parse()?))
        }
    }
}
