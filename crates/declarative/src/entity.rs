//! Entity definitions and the reconciliation-time entity aggregate
//!
//! Entity kinds form a closed set: each kind implements [`EntityDefinition`]
//! and gets a variant in [`Definition`]. Adding a kind means adding a
//! variant, never a new layer of indirection.

use crate::context::SystemDatabase;
use crate::diff::FieldDiff;
use crate::error::{Error, Result};
use crate::group::GroupDefinition;
use crate::identity::{EntityIdentity, EntityKind};
use crate::user::UserDefinition;
use serde::Serialize;
use std::path::PathBuf;

/// An OS-level command that mutates the identity database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationCommand {
    pub program: &'static str,
    pub args: Vec<String>,
}

impl MutationCommand {
    pub fn new(program: &'static str, args: Vec<String>) -> Self {
        Self { program, args }
    }
}

/// Capabilities every entity kind provides
pub trait EntityDefinition: Sized + Clone + Serialize {
    const KIND: EntityKind;

    /// Name part of the identity
    fn name(&self) -> &str;

    fn identity(&self) -> EntityIdentity {
        EntityIdentity::new(Self::KIND, self.name())
    }

    /// Human-readable summary of the explicitly declared attributes
    fn attributes(&self) -> String;

    /// Overlay every explicitly set field of `later` onto `self`
    fn merge_from(&mut self, later: &Self);

    /// Differences on mutable attributes, `self` being the declaration
    fn diff(&self, provisioned: &Self) -> Vec<FieldDiff>;

    /// Command that creates the entity
    fn create_command(&self) -> MutationCommand;

    /// Command that changes only the diverged attributes
    fn modify_command(&self, diffs: &[FieldDiff]) -> MutationCommand;

    /// Command that deletes the entity
    fn delete_command(&self) -> MutationCommand;

    /// Read the entity from the OS database; `None` if it does not exist
    fn provisioned_state(&self, database: &SystemDatabase) -> Result<Option<Self>>;
}

/// A definition of any entity kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Definition {
    Group(GroupDefinition),
    User(UserDefinition),
}

macro_rules! dispatch {
    ($self:expr, $def:ident => $body:expr) => {
        match $self {
            Definition::Group($def) => $body,
            Definition::User($def) => $body,
        }
    };
}

impl Definition {
    /// Definition carrying nothing but the identity (used for orphans)
    pub fn bare(identity: &EntityIdentity) -> Self {
        match identity.kind {
            EntityKind::Group => Self::Group(GroupDefinition::named(&identity.name)),
            EntityKind::User => Self::User(UserDefinition::named(&identity.name)),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Group(_) => EntityKind::Group,
            Self::User(_) => EntityKind::User,
        }
    }

    pub fn name(&self) -> &str {
        dispatch!(self, def => def.name())
    }

    pub fn identity(&self) -> EntityIdentity {
        dispatch!(self, def => def.identity())
    }

    pub fn attributes(&self) -> String {
        dispatch!(self, def => def.attributes())
    }

    pub fn merge_from(&mut self, later: &Definition) -> Result<()> {
        match (self, later) {
            (Self::Group(def), Self::Group(later)) => def.merge_from(later),
            (Self::User(def), Self::User(later)) => def.merge_from(later),
            (def, later) => {
                return Err(Error::MergeConflict {
                    identity: def.identity().to_string(),
                    message: format!("cannot merge a {} definition into it", later.kind()),
                });
            }
        }
        Ok(())
    }

    pub fn diff(&self, provisioned: &Definition) -> Vec<FieldDiff> {
        match (self, provisioned) {
            (Self::Group(def), Self::Group(actual)) => def.diff(actual),
            (Self::User(def), Self::User(actual)) => def.diff(actual),
            _ => Vec::new(),
        }
    }

    pub fn create_command(&self) -> MutationCommand {
        dispatch!(self, def => def.create_command())
    }

    pub fn modify_command(&self, diffs: &[FieldDiff]) -> MutationCommand {
        dispatch!(self, def => def.modify_command(diffs))
    }

    pub fn delete_command(&self) -> MutationCommand {
        dispatch!(self, def => def.delete_command())
    }

    pub fn provisioned_state(&self, database: &SystemDatabase) -> Result<Option<Definition>> {
        Ok(match self {
            Self::Group(def) => def.provisioned_state(database)?.map(Self::Group),
            Self::User(def) => def.provisioned_state(database)?.map(Self::User),
        })
    }

    /// Comparable view: attributes that can be diffed, as TOML
    ///
    /// Creation-time hints such as `system` are left out.
    pub fn comparable_view(&self) -> String {
        let table = format!("[[{}]]\n", self.kind());
        match toml::to_string(self) {
            Ok(body) => table + &body,
            Err(e) => format!("{table}# cannot render: {e}\n"),
        }
    }
}

/// The aggregate reconciled in one run
#[derive(Debug, Clone)]
pub struct Entity {
    pub identity: EntityIdentity,
    /// Merged declaration, or a bare definition for orphans
    pub definition: Definition,
    /// Declaration files that contributed, in discovery order
    pub sources: Vec<PathBuf>,
    /// In the registry but no longer declared
    pub orphaned: bool,
    /// Why the declarations could not be used, if they could not
    pub invalid: Option<String>,
}

impl Entity {
    pub fn declared(definition: Definition, sources: Vec<PathBuf>) -> Self {
        Self {
            identity: definition.identity(),
            definition,
            sources,
            orphaned: false,
            invalid: None,
        }
    }

    pub fn orphan(identity: EntityIdentity) -> Self {
        Self {
            definition: Definition::bare(&identity),
            identity,
            sources: Vec::new(),
            orphaned: true,
            invalid: None,
        }
    }

    pub fn invalid(identity: EntityIdentity, sources: Vec<PathBuf>, error: String) -> Self {
        Self {
            definition: Definition::bare(&identity),
            identity,
            sources,
            orphaned: false,
            invalid: Some(error),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.invalid.is_none()
    }
}
