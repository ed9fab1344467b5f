//! UNIX groups, as registered in `/etc/group`

use crate::context::SystemDatabase;
use crate::diff::{DiffBuilder, FieldDiff};
use crate::entity::{EntityDefinition, MutationCommand};
use crate::error::{Error, Result};
use crate::getent;
use crate::identity::EntityKind;
use serde::{Deserialize, Serialize};

/// Minimum number of fields in a `/etc/group` record
pub const GROUP_FIELDS: usize = 4;

/// A UNIX group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupDefinition {
    /// Group name (first field in `/etc/group`)
    pub name: String,

    /// GID, or 0 to let `groupadd` choose one
    #[serde(default, skip_serializing_if = "is_zero")]
    pub gid: u32,

    /// System group; only influences GID selection at creation time
    #[serde(default, skip_serializing)]
    pub system: bool,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

impl GroupDefinition {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Rebuild a definition from the fields of a `/etc/group` record
    fn from_record(fields: &[String], database: &SystemDatabase) -> Result<Self> {
        let corrupt = |message: String| Error::CorruptRecord {
            path: database.group.clone(),
            message,
        };

        if fields.len() < GROUP_FIELDS {
            return Err(corrupt(format!(
                "group '{}' has {} fields, expected {}",
                fields[0],
                fields.len(),
                GROUP_FIELDS
            )));
        }

        let gid = fields[2]
            .parse()
            .map_err(|_| corrupt(format!("group '{}' has non-numeric GID '{}'", fields[0], fields[2])))?;

        Ok(Self {
            name: fields[0].clone(),
            gid,
            system: false,
        })
    }
}

impl EntityDefinition for GroupDefinition {
    const KIND: EntityKind = EntityKind::Group;

    fn name(&self) -> &str {
        &self.name
    }

    fn attributes(&self) -> String {
        let mut attrs = Vec::new();
        if self.system {
            attrs.push("type: system".to_string());
        }
        if self.gid > 0 {
            attrs.push(format!("GID: {}", self.gid));
        }
        attrs.join(", ")
    }

    fn merge_from(&mut self, later: &Self) {
        if later.gid > 0 {
            self.gid = later.gid;
        }
        self.system |= later.system;
    }

    fn diff(&self, provisioned: &Self) -> Vec<FieldDiff> {
        DiffBuilder::new()
            .id("GID", provisioned.gid, self.gid)
            .build()
    }

    fn create_command(&self) -> MutationCommand {
        let mut args = Vec::new();
        if self.system {
            args.push("--system".to_string());
        }
        if self.gid > 0 {
            args.extend(["--gid".to_string(), self.gid.to_string()]);
        }
        args.push(self.name.clone());
        MutationCommand::new("groupadd", args)
    }

    fn modify_command(&self, diffs: &[FieldDiff]) -> MutationCommand {
        let mut args = Vec::new();
        for diff in diffs {
            if diff.field == "GID" {
                args.extend(["--gid".to_string(), self.gid.to_string()]);
            }
        }
        args.push(self.name.clone());
        MutationCommand::new("groupmod", args)
    }

    fn delete_command(&self) -> MutationCommand {
        MutationCommand::new("groupdel", vec![self.name.clone()])
    }

    fn provisioned_state(&self, database: &SystemDatabase) -> Result<Option<Self>> {
        getent::lookup(&database.group, |fields| fields[0] == self.name)?
            .map(|fields| Self::from_record(&fields, database))
            .transpose()
    }
}
