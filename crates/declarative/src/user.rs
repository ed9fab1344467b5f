//! UNIX users, as registered in `/etc/passwd` (and `/etc/group` for
//! supplementary group membership)

use crate::context::SystemDatabase;
use crate::diff::{DiffBuilder, FieldDiff};
use crate::entity::{EntityDefinition, MutationCommand};
use crate::error::{Error, Result};
use crate::getent;
use crate::group::GROUP_FIELDS;
use crate::identity::EntityKind;
use serde::{Deserialize, Serialize};

/// Minimum number of fields in a `/etc/passwd` record
pub const PASSWD_FIELDS: usize = 7;

/// A UNIX user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserDefinition {
    /// Login name (first field in `/etc/passwd`)
    pub name: String,

    /// UID, or 0 to let `useradd` choose one
    #[serde(default, skip_serializing_if = "is_zero")]
    pub uid: u32,

    /// GECOS comment (usually the full name)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,

    /// Home directory
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub home: String,

    /// Primary group, by name or by numeric GID
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,

    /// Supplementary group names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,

    /// Login shell
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub shell: String,

    /// System user; only influences UID selection at creation time
    #[serde(default, skip_serializing)]
    pub system: bool,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

fn override_text(target: &mut String, later: &str) {
    if !later.is_empty() {
        *target = later.to_string();
    }
}

impl UserDefinition {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Arguments for the attributes named in `fields`
    fn attribute_args(&self, fields: &[&str]) -> Vec<String> {
        let mut args = Vec::new();
        for field in fields {
            match *field {
                "UID" if self.uid > 0 => {
                    args.extend(["--uid".to_string(), self.uid.to_string()]);
                }
                "comment" if !self.comment.is_empty() => {
                    args.extend(["--comment".to_string(), self.comment.clone()]);
                }
                "home" if !self.home.is_empty() => {
                    args.extend(["--home".to_string(), self.home.clone()]);
                }
                "group" if !self.group.is_empty() => {
                    args.extend(["--gid".to_string(), self.group.clone()]);
                }
                "groups" if !self.groups.is_empty() => {
                    args.extend(["--groups".to_string(), self.groups.join(",")]);
                }
                "shell" if !self.shell.is_empty() => {
                    args.extend(["--shell".to_string(), self.shell.clone()]);
                }
                _ => {}
            }
        }
        args
    }

    /// Rebuild a definition from a `/etc/passwd` record
    ///
    /// The primary group is resolved to its name unless `numeric_group` is
    /// set, in which case the GID is kept as is.
    fn from_record(
        fields: &[String],
        database: &SystemDatabase,
        numeric_group: bool,
    ) -> Result<Self> {
        let corrupt = |message: String| Error::CorruptRecord {
            path: database.passwd.clone(),
            message,
        };

        if fields.len() < PASSWD_FIELDS {
            return Err(corrupt(format!(
                "user '{}' has {} fields, expected {}",
                fields[0],
                fields.len(),
                PASSWD_FIELDS
            )));
        }

        let name = fields[0].clone();
        let uid = fields[2]
            .parse()
            .map_err(|_| corrupt(format!("user '{name}' has non-numeric UID '{}'", fields[2])))?;
        let gid: u32 = fields[3]
            .parse()
            .map_err(|_| corrupt(format!("user '{name}' has non-numeric GID '{}'", fields[3])))?;

        let gid_text = gid.to_string();
        let group = if numeric_group {
            gid_text
        } else {
            getent::lookup(&database.group, |f| f.len() > 2 && f[2] == gid_text)?
                .map(|f| f[0].clone())
                .unwrap_or(gid_text)
        };

        let groups = getent::scan(&database.group, |f| {
            f.len() >= GROUP_FIELDS && f[3].split(',').any(|member| member == name)
        })?
        .into_iter()
        .map(|f| f[0].clone())
        .collect();

        Ok(Self {
            uid,
            comment: fields[4].clone(),
            home: fields[5].clone(),
            group,
            groups,
            shell: fields[6].clone(),
            system: false,
            name,
        })
    }
}

impl EntityDefinition for UserDefinition {
    const KIND: EntityKind = EntityKind::User;

    fn name(&self) -> &str {
        &self.name
    }

    fn attributes(&self) -> String {
        let mut attrs = Vec::new();
        if self.system {
            attrs.push("type: system".to_string());
        }
        if self.uid > 0 {
            attrs.push(format!("UID: {}", self.uid));
        }
        if !self.home.is_empty() {
            attrs.push(format!("home: {}", self.home));
        }
        if !self.group.is_empty() {
            attrs.push(format!("login group: {}", self.group));
        }
        if !self.groups.is_empty() {
            attrs.push(format!("groups: {}", self.groups.join(",")));
        }
        if !self.shell.is_empty() {
            attrs.push(format!("login shell: {}", self.shell));
        }
        if !self.comment.is_empty() {
            attrs.push(format!("comment: {}", self.comment));
        }
        attrs.join(", ")
    }

    fn merge_from(&mut self, later: &Self) {
        if later.uid > 0 {
            self.uid = later.uid;
        }
        override_text(&mut self.comment, &later.comment);
        override_text(&mut self.home, &later.home);
        override_text(&mut self.group, &later.group);
        override_text(&mut self.shell, &later.shell);
        if !later.groups.is_empty() {
            self.groups = later.groups.clone();
        }
        self.system |= later.system;
    }

    fn diff(&self, provisioned: &Self) -> Vec<FieldDiff> {
        DiffBuilder::new()
            .id("UID", provisioned.uid, self.uid)
            .text("home", &provisioned.home, &self.home)
            .text("group", &provisioned.group, &self.group)
            .set("groups", &provisioned.groups, &self.groups)
            .text("shell", &provisioned.shell, &self.shell)
            .text("comment", &provisioned.comment, &self.comment)
            .build()
    }

    fn create_command(&self) -> MutationCommand {
        let mut args = Vec::new();
        if self.system {
            args.push("--system".to_string());
        }
        args.extend(self.attribute_args(&["UID", "comment", "home", "group", "groups", "shell"]));
        args.push(self.name.clone());
        MutationCommand::new("useradd", args)
    }

    fn modify_command(&self, diffs: &[FieldDiff]) -> MutationCommand {
        let fields: Vec<&str> = diffs.iter().map(|d| d.field.as_str()).collect();
        let mut args = self.attribute_args(&fields);
        args.push(self.name.clone());
        MutationCommand::new("usermod", args)
    }

    fn delete_command(&self) -> MutationCommand {
        MutationCommand::new("userdel", vec![self.name.clone()])
    }

    fn provisioned_state(&self, database: &SystemDatabase) -> Result<Option<Self>> {
        // compare like with like when the declaration names its group by GID
        let numeric_group = self.group.parse::<u32>().is_ok();
        getent::lookup(&database.passwd, |fields| fields[0] == self.name)?
            .map(|fields| Self::from_record(&fields, database, numeric_group))
            .transpose()
    }
}
