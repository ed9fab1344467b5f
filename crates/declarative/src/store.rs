//! Definition store: discovers declaration files and merges declarations
//!
//! Declaration files are TOML documents holding `[[group]]` and `[[user]]`
//! arrays. Files are read in lexical path order; for every identity the
//! declarations are merged in that order, later files overriding earlier
//! ones field by field.

use crate::entity::{Definition, Entity};
use crate::error::{Error, Result};
use crate::group::GroupDefinition;
use crate::identity::{EntityIdentity, EntityKind};
use crate::user::UserDefinition;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One entry from one declaration file
#[derive(Debug, Clone)]
pub struct Declaration {
    pub source: PathBuf,
    pub identity: EntityIdentity,
    /// Parsed definition, or why the entry could not be parsed
    pub parsed: std::result::Result<Definition, String>,
}

impl Declaration {
    pub fn new(source: impl Into<PathBuf>, definition: Definition) -> Self {
        Self {
            source: source.into(),
            identity: definition.identity(),
            parsed: Ok(definition),
        }
    }
}

/// All declarations found for one run
#[derive(Debug, Default)]
pub struct DefinitionStore {
    declarations: Vec<Declaration>,
    /// Problems that could not be tied to a single identity
    errors: Vec<Error>,
}

impl DefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.toml` file below `dir`; a missing directory is empty
    pub fn load(dir: &Path) -> Result<Self> {
        let mut store = Self::new();

        if !dir.exists() {
            log::debug!("Definitions directory {} does not exist", dir.display());
            return Ok(store);
        }

        let files = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {e}");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "toml"));

        for entry in files {
            let path = entry.path();
            match fs::read_to_string(path) {
                Ok(content) => store.add_file(path, &content),
                Err(e) => store.errors.push(Error::io(path, e)),
            }
        }

        log::debug!(
            "Loaded {} declarations from {}",
            store.declarations.len(),
            dir.display()
        );
        Ok(store)
    }

    /// Parse one declaration file and append its entries
    pub fn add_file(&mut self, path: &Path, content: &str) {
        let parse_error = |message: String| Error::Parse {
            path: path.to_path_buf(),
            message,
        };

        let document: toml::Table = match toml::from_str(content) {
            Ok(document) => document,
            Err(e) => {
                self.errors.push(parse_error(e.to_string()));
                return;
            }
        };

        for (key, value) in document {
            let kind: EntityKind = match key.parse() {
                Ok(kind) => kind,
                Err(_) => {
                    self.errors
                        .push(parse_error(format!("unknown entity type '{key}'")));
                    continue;
                }
            };
            let Some(entries) = value.as_array() else {
                self.errors
                    .push(parse_error(format!("'{key}' must be an array of tables ([[{key}]])")));
                continue;
            };

            for (index, entry) in entries.iter().enumerate() {
                let name = entry
                    .get("name")
                    .and_then(toml::Value::as_str)
                    .filter(|name| !name.is_empty());
                let Some(name) = name else {
                    self.errors.push(parse_error(format!(
                        "{key} #{} is missing a name",
                        index + 1
                    )));
                    continue;
                };

                self.declarations.push(Declaration {
                    source: path.to_path_buf(),
                    identity: EntityIdentity::new(kind, name),
                    parsed: parse_definition(kind, entry.clone()),
                });
            }
        }
    }

    pub fn push(&mut self, declaration: Declaration) {
        self.declarations.push(declaration);
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    /// Whether `identity` has at least one declaration
    pub fn declares(&self, identity: &EntityIdentity) -> bool {
        self.declarations.iter().any(|d| &d.identity == identity)
    }

    /// One merged entity per declared identity, in first-discovery order
    pub fn entities(&self) -> Vec<Entity> {
        let mut identities: Vec<&EntityIdentity> = Vec::new();
        for declaration in &self.declarations {
            if !identities.contains(&&declaration.identity) {
                identities.push(&declaration.identity);
            }
        }

        identities
            .into_iter()
            .map(|identity| {
                let declarations: Vec<&Declaration> = self
                    .declarations
                    .iter()
                    .filter(|d| &d.identity == identity)
                    .collect();
                let sources = declarations.iter().map(|d| d.source.clone()).collect();

                match merge_declarations(identity, &declarations) {
                    Ok(definition) => Entity::declared(definition, sources),
                    Err(e) => Entity::invalid(identity.clone(), sources, e.to_string()),
                }
            })
            .collect()
    }
}

fn parse_definition(kind: EntityKind, entry: toml::Value) -> std::result::Result<Definition, String> {
    match kind {
        EntityKind::Group => entry
            .try_into::<GroupDefinition>()
            .map(Definition::Group)
            .map_err(|e| e.to_string()),
        EntityKind::User => entry
            .try_into::<UserDefinition>()
            .map(Definition::User)
            .map_err(|e| e.to_string()),
    }
}

/// Merge the declarations of one identity, in order
///
/// Fails if any declaration did not parse, or does not describe `identity`.
pub fn merge_declarations(identity: &EntityIdentity, declarations: &[&Declaration]) -> Result<Definition> {
    let conflict = |message: String| Error::MergeConflict {
        identity: identity.to_string(),
        message,
    };

    let mut merged: Option<Definition> = None;
    for declaration in declarations {
        let definition = declaration
            .parsed
            .as_ref()
            .map_err(|e| conflict(format!("{}: {e}", declaration.source.display())))?;

        if definition.identity() != *identity {
            return Err(conflict(format!(
                "{} declares {} instead",
                declaration.source.display(),
                definition.identity()
            )));
        }

        match merged.as_mut() {
            Some(merged) => merged.merge_from(definition)?,
            None => merged = Some(definition.clone()),
        }
    }

    merged.ok_or_else(|| conflict("no declarations".to_string()))
}
