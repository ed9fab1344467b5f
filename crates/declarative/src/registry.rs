//! Registry of entities under management
//!
//! The registry remembers which entities this tool created. It is the only
//! way to tell an orphan (created by us, no longer declared) apart from an
//! entity that was never ours. Every successful create or delete is
//! persisted immediately so that a crash leaves at most one entity out of
//! sync.

use crate::error::{Error, Result};
use crate::identity::{EntityIdentity, EntityKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk layout of the registry file
#[derive(Debug, Serialize, Deserialize)]
struct RegistryFile {
    /// Last time the registry was written
    last_updated: DateTime<Utc>,

    /// Managed entity names, keyed by kind tag
    #[serde(default)]
    entities: BTreeMap<String, BTreeSet<String>>,
}

/// Set of entity identities believed to be managed by this tool
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entities: BTreeMap<EntityKind, BTreeSet<String>>,
    /// Backing file; `None` keeps the registry in memory only
    path: Option<PathBuf>,
}

impl Registry {
    /// Registry that is never persisted
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the registry from `path`; a missing file is an empty registry
    pub fn load(path: &Path) -> Result<Self> {
        let mut registry = Self {
            entities: BTreeMap::new(),
            path: Some(path.to_path_buf()),
        };

        if !path.exists() {
            log::debug!("Registry {} does not exist, starting empty", path.display());
            return Ok(registry);
        }

        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let file: RegistryFile = toml::from_str(&content).map_err(|e| Error::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        for (kind, names) in file.entities {
            let kind: EntityKind = kind.parse()?;
            registry.entities.entry(kind).or_default().extend(names);
        }

        log::debug!(
            "Loaded {} managed entities from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Rewrite the whole registry file
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        }

        let file = RegistryFile {
            last_updated: Utc::now(),
            entities: self
                .entities
                .iter()
                .filter(|(_, names)| !names.is_empty())
                .map(|(kind, names)| (kind.as_str().to_string(), names.clone()))
                .collect(),
        };
        let content = toml::to_string_pretty(&file).map_err(|e| Error::Parse {
            path: path.clone(),
            message: e.to_string(),
        })?;
        fs::write(path, content).map_err(|e| Error::io(path, e))?;

        log::debug!("Saved registry to {}", path.display());
        Ok(())
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn contains(&self, identity: &EntityIdentity) -> bool {
        self.entities
            .get(&identity.kind)
            .is_some_and(|names| names.contains(&identity.name))
    }

    pub fn add(&mut self, identity: &EntityIdentity) {
        self.entities
            .entry(identity.kind)
            .or_default()
            .insert(identity.name.clone());
    }

    pub fn remove(&mut self, identity: &EntityIdentity) {
        if let Some(names) = self.entities.get_mut(&identity.kind) {
            names.remove(&identity.name);
        }
    }

    /// All managed identities, sorted by kind then name
    pub fn identities(&self) -> Vec<EntityIdentity> {
        self.entities
            .iter()
            .flat_map(|(kind, names)| names.iter().map(|n| EntityIdentity::new(*kind, n.clone())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entities.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
