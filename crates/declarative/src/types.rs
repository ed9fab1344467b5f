//! Core types for entity reconciliation

use crate::diff::FieldDiff;
use crate::identity::EntityIdentity;
use serde::{Deserialize, Serialize};

/// Result of applying one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ApplyResult {
    /// Provisioned state already matches the declaration
    NoChange,
    /// Entity was created and registered
    Created,
    /// Entity was modified
    Modified,
    /// Orphaned entity was deleted and deregistered
    Removed,
    /// A change is pending but needs `--force`
    RequiresForce { reason: String },
    /// Declarations for the entity could not be merged or parsed
    Invalid { error: String },
    /// Apply failed
    Failed { error: String },
    /// Apply was skipped (dry run)
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result counts as a failure for the run's exit status
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::Failed { .. } | Self::Invalid { .. } | Self::RequiresForce { .. }
        )
    }

    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Created | Self::Modified | Self::Removed)
    }
}

/// What happened to one entity during a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityOutcome {
    pub identity: String,
    #[serde(flatten)]
    pub result: ApplyResult,
    /// Attribute differences found (fixed, or pending when not forced)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diffs: Vec<FieldDiff>,
    /// Operator instructions accompanying the result
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl EntityOutcome {
    pub fn new(identity: &EntityIdentity, result: ApplyResult) -> Self {
        Self {
            identity: identity.to_string(),
            result,
            diffs: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn with_diffs(mut self, diffs: Vec<FieldDiff>) -> Self {
        self.diffs = diffs;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

/// Summary of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub removed: usize,
    pub no_change: usize,
    pub skipped: usize,
    pub failed: usize,
    pub invalid: usize,
    pub requires_force: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.removed
    }

    /// Whether the run should exit successfully
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.invalid == 0 && self.requires_force == 0
    }

    /// Total number of entities processed
    pub fn total(&self) -> usize {
        self.total_changes()
            + self.no_change
            + self.skipped
            + self.failed
            + self.invalid
            + self.requires_force
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::RequiresForce { .. } => self.requires_force += 1,
            ApplyResult::Invalid { .. } => self.invalid += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Options for a run
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    /// Allow overwriting diverged attributes and deleting orphans
    pub force: bool,
    /// Report what would happen without running commands
    pub dry_run: bool,
}
