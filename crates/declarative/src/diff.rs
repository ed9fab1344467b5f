//! Attribute diffs between declared and provisioned definitions
//!
//! Only mutable attributes are diffed. A declared value that is unset
//! (zero, empty) means "don't care" and never produces a diff.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One attribute whose provisioned value disagrees with the declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDiff {
    /// Attribute name as shown to the operator (e.g. "GID")
    pub field: String,
    /// Provisioned value
    pub actual: String,
    /// Declared value
    pub expected: String,
}

impl fmt::Display for FieldDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.field, self.actual, self.expected)
    }
}

/// Collects diffs field by field
#[derive(Debug, Default)]
pub struct DiffBuilder {
    diffs: Vec<FieldDiff>,
}

impl DiffBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Numeric id; zero declared means unassigned
    pub fn id(mut self, field: &str, actual: u32, expected: u32) -> Self {
        if expected > 0 && expected != actual {
            self.push(field, actual.to_string(), expected.to_string());
        }
        self
    }

    /// Free-form text; empty declared means unmanaged
    pub fn text(mut self, field: &str, actual: &str, expected: &str) -> Self {
        if !expected.is_empty() && expected != actual {
            self.push(field, actual.to_string(), expected.to_string());
        }
        self
    }

    /// Unordered name list; empty declared means unmanaged
    pub fn set(mut self, field: &str, actual: &[String], expected: &[String]) -> Self {
        if expected.is_empty() {
            return self;
        }
        let actual = sorted(actual);
        let expected = sorted(expected);
        if actual != expected {
            self.push(field, actual.join(", "), expected.join(", "));
        }
        self
    }

    pub fn build(self) -> Vec<FieldDiff> {
        self.diffs
    }

    fn push(&mut self, field: &str, actual: String, expected: String) {
        self.diffs.push(FieldDiff {
            field: field.to_string(),
            actual,
            expected,
        });
    }
}

fn sorted(names: &[String]) -> Vec<String> {
    let mut names = names.to_vec();
    names.sort();
    names.dedup();
    names
}
