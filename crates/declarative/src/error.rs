//! Error types for entity reconciliation.
//!
//! Errors are split by blast radius: some only affect the entity being
//! applied (a corrupt record, a failed command, conflicting declarations),
//! others mean the run cannot establish ground truth at all (an unreadable
//! database or registry).

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, diffing or applying entities.
#[derive(Debug, Error)]
pub enum Error {
    /// A matching record exists in the OS database but cannot be trusted.
    #[error("invalid entry in {path}: {message}")]
    CorruptRecord {
        /// Database file containing the record
        path: PathBuf,
        /// What is wrong with the record
        message: String,
    },

    /// A database, declaration or registry file could not be read or written.
    #[error("cannot access {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// An external mutation command failed.
    #[error("{program} failed: {message}")]
    CommandExecution {
        /// Program that was invoked (e.g. `groupadd`)
        program: String,
        /// Exit status or stderr summary
        message: String,
    },

    /// Declarations for one identity contradict each other.
    #[error("conflicting declarations for {identity}: {message}")]
    MergeConflict {
        /// Identity in `kind:name` form
        identity: String,
        /// Description of the conflict
        message: String,
    },

    /// A TOML document could not be parsed.
    #[error("cannot parse {path}: {message}")]
    Parse {
        /// File that failed to parse
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// A string could not be interpreted as an entity identity.
    #[error("invalid entity identity: {0}")]
    InvalidIdentity(String),
}

impl Error {
    /// Wrap an IO error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error leaves the whole run without ground truth.
    ///
    /// Everything else is scoped to a single entity.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

/// Result alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_io_is_fatal() {
        let io = Error::io(
            "/etc/group",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(io.is_fatal());

        let corrupt = Error::CorruptRecord {
            path: "/etc/group".into(),
            message: "not enough fields".into(),
        };
        assert!(!corrupt.is_fatal());

        let failed = Error::CommandExecution {
            program: "groupadd".into(),
            message: "exit status 9".into(),
        };
        assert!(!failed.is_fatal());
    }

    #[test]
    fn test_display_names_path() {
        let err = Error::CorruptRecord {
            path: "/etc/group".into(),
            message: "not enough fields".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid entry in /etc/group: not enough fields"
        );
    }
}
