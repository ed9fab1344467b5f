//! Apply context and provider traits
//!
//! These traits keep the reconciler free of any particular process runner,
//! output format or status channel.

use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::types::{ApplyOptions, EntityOutcome};
use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Runs the OS-level mutation commands (`groupadd`, `usermod`, ...)
pub trait CommandExecutor {
    /// Run `program` with `args`, failing unless it exits successfully
    fn execute(&self, program: &str, args: &[String]) -> Result<()>;
}

/// One recorded command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// Command line as a single string, for assertions and logs
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Executor that records invocations without touching the system
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    calls: RefCell<Vec<Invocation>>,
    failing: Vec<String>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every invocation of `program` fail
    pub fn failing(mut self, program: &str) -> Self {
        self.failing.push(program.to_string());
        self
    }

    /// Invocations so far, in order
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

impl CommandExecutor for RecordingExecutor {
    fn execute(&self, program: &str, args: &[String]) -> Result<()> {
        self.calls.borrow_mut().push(Invocation {
            program: program.to_string(),
            args: args.to_vec(),
        });
        if self.failing.iter().any(|p| p == program) {
            return Err(Error::CommandExecution {
                program: program.to_string(),
                message: "exit status 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Machine-readable side channel for "changes pending, re-run with force"
pub trait StatusSink {
    fn write_status(&mut self, line: &str) -> std::io::Result<()>;
}

/// Status sink that discards everything
pub struct NoStatus;

impl StatusSink for NoStatus {
    fn write_status(&mut self, _line: &str) -> std::io::Result<()> {
        Ok(())
    }
}

/// Status sink that keeps lines in memory
#[derive(Debug, Default)]
pub struct MemoryStatus {
    pub lines: Vec<String>,
}

impl StatusSink for MemoryStatus {
    fn write_status(&mut self, line: &str) -> std::io::Result<()> {
        self.lines.push(line.to_string());
        Ok(())
    }
}

/// Status sink writing one line per status to any writer
pub struct WriterStatus<W: Write>(pub W);

impl<W: Write> StatusSink for WriterStatus<W> {
    fn write_status(&mut self, line: &str) -> std::io::Result<()> {
        writeln!(self.0, "{line}")?;
        self.0.flush()
    }
}

/// Receives per-entity progress during a run
pub trait ReportCallback {
    /// Called before an entity is reconciled
    fn on_entity_start(&mut self, entity: &Entity);

    /// Called after an entity is reconciled
    fn on_entity_complete(&mut self, entity: &Entity, outcome: &EntityOutcome);
}

/// No-op report callback
pub struct NoReport;

impl ReportCallback for NoReport {
    fn on_entity_start(&mut self, _entity: &Entity) {}
    fn on_entity_complete(&mut self, _entity: &Entity, _outcome: &EntityOutcome) {}
}

/// Locations of the OS identity databases
#[derive(Debug, Clone)]
pub struct SystemDatabase {
    pub group: PathBuf,
    pub passwd: PathBuf,
}

impl SystemDatabase {
    /// Databases below `root` (`/` on a live system)
    pub fn under_root(root: &Path) -> Self {
        Self {
            group: root.join("etc").join("group"),
            passwd: root.join("etc").join("passwd"),
        }
    }
}

impl Default for SystemDatabase {
    fn default() -> Self {
        Self::under_root(Path::new("/"))
    }
}

/// Everything an entity apply needs, threaded explicitly through a run
pub struct ApplyContext<'a> {
    pub options: ApplyOptions,
    pub database: &'a SystemDatabase,
    pub executor: &'a dyn CommandExecutor,
    pub registry: &'a mut Registry,
    pub status: &'a mut dyn StatusSink,
}

impl<'a> ApplyContext<'a> {
    pub fn new(
        options: ApplyOptions,
        database: &'a SystemDatabase,
        executor: &'a dyn CommandExecutor,
        registry: &'a mut Registry,
        status: &'a mut dyn StatusSink,
    ) -> Self {
        Self {
            options,
            database,
            executor,
            registry,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_executor() {
        let executor = RecordingExecutor::new().failing("groupdel");
        executor
            .execute("groupadd", &["--gid".into(), "2000".into(), "deploy".into()])
            .unwrap();
        assert!(executor.execute("groupdel", &["legacy".into()]).is_err());

        let calls = executor.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].command_line(), "groupadd --gid 2000 deploy");
        assert_eq!(calls[1].program, "groupdel");
    }

    #[test]
    fn test_writer_status() {
        let mut sink = WriterStatus(Vec::new());
        sink.write_status("requires --force to overwrite").unwrap();
        assert_eq!(sink.0, b"requires --force to overwrite\n");
    }

    #[test]
    fn test_database_under_root() {
        let db = SystemDatabase::under_root(Path::new("/tmp/root"));
        assert_eq!(db.group, PathBuf::from("/tmp/root/etc/group"));
        assert_eq!(db.passwd, PathBuf::from("/tmp/root/etc/passwd"));
    }
}
