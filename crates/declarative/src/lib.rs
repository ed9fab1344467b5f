//! # Declarative
//!
//! Declarative management of system identity entities (UNIX groups and
//! users).
//!
//! Entities are declared in TOML files, compared against the OS identity
//! database and converged with the minimal set of `groupadd` / `usermod` /
//! ... commands.
//!
//! ## Core Concepts
//!
//! - **Definition**: the attributes of one entity, declared or provisioned
//! - **Entity**: a merged declaration plus its sources and orphan/invalid flags
//! - **Registry**: the set of entities this tool created, persisted on disk
//! - **ReconcilePlan**: the ordered entities of one run
//! - **Reconciler**: decides create / update / scrub / no-op per entity
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{
//!     execute, ApplyContext, ApplyOptions, DefinitionStore, NoReport, NoStatus,
//!     ReconcilePlan, RecordingExecutor, Registry, SystemDatabase,
//! };
//!
//! let store = DefinitionStore::load("/usr/share/stead".as_ref())?;
//! let mut registry = Registry::load("/var/lib/stead/registry.toml".as_ref())?;
//! let plan = ReconcilePlan::build(&store, &registry, &[]);
//!
//! let database = SystemDatabase::default();
//! let executor = RecordingExecutor::new();
//! let mut ctx = ApplyContext::new(
//!     ApplyOptions::default(),
//!     &database,
//!     &executor,
//!     &mut registry,
//!     &mut NoStatus,
//! );
//! let run = execute(&plan, &mut ctx, &mut NoReport)?;
//! println!("{} changes", run.summary.total_changes());
//! ```
//!
//! ## Provider Traits
//!
//! - [`CommandExecutor`]: runs mutation commands
//! - [`StatusSink`]: receives the machine-readable "requires force" status
//! - [`ReportCallback`]: receives per-entity progress

pub mod context;
pub mod diff;
pub mod entity;
pub mod error;
pub mod executor;
pub mod getent;
pub mod group;
pub mod identity;
pub mod planner;
pub mod reconciler;
pub mod registry;
pub mod store;
pub mod types;
pub mod user;

// Re-export main types at crate root
pub use context::{
    ApplyContext, CommandExecutor, Invocation, MemoryStatus, NoReport, NoStatus,
    RecordingExecutor, ReportCallback, StatusSink, SystemDatabase, WriterStatus,
};
pub use diff::FieldDiff;
pub use entity::{Definition, Entity, EntityDefinition, MutationCommand};
pub use error::{Error, Result};
pub use executor::{RunReport, execute};
pub use group::GroupDefinition;
pub use identity::{EntityIdentity, EntityKind, Selector};
pub use planner::{ReconcilePlan, UNLOADED_DECLARATIONS};
pub use reconciler::{REQUIRES_FORCE_STATUS, apply_entity};
pub use registry::Registry;
pub use store::{Declaration, DefinitionStore, merge_declarations};
pub use types::{ApplyOptions, ApplyResult, EntityOutcome, ExecuteSummary};
pub use user::UserDefinition;
