//! Execution engine - runs the reconciler over a plan, one entity at a time

use crate::context::{ApplyContext, ReportCallback};
use crate::error::Result;
use crate::planner::ReconcilePlan;
use crate::reconciler::apply_entity;
use crate::types::{EntityOutcome, ExecuteSummary};
use serde::Serialize;

/// Outcome of a whole run
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<EntityOutcome>,
    pub summary: ExecuteSummary,
}

/// Execute a plan sequentially
///
/// Entities are applied strictly in plan order; a failed entity does not
/// stop the run. Only a fatal error (unreadable database, registry that
/// cannot be written) aborts, returning `Err`.
pub fn execute<R: ReportCallback>(
    plan: &ReconcilePlan,
    ctx: &mut ApplyContext,
    report: &mut R,
) -> Result<RunReport> {
    let mut run = RunReport::default();

    for entity in &plan.entities {
        report.on_entity_start(entity);
        let outcome = apply_entity(entity, ctx)?;
        report.on_entity_complete(entity, &outcome);

        run.summary.add_result(&outcome.result);
        run.outcomes.push(outcome);
    }

    log::debug!(
        "Run finished: {} changed, {} unchanged, {} failed",
        run.summary.total_changes(),
        run.summary.no_change,
        run.summary.failed
    );
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{NoReport, NoStatus, RecordingExecutor, SystemDatabase};
    use crate::entity::Entity;
    use crate::identity::EntityIdentity;
    use crate::registry::Registry;
    use crate::store::DefinitionStore;
    use crate::types::{ApplyOptions, ApplyResult, EntityOutcome};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// Records the order in which entities were reported
    #[derive(Default)]
    struct Recorder {
        started: Vec<String>,
        completed: Vec<(String, ApplyResult)>,
    }

    impl ReportCallback for Recorder {
        fn on_entity_start(&mut self, entity: &Entity) {
            self.started.push(entity.identity.to_string());
        }

        fn on_entity_complete(&mut self, entity: &Entity, outcome: &EntityOutcome) {
            self.completed
                .push((entity.identity.to_string(), outcome.result.clone()));
        }
    }

    fn database(dir: &TempDir, group: &str) -> SystemDatabase {
        fs::create_dir_all(dir.path().join("etc")).unwrap();
        fs::write(dir.path().join("etc/group"), group).unwrap();
        fs::write(dir.path().join("etc/passwd"), "").unwrap();
        SystemDatabase::under_root(dir.path())
    }

    #[test]
    fn test_execute_empty_plan() {
        let dir = TempDir::new().unwrap();
        let db = database(&dir, "");
        let executor = RecordingExecutor::new();
        let mut registry = Registry::in_memory();
        let mut status = NoStatus;
        let mut ctx = ApplyContext::new(
            ApplyOptions::default(),
            &db,
            &executor,
            &mut registry,
            &mut status,
        );

        let run = execute(&ReconcilePlan::default(), &mut ctx, &mut NoReport).unwrap();
        assert_eq!(run.summary.total(), 0);
        assert!(run.summary.is_success());
    }

    #[test]
    fn test_failures_do_not_stop_the_run() {
        let dir = TempDir::new().unwrap();
        let db = database(&dir, "wheel:x:10:\n");
        let mut store = DefinitionStore::new();
        store.add_file(
            Path::new("a.toml"),
            "[[group]]\nname = \"deploy\"\n\n[[group]]\nname = \"wheel\"\ngid = 11\n\n[[user]]\nname = \"alice\"\n",
        );

        let executor = RecordingExecutor::new().failing("groupadd");
        let mut registry = Registry::in_memory();
        let plan = ReconcilePlan::build(&store, &registry, &[]);
        let mut status = NoStatus;
        let mut ctx = ApplyContext::new(
            ApplyOptions::default(),
            &db,
            &executor,
            &mut registry,
            &mut status,
        );

        let mut recorder = Recorder::default();
        let run = execute(&plan, &mut ctx, &mut recorder).unwrap();

        assert_eq!(recorder.started, vec!["group:deploy", "group:wheel", "user:alice"]);
        assert!(matches!(recorder.completed[0].1, ApplyResult::Failed { .. }));
        assert!(matches!(
            recorder.completed[1].1,
            ApplyResult::RequiresForce { .. }
        ));
        assert_eq!(recorder.completed[2].1, ApplyResult::Created);

        assert_eq!(run.summary.failed, 1);
        assert_eq!(run.summary.requires_force, 1);
        assert_eq!(run.summary.created, 1);
        assert!(!run.summary.is_success());
        assert!(registry.contains(&EntityIdentity::user("alice")));
    }
}
