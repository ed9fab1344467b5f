//! End-to-end reconciliation behavior against a throwaway root directory

use declarative::{
    ApplyContext, ApplyOptions, ApplyResult, CommandExecutor, Declaration, Definition,
    DefinitionStore, EntityIdentity, Error, GroupDefinition, MemoryStatus, NoReport,
    REQUIRES_FORCE_STATUS, ReconcilePlan, RecordingExecutor, Registry, RunReport, SystemDatabase,
    UNLOADED_DECLARATIONS, execute,
};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Executor that edits the fake `/etc/group` the way the real tools would
struct FakeGroupTools {
    group_file: PathBuf,
    calls: RefCell<Vec<String>>,
}

impl FakeGroupTools {
    fn new(database: &SystemDatabase) -> Self {
        Self {
            group_file: database.group.clone(),
            calls: RefCell::new(Vec::new()),
        }
    }

    fn rewrite(&self, edit: impl FnOnce(&mut Vec<Vec<String>>)) {
        let content = fs::read_to_string(&self.group_file).unwrap();
        let mut records: Vec<Vec<String>> = content
            .lines()
            .filter(|l| !l.is_empty())
            .map(|l| l.split(':').map(str::to_string).collect())
            .collect();
        edit(&mut records);
        let content: String = records.iter().map(|r| r.join(":") + "\n").collect();
        fs::write(&self.group_file, content).unwrap();
    }
}

impl CommandExecutor for FakeGroupTools {
    fn execute(&self, program: &str, args: &[String]) -> declarative::Result<()> {
        self.calls
            .borrow_mut()
            .push(format!("{program} {}", args.join(" ")));

        let name = args.last().cloned().unwrap_or_default();
        let gid = args
            .iter()
            .position(|a| a == "--gid")
            .map(|i| args[i + 1].clone());

        match program {
            "groupadd" => self.rewrite(|records| {
                let gid = gid.unwrap_or_else(|| (1000 + records.len()).to_string());
                records.push(vec![name, "x".into(), gid, String::new()]);
            }),
            "groupmod" => self.rewrite(|records| {
                for record in records.iter_mut().filter(|r| r[0] == name) {
                    if let Some(gid) = &gid {
                        record[2] = gid.clone();
                    }
                }
            }),
            "groupdel" => self.rewrite(|records| records.retain(|r| r[0] != name)),
            other => {
                return Err(Error::CommandExecution {
                    program: other.to_string(),
                    message: "not supported here".into(),
                });
            }
        }
        Ok(())
    }
}

struct Host {
    dir: TempDir,
    database: SystemDatabase,
}

impl Host {
    fn new(group: &str) -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("etc")).unwrap();
        fs::create_dir_all(dir.path().join("defs")).unwrap();
        fs::write(dir.path().join("etc/group"), group).unwrap();
        fs::write(dir.path().join("etc/passwd"), "").unwrap();
        let database = SystemDatabase::under_root(dir.path());
        Self { dir, database }
    }

    fn declare(&self, file: &str, content: &str) {
        fs::write(self.dir.path().join("defs").join(file), content).unwrap();
    }

    fn undeclare(&self, file: &str) {
        fs::remove_file(self.dir.path().join("defs").join(file)).unwrap();
    }

    fn registry_path(&self) -> PathBuf {
        self.dir.path().join("state/registry.toml")
    }

    fn registry(&self) -> Registry {
        Registry::load(&self.registry_path()).unwrap()
    }

    fn group_file(&self) -> String {
        fs::read_to_string(&self.database.group).unwrap()
    }

    fn store(&self) -> DefinitionStore {
        DefinitionStore::load(&self.dir.path().join("defs")).unwrap()
    }

    fn register(&self, identity: &EntityIdentity) {
        let mut registry = self.registry();
        registry.add(identity);
        registry.save().unwrap();
    }

    fn apply(
        &self,
        executor: &dyn CommandExecutor,
        status: &mut MemoryStatus,
        force: bool,
    ) -> RunReport {
        self.apply_store(&self.store(), executor, status, force)
    }

    fn apply_store(
        &self,
        store: &DefinitionStore,
        executor: &dyn CommandExecutor,
        status: &mut MemoryStatus,
        force: bool,
    ) -> RunReport {
        let mut registry = self.registry();
        let plan = ReconcilePlan::build(store, &registry, &[]);
        let options = ApplyOptions {
            force,
            dry_run: false,
        };
        let mut ctx = ApplyContext::new(options, &self.database, executor, &mut registry, status);
        execute(&plan, &mut ctx, &mut NoReport).unwrap()
    }
}

fn results(run: &RunReport) -> Vec<(String, ApplyResult)> {
    run.outcomes
        .iter()
        .map(|o| (o.identity.clone(), o.result.clone()))
        .collect()
}

#[test]
fn applying_twice_is_idempotent() {
    let host = Host::new("root:x:0:\n");
    host.declare("10-deploy.toml", "[[group]]\nname = \"deploy\"\ngid = 2000\n");
    let tools = FakeGroupTools::new(&host.database);
    let mut status = MemoryStatus::default();

    let first = host.apply(&tools, &mut status, false);
    assert_eq!(first.summary.created, 1);
    assert!(host.group_file().contains("deploy:x:2000:"));

    tools.calls.borrow_mut().clear();
    let second = host.apply(&tools, &mut status, false);
    assert_eq!(
        results(&second),
        vec![("group:deploy".to_string(), ApplyResult::NoChange)]
    );
    assert!(tools.calls.borrow().is_empty());
    assert!(second.summary.is_success());
}

#[test]
fn unmanaged_entities_are_never_touched() {
    let host = Host::new("root:x:0:\nbackup:x:34:\n");
    let executor = RecordingExecutor::new();
    let mut status = MemoryStatus::default();

    let run = host.apply(&executor, &mut status, true);
    assert!(run.outcomes.is_empty());
    assert!(executor.calls().is_empty());
    assert!(host.group_file().contains("backup:x:34:"));
}

#[test]
fn diverged_attributes_need_force() {
    let host = Host::new("deploy:x:1500:\n");
    host.declare("deploy.toml", "[[group]]\nname = \"deploy\"\ngid = 2000\n");
    let executor = RecordingExecutor::new();
    let mut status = MemoryStatus::default();

    let run = host.apply(&executor, &mut status, false);
    assert!(executor.calls().is_empty());
    assert_eq!(run.outcomes[0].diffs[0].field, "GID");
    assert_eq!(status.lines, vec![REQUIRES_FORCE_STATUS]);
    assert!(!run.summary.is_success());

    let run = host.apply(&executor, &mut status, true);
    let calls = executor.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].command_line(), "groupmod --gid 2000 deploy");
    assert_eq!(run.summary.modified, 1);
    assert!(host.registry().is_empty());
}

#[test]
fn created_entities_are_registered() {
    let host = Host::new("root:x:0:\n");
    host.declare("deploy.toml", "[[group]]\nname = \"deploy\"\ngid = 2000\n");
    let executor = RecordingExecutor::new();
    let mut status = MemoryStatus::default();

    host.apply(&executor, &mut status, false);

    let calls = executor.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].program, "groupadd");
    assert!(calls[0].args.contains(&"deploy".to_string()));
    assert!(calls[0].args.contains(&"2000".to_string()));
    assert!(host.registry().contains(&EntityIdentity::group("deploy")));
}

#[test]
fn orphans_are_scrubbed_with_force() {
    let host = Host::new("legacy:x:3000:\n");
    let mut registry = host.registry();
    registry.add(&EntityIdentity::group("legacy"));
    registry.save().unwrap();

    let executor = RecordingExecutor::new();
    let mut status = MemoryStatus::default();

    let run = host.apply(&executor, &mut status, false);
    assert!(matches!(
        run.outcomes[0].result,
        ApplyResult::RequiresForce { .. }
    ));
    assert!(executor.calls().is_empty());
    assert!(host.registry().contains(&EntityIdentity::group("legacy")));

    let run = host.apply(&executor, &mut status, true);
    assert_eq!(run.summary.removed, 1);
    let calls = executor.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].command_line(), "groupdel legacy");
    assert!(!host.registry().contains(&EntityIdentity::group("legacy")));
}

#[test]
fn removing_a_declaration_turns_the_entity_into_an_orphan() {
    let host = Host::new("root:x:0:\n");
    host.declare("ops.toml", "[[group]]\nname = \"ops\"\n");
    let tools = FakeGroupTools::new(&host.database);
    let mut status = MemoryStatus::default();

    host.apply(&tools, &mut status, false);
    assert!(host.group_file().contains("ops:x:"));

    host.undeclare("ops.toml");
    let run = host.apply(&tools, &mut status, true);
    assert_eq!(
        results(&run),
        vec![("group:ops".to_string(), ApplyResult::Removed)]
    );
    assert!(!host.group_file().contains("ops:x:"));
    assert!(host.registry().is_empty());
}

#[test]
fn conflicting_declarations_are_excluded_from_apply() {
    let host = Host::new("root:x:0:\n");
    host.declare("a.toml", "[[group]]\nname = \"ops\"\ngid = 5000\n");
    host.declare("b.toml", "[[group]]\nname = \"ops\"\ngid = \"five\"\n");
    let executor = RecordingExecutor::new();
    let mut status = MemoryStatus::default();

    let run = host.apply(&executor, &mut status, true);
    assert!(matches!(run.outcomes[0].result, ApplyResult::Invalid { .. }));
    assert_eq!(run.summary.invalid, 1);
    assert!(executor.calls().is_empty());
    assert!(host.registry().is_empty());
}

#[test]
fn corrupt_records_fail_only_their_entity() {
    let host = Host::new("deploy:x:1500\n");
    host.declare(
        "groups.toml",
        "[[group]]\nname = \"deploy\"\n\n[[group]]\nname = \"ops\"\n",
    );
    let executor = RecordingExecutor::new();
    let mut status = MemoryStatus::default();

    let run = host.apply(&executor, &mut status, true);
    assert!(matches!(run.outcomes[0].result, ApplyResult::Failed { .. }));
    assert_eq!(run.outcomes[1].result, ApplyResult::Created);

    let calls = executor.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].command_line(), "groupadd ops");
    assert!(!host.registry().contains(&EntityIdentity::group("deploy")));
}

#[test]
fn registry_path_is_reported_for_orphans() {
    let host = Host::new("legacy:x:3000:\n");
    let mut registry = host.registry();
    registry.add(&EntityIdentity::group("legacy"));
    registry.save().unwrap();

    let run = host.apply(&RecordingExecutor::new(), &mut MemoryStatus::default(), false);
    let registry_path = host.registry_path();
    let expected = Path::new(&registry_path).display().to_string();
    assert!(run.outcomes[0].notes.iter().any(|n| n.contains(&expected)));
}

#[test]
fn broken_declaration_file_never_scrubs() {
    let host = Host::new("ops:x:3000:\n");
    host.declare("ops.toml", "[[group]]\nname = \"ops\"\ngid = 3000\n]\n");
    host.register(&EntityIdentity::group("ops"));
    let executor = RecordingExecutor::new();

    let run = host.apply(&executor, &mut MemoryStatus::default(), true);

    assert!(!host.store().errors().is_empty());
    assert!(executor.calls().is_empty());
    assert_eq!(
        results(&run),
        vec![(
            "group:ops".to_string(),
            ApplyResult::Invalid {
                error: UNLOADED_DECLARATIONS.to_string()
            }
        )]
    );
    assert!(!run.summary.is_success());
    assert!(host.registry().contains(&EntityIdentity::group("ops")));
    assert!(host.group_file().contains("ops:x:3000:"));
}

#[test]
fn registered_entity_with_invalid_declaration_is_kept() {
    let host = Host::new("ops:x:3000:\n");
    host.declare("ops.toml", "[[group]]\nname = \"ops\"\ngid = \"many\"\n");
    host.register(&EntityIdentity::group("ops"));
    let executor = RecordingExecutor::new();

    let run = host.apply(&executor, &mut MemoryStatus::default(), true);

    assert!(matches!(run.outcomes[0].result, ApplyResult::Invalid { .. }));
    assert_eq!(run.summary.removed, 0);
    assert!(executor.calls().is_empty());
    assert!(host.registry().contains(&EntityIdentity::group("ops")));
}

#[test]
fn declarations_naming_another_entity_are_excluded_from_apply() {
    let host = Host::new("ops:x:1500:\n");
    host.declare("ops.toml", "[[group]]\nname = \"ops\"\ngid = 2000\n");
    host.register(&EntityIdentity::group("ops"));

    let mut store = host.store();
    let mut renamed = GroupDefinition::named("admins");
    renamed.gid = 2500;
    store.push(Declaration {
        source: PathBuf::from("admins.toml"),
        identity: EntityIdentity::group("ops"),
        parsed: Ok(Definition::Group(renamed)),
    });
    let executor = RecordingExecutor::new();
    let mut status = MemoryStatus::default();

    let run = host.apply_store(&store, &executor, &mut status, true);

    assert_eq!(run.outcomes.len(), 1);
    assert!(matches!(run.outcomes[0].result, ApplyResult::Invalid { .. }));
    assert_eq!(run.summary.invalid, 1);
    assert_eq!(run.summary.total_changes(), 0);
    assert!(executor.calls().is_empty());
    assert!(status.lines.is_empty());
    assert!(host.registry().contains(&EntityIdentity::group("ops")));
    assert!(host.group_file().contains("ops:x:1500:"));
}
