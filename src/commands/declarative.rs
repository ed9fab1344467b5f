//! Declarative commands
//!
//! - `apply` - Make the OS identity databases match the declarations
//! - `scan` - Report what apply would do
//! - `diff` - Show declared vs provisioned attributes
//! - `registry` - List the entities stead has created

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use declarative::{
    ApplyContext, ApplyOptions, DefinitionStore, Entity, NoReport, NoStatus, ReconcilePlan,
    Registry, RunReport, Selector, execute,
};
use serde::Serialize;

use crate::Context;
use crate::cli::{ApplyArgs, ScanArgs, TargetArgs};
use crate::commands::report::{self, ConsoleReport};
use crate::config::Settings;
use crate::paths;
use crate::runner::SystemExecutor;
use crate::status;
use crate::ui;

/// Declarations and registry loaded for one invocation
struct Session {
    settings: Settings,
    store: DefinitionStore,
    registry: Registry,
}

impl Session {
    fn load() -> Result<Self> {
        let settings = Settings::resolve()?;
        log::debug!("Root: {}", settings.root.display());
        log::debug!("Definitions: {}", settings.definitions_dir.display());
        log::debug!("Registry: {}", settings.registry_path.display());

        let store = DefinitionStore::load(&settings.definitions_dir).with_context(|| {
            format!(
                "Could not read declarations from {}",
                settings.definitions_dir.display()
            )
        })?;
        let registry = Registry::load(&settings.registry_path).with_context(|| {
            format!(
                "Could not load registry {}",
                settings.registry_path.display()
            )
        })?;

        Ok(Self {
            settings,
            store,
            registry,
        })
    }

    /// Print file-level declaration errors; true when there were none
    fn report_file_errors(&self) -> bool {
        for error in self.store.errors() {
            ui::error(&error.to_string());
        }
        self.store.errors().is_empty()
    }

    fn plan(&self, selectors: &[Selector]) -> ReconcilePlan {
        ReconcilePlan::build(&self.store, &self.registry, selectors)
    }
}

fn parse_selectors(targets: &TargetArgs) -> Result<Vec<Selector>> {
    targets
        .targets
        .iter()
        .map(|t| {
            t.parse::<Selector>()
                .with_context(|| format!("Invalid selector '{}'", t))
        })
        .collect()
}

// ============================================================================
// Apply
// ============================================================================

/// Converge the system; returns whether the run was clean
pub fn apply(ctx: &Context, args: ApplyArgs) -> Result<bool> {
    let selectors = parse_selectors(&args.targets)?;
    let mut session = Session::load()?;

    if !ctx.quiet {
        ui::header("Applying Declarations");
        if args.dry_run {
            ui::warn("Dry run - no changes will be made");
        }
        println!();
    }
    let files_ok = session.report_file_errors();

    let plan = session.plan(&selectors);
    let executor = SystemExecutor::new(paths::mock_enabled());
    let mut sink = status::open(&session.settings.status)?;
    let options = ApplyOptions {
        force: args.force,
        dry_run: args.dry_run,
    };
    let mut apply_ctx = ApplyContext::new(
        options,
        &session.settings.database,
        &executor,
        &mut session.registry,
        &mut *sink,
    );

    let run = execute(&plan, &mut apply_ctx, &mut ConsoleReport::new(ctx)).context("Run aborted")?;

    if !ctx.quiet || !run.summary.is_success() {
        report::print_summary(&run.summary);
    }
    Ok(files_ok && run.summary.is_success())
}

// ============================================================================
// Scan
// ============================================================================

#[derive(Serialize)]
struct ScanReport<'a> {
    #[serde(flatten)]
    run: &'a RunReport,
    errors: Vec<String>,
}

/// Report what apply would do, without running anything
pub fn scan(ctx: &Context, args: ScanArgs) -> Result<bool> {
    let selectors = parse_selectors(&args.targets)?;
    let session = Session::load()?;

    let plan = session.plan(&selectors);
    // Dry runs never mutate the registry; work on a copy so nothing is saved
    let mut registry = session.registry.clone();
    let executor = SystemExecutor::new(true);
    let mut no_status = NoStatus;
    let mut apply_ctx = ApplyContext::new(
        ApplyOptions {
            force: false,
            dry_run: true,
        },
        &session.settings.database,
        &executor,
        &mut registry,
        &mut no_status,
    );

    if args.json {
        let run = execute(&plan, &mut apply_ctx, &mut NoReport).context("Scan aborted")?;
        let report = ScanReport {
            run: &run,
            errors: session.store.errors().iter().map(|e| e.to_string()).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report.errors.is_empty() && run.summary.is_success());
    }

    if !ctx.quiet {
        ui::header("Scanning Declarations");
        println!();
    }
    let files_ok = session.report_file_errors();
    let run = execute(&plan, &mut apply_ctx, &mut ConsoleReport::new(ctx)).context("Scan aborted")?;
    report::print_summary(&run.summary);
    Ok(files_ok && run.summary.is_success())
}

// ============================================================================
// Diff
// ============================================================================

/// Show the comparable views of declared and provisioned state
pub fn diff(ctx: &Context, targets: TargetArgs) -> Result<bool> {
    let selectors = parse_selectors(&targets)?;
    let session = Session::load()?;
    let files_ok = session.report_file_errors();

    if !ctx.quiet {
        ui::header("Declared vs Provisioned");
    }

    let mut clean = true;
    for entity in &session.plan(&selectors).entities {
        clean &= diff_entity(&session, entity)?;
    }

    if clean && !ctx.quiet {
        println!();
        ui::success("No differences");
    }
    Ok(files_ok && clean)
}

fn diff_entity(session: &Session, entity: &Entity) -> Result<bool> {
    if entity.orphaned {
        println!();
        println!("{}", format!("- {}", entity.identity).red());
        ui::dim("no longer declared, deleted by apply --force");
        return Ok(false);
    }
    if let Some(error) = &entity.invalid {
        println!();
        ui::error(&format!("{}: {}", entity.identity, error));
        return Ok(false);
    }

    let provisioned = match entity
        .definition
        .provisioned_state(&session.settings.database)
    {
        Ok(provisioned) => provisioned,
        Err(e) if e.is_fatal() => return Err(e).context("Cannot read the identity database"),
        Err(e) => {
            println!();
            ui::error(&format!("{}: {}", entity.identity, e));
            return Ok(false);
        }
    };

    // Undeclared attributes keep their provisioned value
    let (actual, expected) = match provisioned {
        Some(provisioned) => {
            if entity.definition.diff(&provisioned).is_empty() {
                return Ok(true);
            }
            let mut expected = provisioned.clone();
            expected.merge_from(&entity.definition)?;
            (provisioned.comparable_view(), expected.comparable_view())
        }
        None => (String::new(), entity.definition.comparable_view()),
    };

    println!();
    println!("{}", format!("--- provisioned {}", entity.identity).red());
    println!("{}", format!("+++ declared {}", entity.identity).green());
    for line in view_diff(&actual, &expected) {
        match line {
            ViewLine::Same(text) => println!(" {}", text),
            ViewLine::Removed(text) => println!("{}", format!("-{}", text).red()),
            ViewLine::Added(text) => println!("{}", format!("+{}", text).green()),
        }
    }
    Ok(false)
}

#[derive(Debug, PartialEq, Eq)]
enum ViewLine<'a> {
    Same(&'a str),
    Removed(&'a str),
    Added(&'a str),
}

/// Line diff of two comparable views
///
/// Both views serialize fields in the same order, so lines only need to be
/// matched by position within the shared key order.
fn view_diff<'a>(old: &'a str, new: &'a str) -> Vec<ViewLine<'a>> {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let mut out = Vec::new();

    let (mut i, mut j) = (0, 0);
    while i < old_lines.len() || j < new_lines.len() {
        match (old_lines.get(i), new_lines.get(j)) {
            (Some(a), Some(b)) if a == b => {
                out.push(ViewLine::Same(a));
                i += 1;
                j += 1;
            }
            (Some(a), Some(b)) if key_of(a) == key_of(b) => {
                out.push(ViewLine::Removed(a));
                out.push(ViewLine::Added(b));
                i += 1;
                j += 1;
            }
            (Some(a), _) if !new_lines[j..].iter().any(|b| key_of(b) == key_of(a)) => {
                out.push(ViewLine::Removed(a));
                i += 1;
            }
            (_, Some(b)) => {
                out.push(ViewLine::Added(b));
                j += 1;
            }
            (Some(a), None) => {
                out.push(ViewLine::Removed(a));
                i += 1;
            }
            (None, None) => break,
        }
    }
    out
}

fn key_of(line: &str) -> &str {
    line.split_once('=').map_or(line, |(key, _)| key.trim())
}

// ============================================================================
// Registry
// ============================================================================

/// List the managed identities
pub fn registry(ctx: &Context) -> Result<bool> {
    let session = Session::load()?;

    if !ctx.quiet {
        ui::header("Managed Entities");
        ui::kv("Registry", &session.settings.registry_path.display().to_string());
        println!();
    }

    if session.registry.is_empty() {
        ui::dim("No entities have been created by stead");
        return Ok(true);
    }

    for identity in session.registry.identities() {
        let marker = if session.store.declares(&identity) {
            "✓".green()
        } else if session.store.errors().is_empty() {
            "orphaned".yellow()
        } else {
            "undeclared, kept while declaration files have errors".yellow()
        };
        println!("  {} {}", identity, marker);
    }
    Ok(true)
}
