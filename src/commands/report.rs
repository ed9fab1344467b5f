//! Human-readable progress for a run
//!
//! Output is grouped per entity:
//!
//! ```text
//! ENTITY: group:deploy
//!     found in: /usr/share/stead/10-deploy.toml
//!         with: type: system, GID: 2000
//!     >> fixing GID (was: 1500)
//! ```

use colored::Colorize;
use declarative::{ApplyResult, Entity, EntityOutcome, ExecuteSummary, ReportCallback};

use crate::Context;
use crate::ui;

/// Prints one block per entity as the run progresses
pub struct ConsoleReport {
    quiet: bool,
    verbose: bool,
}

impl ConsoleReport {
    pub fn new(ctx: &Context) -> Self {
        Self {
            quiet: ctx.quiet,
            verbose: ctx.verbose > 0,
        }
    }

    fn print_entity(&self, entity: &Entity) {
        println!("{} {}", "ENTITY:".bold(), entity.identity.to_string().bold());
        if entity.orphaned {
            println!("    found in: {}", "registry".dimmed());
            return;
        }
        for source in &entity.sources {
            println!("    found in: {}", source.display());
        }
        if entity.is_valid() {
            println!("        with: {}", entity.definition.attributes());
        }
    }
}

impl ReportCallback for ConsoleReport {
    fn on_entity_start(&mut self, entity: &Entity) {
        log::trace!("Reconciling {}", entity.identity);
    }

    fn on_entity_complete(&mut self, entity: &Entity, outcome: &EntityOutcome) {
        let interesting = !matches!(outcome.result, ApplyResult::NoChange) || self.verbose;
        if !interesting || (self.quiet && !outcome.result.is_failure()) {
            return;
        }

        self.print_entity(entity);
        match &outcome.result {
            ApplyResult::NoChange => {}
            ApplyResult::Created => {
                println!("{} Provisioning {}", "ACTION:".green().bold(), entity.identity);
            }
            ApplyResult::Modified => {
                for diff in &outcome.diffs {
                    println!("    >> fixing {} (was: {})", diff.field, diff.actual);
                }
            }
            ApplyResult::Removed => {
                println!("{} Scrubbing {}", "ACTION:".yellow().bold(), entity.identity);
            }
            ApplyResult::RequiresForce { reason } => {
                for diff in &outcome.diffs {
                    println!("    !! {}", diff.to_string().yellow());
                }
                ui::error(&format!("{}: {} (requires --force)", entity.identity, reason));
            }
            ApplyResult::Invalid { error } | ApplyResult::Failed { error } => {
                ui::error(&format!("{}: {}", entity.identity, error));
            }
            ApplyResult::Skipped { reason } => ui::dim(reason),
        }
        for note in &outcome.notes {
            ui::dim(note);
        }
        println!();
    }
}

/// Print the totals line after a run
pub fn print_summary(summary: &ExecuteSummary) {
    let line = format!(
        "{} created, {} modified, {} removed, {} unchanged",
        summary.created, summary.modified, summary.removed, summary.no_change
    );
    if summary.is_success() {
        ui::success(&line);
        if summary.skipped > 0 {
            ui::dim(&format!("{} skipped (dry run)", summary.skipped));
        }
        return;
    }

    ui::warn(&line);
    let problems = [
        (summary.failed, "failed"),
        (summary.invalid, "invalid"),
        (summary.requires_force, "require --force"),
    ];
    for (count, label) in problems.iter().filter(|(count, _)| *count > 0) {
        ui::error(&format!("{} {}", count, label));
    }
}
