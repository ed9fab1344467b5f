//! Reconciler - converges one entity towards its declaration
//!
//! Per entity, exactly one of these applies, checked in order:
//!
//! 1. orphaned: scrub (needs force)
//! 2. invalid declarations: skip
//! 3. absent from the OS database: create
//! 4. present and matching: nothing to do
//! 5. present and diverged: update (needs force)
//!
//! Registry membership changes only after the OS mutation succeeded, and is
//! persisted right away.

use crate::context::ApplyContext;
use crate::diff::FieldDiff;
use crate::entity::{Entity, MutationCommand};
use crate::error::{Error, Result};
use crate::types::{ApplyResult, EntityOutcome};

/// Line written to the status channel when an update needs `--force`
pub const REQUIRES_FORCE_STATUS: &str = "requires --force to overwrite";

/// Reconcile a single entity
///
/// Entity-scoped failures become a `Failed` outcome. `Err` is reserved for
/// problems that leave the run without ground truth: an unreadable OS
/// database, or a registry that cannot be persisted.
pub fn apply_entity(entity: &Entity, ctx: &mut ApplyContext) -> Result<EntityOutcome> {
    if entity.orphaned {
        return scrub(entity, ctx);
    }

    if let Some(error) = &entity.invalid {
        return Ok(EntityOutcome::new(
            &entity.identity,
            ApplyResult::Invalid {
                error: error.clone(),
            },
        ));
    }

    let provisioned = match entity.definition.provisioned_state(ctx.database) {
        Ok(provisioned) => provisioned,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => return Ok(failed(entity, &e)),
    };

    let Some(actual) = provisioned else {
        return create(entity, ctx);
    };

    let diffs = entity.definition.diff(&actual);
    if diffs.is_empty() {
        return Ok(EntityOutcome::new(&entity.identity, ApplyResult::NoChange));
    }

    if ctx.options.force {
        return update(entity, diffs, ctx);
    }

    let mut outcome = EntityOutcome::new(
        &entity.identity,
        ApplyResult::RequiresForce {
            reason: format!("{} attribute(s) differ", diffs.len()),
        },
    )
    .with_diffs(diffs);
    if let Err(e) = ctx.status.write_status(REQUIRES_FORCE_STATUS) {
        log::warn!("Cannot write status for {}: {e}", entity.identity);
        outcome = outcome.with_note(format!("cannot write status: {e}"));
    }
    Ok(outcome)
}

fn create(entity: &Entity, ctx: &mut ApplyContext) -> Result<EntityOutcome> {
    let command = entity.definition.create_command();
    if ctx.options.dry_run {
        return Ok(dry_run(entity, &command));
    }

    if let Err(e) = run(&command, ctx) {
        return Ok(failed(entity, &e));
    }

    ctx.registry.add(&entity.identity);
    ctx.registry.save()?;
    Ok(EntityOutcome::new(&entity.identity, ApplyResult::Created))
}

fn update(entity: &Entity, diffs: Vec<FieldDiff>, ctx: &mut ApplyContext) -> Result<EntityOutcome> {
    let command = entity.definition.modify_command(&diffs);
    if ctx.options.dry_run {
        return Ok(dry_run(entity, &command).with_diffs(diffs));
    }

    if let Err(e) = run(&command, ctx) {
        return Ok(failed(entity, &e).with_diffs(diffs));
    }

    Ok(EntityOutcome::new(&entity.identity, ApplyResult::Modified).with_diffs(diffs))
}

fn scrub(entity: &Entity, ctx: &mut ApplyContext) -> Result<EntityOutcome> {
    if !ctx.options.force {
        let registry = ctx
            .registry
            .path()
            .map_or_else(|| "the registry".to_string(), |p| p.display().to_string());
        return Ok(EntityOutcome::new(
            &entity.identity,
            ApplyResult::RequiresForce {
                reason: "all declarations have been deleted".to_string(),
            },
        )
        .with_note("Won't do this without --force.")
        .with_note(format!(
            "Re-run apply with --force {} to delete this {}.",
            entity.identity, entity.identity.kind
        ))
        .with_note(format!(
            "Or remove {} from {registry} to keep the {}.",
            entity.identity, entity.identity.kind
        )));
    }

    let command = entity.definition.delete_command();
    if ctx.options.dry_run {
        return Ok(dry_run(entity, &command));
    }

    if let Err(e) = run(&command, ctx) {
        return Ok(failed(entity, &e));
    }

    ctx.registry.remove(&entity.identity);
    ctx.registry.save()?;
    Ok(EntityOutcome::new(&entity.identity, ApplyResult::Removed))
}

fn run(command: &MutationCommand, ctx: &ApplyContext) -> Result<()> {
    log::info!("{} {}", command.program, command.args.join(" "));
    ctx.executor.execute(command.program, &command.args)
}

fn failed(entity: &Entity, error: &Error) -> EntityOutcome {
    log::debug!("{} failed: {error}", entity.identity);
    EntityOutcome::new(
        &entity.identity,
        ApplyResult::Failed {
            error: error.to_string(),
        },
    )
}

fn dry_run(entity: &Entity, command: &MutationCommand) -> EntityOutcome {
    EntityOutcome::new(
        &entity.identity,
        ApplyResult::Skipped {
            reason: format!(
                "dry run: would run {} {}",
                command.program,
                command.args.join(" ")
            ),
        },
    )
}
