//! Migrate command implementation

use anyhow::{Context, Result};
use strata_core::MigrationId;
use strata_migrate::{RunOptions, RunTarget};

use crate::cli::{GlobalArgs, MigrateArgs};
use crate::commands::common::{engine_error, plural};
use crate::context::RuntimeContext;

/// Execute the migrate command
pub async fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let options = RunOptions {
        force: args.force,
        dry_run: args.dry_run,
        target: run_target(args)?,
        strict_checksums: args.strict_checksums,
    };

    let report = ctx
        .runner
        .run(&ctx.db, &options)
        .await
        .map_err(engine_error)?;

    for id in &report.skipped_dirty {
        println!("  Skipped (dirty): {id}");
    }
    for id in &report.drifted {
        println!("  Changed since applied: {id}");
    }

    if report.is_noop() {
        println!(
            "Nothing to migrate ({} already applied)",
            report.already_applied
        );
        return Ok(());
    }

    if report.dry_run {
        println!("Dry run - would apply {}:", plural(report.planned.len(), "migration"));
        for id in &report.planned {
            println!("  {id}");
        }
    } else {
        for id in &report.applied {
            println!("  Applied: {id}");
        }
        println!();
        println!("Applied {}", plural(report.applied.len(), "migration"));
    }
    Ok(())
}

fn run_target(args: &MigrateArgs) -> Result<RunTarget> {
    match (&args.to, args.steps) {
        (Some(id), _) => {
            let id = MigrationId::try_new(id.clone())
                .with_context(|| format!("Invalid migration id '{id}'"))?;
            Ok(RunTarget::UpTo(id))
        }
        (None, Some(n)) => Ok(RunTarget::Steps(n)),
        (None, None) => Ok(RunTarget::All),
    }
}
