//! Rollback command implementation

use anyhow::Result;

use crate::cli::{GlobalArgs, RollbackArgs};
use crate::commands::common::{engine_error, plural};
use crate::context::RuntimeContext;

/// Execute the rollback command
pub async fn execute(args: &RollbackArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let report = ctx
        .runner
        .rollback_engine()
        .rollback(&ctx.db, &args.strategy, args.dry_run)
        .await
        .map_err(engine_error)?;

    if report.is_noop() {
        println!("Nothing to roll back");
        return Ok(());
    }

    if report.dry_run {
        println!(
            "Dry run - would roll back {} ({}):",
            plural(report.planned.len(), "migration"),
            args.strategy
        );
        for id in &report.planned {
            println!("  {id}");
        }
    } else {
        for id in &report.rolled_back {
            println!("  Rolled back: {id}");
        }
        println!();
        println!(
            "Rolled back {}",
            plural(report.rolled_back.len(), "migration")
        );
    }
    Ok(())
}
