//! mark-completed and mark-all-completed command implementations
//!
//! Both record migrations as applied without running them. The prompts live
//! here; the engine only checks the consent values it is handed.

use anyhow::Result;
use strata_migrate::{ConfirmGate, DropAcknowledgement, MarkScope};

use crate::cli::{GlobalArgs, MarkAllCompletedArgs, MarkCompletedArgs};
use crate::commands::common::{confirm, engine_error, prompt, ExitCode};
use crate::context::RuntimeContext;

/// Execute the mark-completed command
pub async fn execute_one(args: &MarkCompletedArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let gate = gate(
        args.force,
        &format!(
            "Mark {} as completed without running it? The database may not match the recorded state.",
            args.id
        ),
    )?;

    let changed = ctx
        .runner
        .recovery()
        .mark_completed(&ctx.db, &args.id, gate)
        .await
        .map_err(engine_error)?;

    if changed {
        println!("Marked {} as completed", args.id);
    } else {
        println!("{} is already completed", args.id);
    }
    Ok(())
}

/// Execute the mark-all-completed command
pub async fn execute_all(args: &MarkAllCompletedArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let scope = MarkScope::from_flags(args.include_failed, args.include_in_progress, args.all);

    // Collect every consent before changing anything.
    let ack = if args.drop {
        Some(drop_acknowledgement(args, ctx.tracking_table())?)
    } else {
        None
    };
    let gate = gate(
        args.force,
        &format!("Mark migrations as completed without running them (scope: {scope:?})?"),
    )?;

    let recovery = ctx.runner.recovery();
    if let Some(ack) = ack {
        recovery
            .drop_and_recreate(&ctx.db, &ack)
            .await
            .map_err(engine_error)?;
        println!("Dropped and recreated {}", ctx.tracking_table());
    }

    let summary = recovery
        .mark_all_completed(&ctx.db, scope, gate)
        .await
        .map_err(engine_error)?;

    println!("Migrations:        {}", summary.total);
    println!("Already completed: {}", summary.already_completed);
    println!("Newly marked:      {}", summary.newly_marked);
    if summary.failed_marked + summary.failed_skipped > 0 {
        println!(
            "Failed:            {} marked, {} skipped",
            summary.failed_marked, summary.failed_skipped
        );
    }
    if summary.in_progress_marked + summary.in_progress_skipped > 0 {
        println!(
            "In progress:       {} marked, {} skipped",
            summary.in_progress_marked, summary.in_progress_skipped
        );
    }
    Ok(())
}

/// `--force` skips the prompt; declining it aborts with exit code 1.
fn gate(force: bool, question: &str) -> Result<ConfirmGate> {
    if force {
        return Ok(ConfirmGate::forced());
    }
    if confirm(question)? {
        Ok(ConfirmGate::confirmed())
    } else {
        println!("Aborted");
        Err(ExitCode(1).into())
    }
}

/// The table name comes from `--confirm-table` or is typed at a prompt.
fn drop_acknowledgement(args: &MarkAllCompletedArgs, table: &str) -> Result<DropAcknowledgement> {
    let typed = match &args.confirm_table {
        Some(name) => name.clone(),
        None => {
            println!("This deletes all migration history in {table}.");
            prompt(&format!("Type the table name ({table}) to confirm: "))?
        }
    };
    Ok(DropAcknowledgement {
        confirmed: true,
        table_name: typed,
    })
}
