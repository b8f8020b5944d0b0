//! Status command implementation

use anyhow::{Context, Result};
use strata_migrate::{StatusEntry, StatusReport};

use crate::cli::{GlobalArgs, OutputFormat, StatusArgs};
use crate::commands::common::{engine_error, format_timestamp, print_table};
use crate::context::RuntimeContext;

/// Execute the status command
pub async fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let report = ctx.runner.status(&ctx.db).await.map_err(engine_error)?;

    match args.output {
        OutputFormat::Json => print_json(&report, args.show_failed),
        OutputFormat::Table if args.show_failed => {
            print_failed(&report);
            Ok(())
        }
        OutputFormat::Table => {
            print_all(&report, &ctx);
            Ok(())
        }
    }
}

fn print_json(report: &StatusReport, show_failed: bool) -> Result<()> {
    let serialized = if show_failed {
        serde_json::to_string_pretty(&report.failed())
    } else {
        serde_json::to_string_pretty(report)
    };
    let json = serialized.context("Failed to serialize status")?;
    println!("{json}");
    Ok(())
}

fn print_all(report: &StatusReport, ctx: &RuntimeContext) {
    if report.entries.is_empty() {
        println!("No migrations found in {}", ctx.migrations_path.display());
    } else {
        let rows: Vec<Vec<String>> = report.entries.iter().map(entry_row).collect();
        print_table(&["ID", "STATE", "FINISHED", "NOTES"], &rows);
    }

    if !report.orphaned.is_empty() {
        println!();
        println!(
            "Records in {} with no matching migration:",
            ctx.tracking_table()
        );
        for record in &report.orphaned {
            println!("  {} ({})", record.id, record.status);
        }
    }

    let counts = report.counts();
    println!();
    println!(
        "{} total: {} completed, {} pending, {} failed, {} in progress",
        counts.total, counts.completed, counts.pending, counts.failed, counts.in_progress
    );
    if report.is_dirty() {
        println!("Dirty state: run `strata status --show-failed`, then `strata retry <id>` or `strata mark-completed <id>`.");
    }
}

fn entry_row(entry: &StatusEntry) -> Vec<String> {
    let mut notes = Vec::new();
    if entry.drifted {
        notes.push("changed since applied");
    }
    if !entry.reversible {
        notes.push("irreversible");
    }
    vec![
        entry.id.to_string(),
        entry.state.to_string(),
        format_timestamp(entry.finished_at),
        notes.join(", "),
    ]
}

fn print_failed(report: &StatusReport) {
    let failed = report.failed();
    if failed.is_empty() {
        println!("No failed or in-progress migrations");
        return;
    }

    for entry in &failed {
        if entry.orphaned {
            println!("{} ({}, no matching migration)", entry.id, entry.state);
        } else {
            println!("{} ({})", entry.id, entry.state);
        }
        println!("  started:  {}", format_timestamp(entry.started_at));
        println!("  finished: {}", format_timestamp(entry.finished_at));
        match &entry.failure_reason {
            Some(reason) => println!("  error:    {reason}"),
            None => println!("  error:    interrupted before completion"),
        }
    }
}
