//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::io::{self, BufRead, Write};
use strata_migrate::{Direction, MigrateError};

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and the database is closed cleanly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Empty: the command already printed what went wrong.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// `validate` found applied migrations whose definition changed.
pub(crate) const EXIT_DRIFT: i32 = 2;

/// The tracking table holds failed or in-progress records.
pub(crate) const EXIT_DIRTY: i32 = 3;

/// A migration or rollback step failed and the operation stopped.
pub(crate) const EXIT_HALTED: i32 = 4;

/// Report engine errors that have a dedicated exit code and turn them into
/// [`ExitCode`]; everything else propagates unchanged.
pub(crate) fn engine_error(err: MigrateError) -> anyhow::Error {
    match &err {
        MigrateError::DirtyState { dirty, .. } => {
            eprintln!("Error: {err}");
            for id in dirty {
                eprintln!("  dirty: {id}");
            }
            eprintln!("Run `strata status --show-failed` for details.");
            ExitCode(EXIT_DIRTY).into()
        }
        MigrateError::Execution {
            direction,
            completed,
            ..
        } => {
            let verb = match direction {
                Direction::Up => "Applied",
                Direction::Down => "Rolled back",
            };
            for id in completed {
                println!("  {verb}: {id}");
            }
            if !completed.is_empty() {
                println!("{verb} {} before the failure", plural(completed.len(), "migration"));
            }
            eprintln!("Error: {err}");
            ExitCode(EXIT_HALTED).into()
        }
        _ => err.into(),
    }
}

/// Ask a yes/no question on stdin. Anything but `y`/`yes` is a no.
pub(crate) fn confirm(question: &str) -> Result<bool> {
    let stdin = io::stdin();
    confirm_from(&mut stdin.lock(), question)
}

pub(crate) fn confirm_from(reader: &mut impl BufRead, question: &str) -> Result<bool> {
    let answer = prompt_from(reader, &format!("{question} [y/N] "))?;
    Ok(matches!(
        answer.to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

/// Print `question` and read one trimmed line from stdin.
pub(crate) fn prompt(question: &str) -> Result<String> {
    let stdin = io::stdin();
    prompt_from(&mut stdin.lock(), question)
}

pub(crate) fn prompt_from(reader: &mut impl BufRead, question: &str) -> Result<String> {
    print!("{question}");
    io::stdout().flush().context("Failed to flush stdout")?;
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("Failed to read answer from stdin")?;
    Ok(line.trim().to_string())
}

/// Render an optional timestamp for table output.
pub(crate) fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Calculate column widths for a table.
pub(crate) fn calculate_column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.len());
        }
    }
    widths
}

/// Print a formatted table to stdout.
///
/// A left-aligned header row, a separator line of dashes, then each data
/// row. Columns are separated by two spaces.
pub(crate) fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let widths = calculate_column_widths(headers, rows);

    let header_parts: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, &w)| format!("{:<width$}", h, width = w))
        .collect();
    println!("{}", header_parts.join("  ").trim_end());

    let sep_parts: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep_parts.join("  "));

    for row in rows {
        let row_parts: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{:<width$}", cell, width = w))
            .collect();
        println!("{}", row_parts.join("  ").trim_end());
    }
}

/// `1 migration` / `3 migrations`
pub(crate) fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
