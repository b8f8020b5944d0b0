//! Validate command implementation

use anyhow::Result;

use crate::cli::GlobalArgs;
use crate::commands::common::{engine_error, plural, print_table, ExitCode, EXIT_DRIFT};
use crate::context::RuntimeContext;

/// Execute the validate command
pub async fn execute(global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let mismatches = ctx.runner.validate(&ctx.db).await.map_err(engine_error)?;

    if mismatches.is_empty() {
        println!("All applied migrations match their definitions");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = mismatches
        .iter()
        .map(|m| {
            vec![
                m.id.to_string(),
                short_checksum(&m.recorded),
                short_checksum(&m.current),
            ]
        })
        .collect();
    print_table(&["ID", "RECORDED", "CURRENT"], &rows);
    println!();
    println!(
        "{} changed since applied",
        plural(mismatches.len(), "migration")
    );
    Err(ExitCode(EXIT_DRIFT).into())
}

fn short_checksum(checksum: &str) -> String {
    checksum.chars().take(12).collect()
}
