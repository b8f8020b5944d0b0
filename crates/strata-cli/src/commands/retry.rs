//! Retry command implementation

use anyhow::Result;

use crate::cli::{GlobalArgs, RetryArgs};
use crate::commands::common::engine_error;
use crate::context::RuntimeContext;

/// Execute the retry command
pub async fn execute(args: &RetryArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    ctx.runner
        .recovery()
        .retry(&ctx.db, &args.id)
        .await
        .map_err(engine_error)?;

    println!("Retried {}: completed", args.id);
    println!("Run `strata migrate` to apply the remaining pending migrations.");
    Ok(())
}
