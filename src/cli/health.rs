//! Health command

use crate::AppContext;

use super::print_json;

/// Prints the health report; fails when the store is unreachable
pub async fn run(ctx: &AppContext) -> anyhow::Result<()> {
    let report = ctx.health().await;
    print_json(&report)?;

    if report.is_unhealthy() {
        anyhow::bail!("User store is unavailable");
    }

    Ok(())
}
