//! Remove command

use anyhow::{Result, bail};
use lpk_schema::Outcome;

use super::{Globals, package_id};
use crate::ops::remove::remove;

/// Remove learning apps together with their units and files.
pub async fn remove_apps(globals: &Globals, packages: &[String]) -> Result<()> {
    let packages = packages
        .iter()
        .map(|p| package_id(p))
        .collect::<Result<Vec<_>>>()?;
    let ctx = globals.context()?;

    let mut removed = 0usize;
    let mut missing = Vec::new();
    for package in &packages {
        match remove(&ctx, package).await {
            Outcome::Success(()) => removed += 1,
            Outcome::NotFound => missing.push(package.to_string()),
            Outcome::Error(reason) => bail!("Failed to remove {package}: {reason}"),
            Outcome::Loading => {}
        }
    }

    if removed > 0 {
        ctx.reporter.success(&format!(
            "{removed} learning app{} removed",
            if removed == 1 { "" } else { "s" }
        ));
    }
    if !missing.is_empty() {
        bail!("Not imported: {}", missing.join(", "));
    }
    Ok(())
}
