//! Unit management commands

use anyhow::{Context as _, Result};
use lpk_schema::{LearningUnit, UnitId};

use super::{Globals, package_id};
use crate::ops::edit::add_unit;

/// Add (or replace) a unit of an imported app by hand.
pub async fn add(
    globals: &Globals,
    package: &str,
    unit: &str,
    icon: &str,
    assets: &[String],
) -> Result<()> {
    let package = package_id(package)?;
    let unit_id = UnitId::new(unit.trim());
    if unit_id.as_str().is_empty() {
        anyhow::bail!("Unit id must not be empty");
    }
    let ctx = globals.context()?;

    let unit = LearningUnit::new(package.clone(), unit_id, icon, assets.to_vec());
    let units = add_unit(&ctx, unit)
        .await
        .with_context(|| format!("Failed to add unit to {package}"))?;

    ctx.reporter
        .success(&format!("{package} now has {} unit(s)", units.len()));
    Ok(())
}
