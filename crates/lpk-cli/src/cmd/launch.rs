//! Launch command

use std::path::Path;

use anyhow::{Result, anyhow, bail};
use lpk_schema::{Outcome, UnitId};

use super::{Globals, emit, package_id};
use crate::ops::launch::{LaunchOptions, launch};

/// Print the transport message that launches `unit` of `package`.
pub async fn launch_unit(
    globals: &Globals,
    package: &str,
    unit: &str,
    options: &LaunchOptions,
    out: Option<&Path>,
) -> Result<()> {
    let package = package_id(package)?;
    let unit = UnitId::new(unit);
    let ctx = globals.context()?;

    let prepared = match launch(&ctx, &package, &unit, options).await {
        Outcome::Success(prepared) => prepared,
        Outcome::Error(reason) => return Err(anyhow!(reason)),
        Outcome::NotFound | Outcome::Loading => bail!("{package} is not imported"),
    };

    emit(&serde_json::to_string_pretty(&prepared.message)?, out)?;
    if let Some(path) = out {
        ctx.reporter.success(&format!(
            "Launch request for {} / {} written to {}",
            prepared.app.display_name,
            prepared.unit.unit_id,
            path.display()
        ));
    }
    Ok(())
}
