//! Edit command

use anyhow::{Result, bail};

use super::{Globals, package_id};
use crate::ops::edit::{AppEdit, edit_app};

pub async fn edit(
    globals: &Globals,
    package: &str,
    name: Option<String>,
    activity: Option<String>,
) -> Result<()> {
    let package = package_id(package)?;
    if name.is_none() && activity.is_none() {
        bail!("Nothing to change; pass --name and/or --activity");
    }
    let ctx = globals.context()?;

    let app = edit_app(
        &ctx,
        &package,
        AppEdit {
            display_name: name,
            launch_activity: activity,
        },
    )
    .await?;

    ctx.reporter.success(&format!(
        "{} '{}' launches {}",
        app.package,
        app.display_name,
        app.launch_class()
    ));
    Ok(())
}
