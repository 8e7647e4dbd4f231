//! Manual edits of app records and unit sets.
//!
//! These cover packages whose catalog was missing or broken: the app can be
//! renamed or re-pointed at another launch activity, and units can be added
//! one at a time.

use lpk_schema::{LearningApp, LearningUnit, PackageId, UNKNOWN_APPLICATION};

use crate::ops::{Context, ImportError};

/// Fields to change on an app record. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct AppEdit {
    pub display_name: Option<String>,
    pub launch_activity: Option<String>,
}

/// Update the record of `package`, creating it if needed.
///
/// A new record needs a launch activity; its name defaults to
/// "Unknown Application".
pub async fn edit_app(
    ctx: &Context,
    package: &PackageId,
    edit: AppEdit,
) -> Result<LearningApp, ImportError> {
    let _guard = ctx.gate.write(package.as_str()).await;

    let app = match ctx.db.find_app(package).await? {
        Some(mut app) => {
            if let Some(name) = edit.display_name {
                app.display_name = name;
            }
            if let Some(activity) = edit.launch_activity {
                app.launch_activity = activity;
            }
            app
        }
        None => {
            let activity = edit.launch_activity.ok_or_else(|| {
                ImportError::Other(format!(
                    "{package} is not imported; a launch activity is required to create it"
                ))
            })?;
            LearningApp {
                display_name: edit
                    .display_name
                    .unwrap_or_else(|| UNKNOWN_APPLICATION.to_string()),
                package: package.clone(),
                launch_activity: activity,
            }
        }
    };

    if app.display_name.trim().is_empty() || app.launch_activity.trim().is_empty() {
        return Err(ImportError::Other(
            "name and launch activity must not be empty".to_string(),
        ));
    }

    ctx.db.upsert_app(app.clone()).await?;
    ctx.assets.invalidate(package).await;
    record(ctx, package, "edit", format!("{} -> {}", app.display_name, app.launch_activity)).await;
    Ok(app)
}

/// Add `unit` to its app, replacing a unit with the same id in place.
/// Returns the new unit set.
pub async fn add_unit(ctx: &Context, unit: LearningUnit) -> Result<Vec<LearningUnit>, ImportError> {
    let package = unit.package.clone();
    let _guard = ctx.gate.write(package.as_str()).await;

    let mut units = ctx.db.units(&package).await?;
    let detail = unit.unit_id.to_string();
    match units.iter_mut().find(|u| u.unit_id == unit.unit_id) {
        Some(existing) => *existing = unit,
        None => units.push(unit),
    }

    ctx.db.replace_units(&package, units.clone()).await?;
    ctx.assets.invalidate(&package).await;
    record(ctx, &package, "unit-add", detail).await;
    Ok(units)
}

async fn record(ctx: &Context, package: &PackageId, action: &str, detail: String) {
    if let Err(e) = ctx.db.add_history(package, action, detail).await {
        tracing::warn!(package = %package, action, error = %e, "failed to record history");
    }
}
