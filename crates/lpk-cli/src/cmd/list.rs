//! List command

use anyhow::{Result, anyhow};
use lpk_schema::Outcome;

use super::Globals;
use crate::ops::query::list_apps;
use crate::ui::table::apps_table;

/// List all imported learning apps
pub async fn list(globals: &Globals, json: bool) -> Result<()> {
    let ctx = globals.context()?;
    let apps = match list_apps(&ctx).await {
        Outcome::Success(apps) => apps,
        Outcome::Error(reason) => return Err(anyhow!(reason)),
        Outcome::Loading | Outcome::NotFound => Vec::new(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&apps)?);
        return Ok(());
    }

    if apps.is_empty() {
        println!();
        println!("  No learning apps imported.");
        println!("  Run 'lpk import <package.zip>' to get started.");
        return Ok(());
    }

    println!("{}", apps_table(&apps));
    println!();
    println!("  {} learning app{}", apps.len(), if apps.len() == 1 { "" } else { "s" });
    Ok(())
}
