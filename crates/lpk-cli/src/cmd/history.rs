//! History command

use anyhow::{Context, Result};

use super::{Globals, package_id};
use crate::ui::table::history_table;

pub async fn history(globals: &Globals, package: &str) -> Result<()> {
    let package = package_id(package)?;
    let ctx = globals.context()?;

    let events = ctx
        .db
        .history(package.as_str())
        .await
        .context("Failed to read history")?;

    if events.is_empty() {
        println!("No history found for '{package}'");
        return Ok(());
    }

    println!("History for '{package}':");
    println!("{}", history_table(&events));
    Ok(())
}
