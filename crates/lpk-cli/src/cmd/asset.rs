//! Asset command

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use super::Globals;
use crate::ui::theme::format_size;

/// Read an asset the way a launched unit would.
pub async fn asset(globals: &Globals, uri: &str, out: Option<&Path>) -> Result<()> {
    let ctx = globals.context()?;
    let asset = ctx.assets.open(uri).await?;

    ctx.reporter.info(&format!(
        "{} ({}, {})",
        asset.path,
        asset.mime_type,
        format_size(asset.bytes.len() as u64)
    ));

    match out {
        Some(path) => std::fs::write(path, &asset.bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => std::io::stdout()
            .lock()
            .write_all(&asset.bytes)
            .context("Failed to write asset to stdout")?,
    }
    Ok(())
}
