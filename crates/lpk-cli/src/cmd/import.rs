//! Import command

use std::path::PathBuf;

use anyhow::{Result, bail};
use lpk_core::catalog::CatalogStatus;
use tokio_util::sync::CancellationToken;

use super::Globals;
use crate::ops::import::import_file;

pub async fn import(globals: &Globals, archives: &[PathBuf]) -> Result<()> {
    let ctx = globals.context()?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling import");
            on_interrupt.cancel();
        }
    });

    let mut failed = 0usize;
    for archive in archives {
        if cancel.is_cancelled() {
            break;
        }
        match import_file(&ctx, archive, &cancel).await {
            Ok(imported) => {
                if imported.catalog == CatalogStatus::NotFound {
                    ctx.reporter.info(&format!(
                        "{} has no unit catalog; add units with 'lpk unit add'",
                        imported.app.package
                    ));
                }
            }
            // The reporter has already shown the reason.
            Err(_) => failed += 1,
        }
    }
    watcher.abort();

    if cancel.is_cancelled() {
        bail!("Import cancelled");
    }
    if failed > 0 {
        bail!("{failed} of {} imports failed", archives.len());
    }
    let n = archives.len();
    ctx.reporter
        .success(&format!("{n} package{} imported", if n == 1 { "" } else { "s" }));
    Ok(())
}
