//! Learning app removal.
//!
//! Deleting an app cascades: the database record and its units, the package
//! tree under `store/`, and the asset server's loaded copy all go.

use lpk_schema::{Outcome, PackageId};

use crate::ops::{Context, ImportError};

/// Remove `package`. Returns `false` if nothing was installed.
pub async fn remove_app(ctx: &Context, package: &PackageId) -> Result<bool, ImportError> {
    ctx.reporter.section("Removing");
    let _guard = ctx.gate.write(package.as_str()).await;
    ctx.reporter.removing(package.as_str());

    // A record may outlive its tree, never the other way round.
    let had_files = {
        let store = ctx.store.clone();
        let package = package.clone();
        tokio::task::spawn_blocking(move || store.remove(&package)).await??
    };
    let had_record = ctx.db.delete_app(package).await?;
    ctx.assets.invalidate(package).await;

    if !had_record && !had_files {
        ctx.reporter.failed(package.as_str(), "not installed");
        return Ok(false);
    }
    if had_record != had_files {
        tracing::warn!(package = %package, had_record, had_files, "record and package tree were out of sync");
    }

    if let Err(e) = ctx.db.add_history(package, "remove", String::new()).await {
        tracing::warn!(package = %package, error = %e, "failed to record removal history");
    }
    ctx.reporter.done(package.as_str(), "removed");
    Ok(true)
}

/// [`remove_app`] as an [`Outcome`]; an unknown package is `NotFound`.
pub async fn remove(ctx: &Context, package: &PackageId) -> Outcome<()> {
    match remove_app(ctx, package).await {
        Ok(true) => Outcome::Success(()),
        Ok(false) => Outcome::NotFound,
        Err(e) => Outcome::error(e),
    }
}
