//! Learning package import.
//!
//! An import runs strictly in order:
//!
//! 1. hash and extract the archive into a fresh directory under `tmp/`
//! 2. read application metadata (sidecar or APK manifest)
//! 3. read the unit catalog; a missing or broken catalog still imports the app
//! 4. swap the extracted tree into `store/<package>`, keeping a backup
//! 5. upsert the app and replace its unit set in one transaction
//!
//! Steps 4 and 5 run under the package's write gate in a detached task, so a
//! cancelled caller never leaves a half-swapped install behind. If step 5
//! fails the backup is restored.

use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lpk_core::Reporter;
use lpk_core::catalog::{CatalogStatus, load_catalog, resolve_units};
use lpk_core::io::extract::extract_zip_with_progress;
use lpk_core::manifest::read_application_metadata;
use lpk_schema::{LearningApp, LearningUnit, Outcome};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use crate::ops::{Context, ImportError};

/// What an import produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedPackage {
    pub app: LearningApp,
    pub units: Vec<LearningUnit>,
    pub catalog: CatalogStatus,
    /// Hex SHA-256 of the archive.
    pub sha256: String,
    /// Whether a previous import of the same package was replaced.
    pub replaced: bool,
}

/// Import the archive at `path`, reporting the result as an [`Outcome`].
pub async fn import(
    ctx: &Context,
    path: &Path,
    cancel: &CancellationToken,
) -> Outcome<ImportedPackage> {
    import_file(ctx, path, cancel).await.into()
}

/// Import the archive at `path`.
pub async fn import_file(
    ctx: &Context,
    path: &Path,
    cancel: &CancellationToken,
) -> Result<ImportedPackage, ImportError> {
    let file = {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || std::fs::File::open(path)).await?
    }
    .map_err(|e| ImportError::context(format!("Failed to open {}", path.display()), e))?;
    let source = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    import_reader(ctx, &source, BufReader::new(file), cancel).await
}

/// Import an archive from any seekable stream. `source` names it in reports.
pub async fn import_reader<R>(
    ctx: &Context,
    source: &str,
    reader: R,
    cancel: &CancellationToken,
) -> Result<ImportedPackage, ImportError>
where
    R: Read + Seek + Send + 'static,
{
    ctx.reporter.section("Importing");
    match run_import(ctx, source, reader, cancel).await {
        Ok(imported) => {
            ctx.reporter.done(
                imported.app.package.as_str(),
                &format!("{} ({})", imported.app.display_name, imported.catalog),
            );
            Ok(imported)
        }
        Err(e) => {
            tracing::warn!(source, error = %e, "import failed");
            ctx.reporter.failed(source, &e.to_string());
            Err(e)
        }
    }
}

async fn run_import<R>(
    ctx: &Context,
    source: &str,
    reader: R,
    cancel: &CancellationToken,
) -> Result<ImportedPackage, ImportError>
where
    R: Read + Seek + Send + 'static,
{
    let tmp = ctx.layout.tmp_dir();
    std::fs::create_dir_all(&tmp)?;
    let staging = tempfile::Builder::new().prefix("import-").tempdir_in(&tmp)?;
    let content_dir = staging.path().join("content");

    let sha256 = {
        let dest = content_dir.clone();
        let reporter = Arc::clone(&ctx.reporter);
        let source = source.to_string();
        tokio::task::spawn_blocking(move || extract_archive(reader, &dest, &source, &*reporter))
            .await??
    };
    check_cancelled(cancel)?;

    ctx.reporter.parsing("application manifest");
    let metadata = {
        let dir = content_dir.clone();
        let mode = ctx.config.manifest_mode;
        let action = ctx.config.launch_action.clone();
        tokio::task::spawn_blocking(move || read_application_metadata(&dir, mode, &action))
            .await??
    };
    let app = LearningApp::from_metadata(metadata)?;
    tracing::debug!(package = %app.package, activity = %app.launch_activity, "read application metadata");

    ctx.reporter.parsing("unit catalog");
    let loaded = {
        let dir = content_dir.clone();
        tokio::task::spawn_blocking(move || load_catalog(&dir)).await?
    };
    let (units, catalog) = resolve_units(&app.package, loaded);
    if let CatalogStatus::Error(reason) = &catalog {
        ctx.reporter.warning(&format!("Ignoring unit catalog of {}: {reason}", app.package));
    }
    check_cancelled(cancel)?;

    // Past this point the swap always runs to completion, even if the
    // caller stops waiting.
    let swap = SwapJob {
        ctx: ctx.clone(),
        app: app.clone(),
        units: units.clone(),
        content_dir,
        staging,
        sha256: sha256.clone(),
        catalog: catalog.clone(),
    };
    let replaced = tokio::spawn(swap.run()).await??;

    tracing::info!(package = %app.package, units = units.len(), replaced, "imported learning package");
    Ok(ImportedPackage {
        app,
        units,
        catalog,
        sha256,
        replaced,
    })
}

fn extract_archive<R: Read + Seek>(
    mut reader: R,
    dest: &Path,
    source: &str,
    reporter: &dyn Reporter,
) -> Result<String, ImportError> {
    let mut hasher = Sha256::new();
    std::io::copy(&mut reader, &mut hasher)?;
    let sha256 = hex::encode(hasher.finalize());
    reader.rewind()?;

    let files = extract_zip_with_progress(reader, dest, |done, total| {
        reporter.extracting(source, done, Some(total));
    })?;
    tracing::debug!(source, files = files.len(), %sha256, "extracted archive");
    Ok(sha256)
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), ImportError> {
    if cancel.is_cancelled() {
        return Err(ImportError::Cancelled);
    }
    Ok(())
}

struct SwapJob {
    ctx: Context,
    app: LearningApp,
    units: Vec<LearningUnit>,
    content_dir: PathBuf,
    /// Removed on drop, together with anything the swap did not consume.
    staging: TempDir,
    sha256: String,
    catalog: CatalogStatus,
}

impl SwapJob {
    async fn run(self) -> Result<bool, ImportError> {
        let ctx = &self.ctx;
        let package = self.app.package.clone();
        let _guard = ctx.gate.write(package.as_str()).await;
        ctx.reporter.installing(package.as_str());

        let pending = {
            let store = ctx.store.clone();
            let package = package.clone();
            let dir = self.content_dir.clone();
            tokio::task::spawn_blocking(move || store.install(&package, &dir)).await??
        };
        let replaced = pending.replaced_existing();

        if let Err(e) = ctx
            .db
            .commit_import(self.app.clone(), self.units.clone())
            .await
        {
            let rollback = tokio::task::spawn_blocking(move || pending.rollback()).await?;
            if let Err(restore) = rollback {
                tracing::error!(package = %package, error = %restore, "failed to restore previous package tree");
            }
            ctx.assets.invalidate(&package).await;
            return Err(e.into());
        }
        tokio::task::spawn_blocking(move || pending.commit()).await??;
        ctx.assets.invalidate(&package).await;

        let detail = format!("{} [{}] sha256:{}", self.app.display_name, self.catalog, self.sha256);
        if let Err(e) = ctx.db.add_history(&package, "import", detail).await {
            tracing::warn!(package = %package, error = %e, "failed to record import history");
        }
        drop(self.staging);
        Ok(replaced)
    }
}
