//! Command implementations. Each returns `anyhow::Result<()>` and prints its
//! own output; the binary only maps the error to an exit code.

pub mod asset;
pub mod edit;
pub mod history;
pub mod import;
pub mod launch;
pub mod list;
pub mod remove;
pub mod respond;
pub mod result;
pub mod unit;
pub mod units;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use lpk_core::{Config, Layout, Reporter};
use lpk_schema::PackageId;

use crate::ops::Context;
use crate::ui::ConsoleReporter;

/// Flags shared by every command.
#[derive(Debug, Clone, Default)]
pub struct Globals {
    pub home: Option<PathBuf>,
    pub quiet: bool,
}

impl Globals {
    pub fn layout(&self) -> Result<Layout> {
        match &self.home {
            Some(home) => Ok(Layout::new(home)),
            None => Layout::discover()
                .context("Could not determine the home directory; set LPK_HOME"),
        }
    }

    /// Open the home directory with a console reporter.
    pub fn context(&self) -> Result<Context> {
        let layout = self.layout()?;
        let config = Config::load(&layout).context("Failed to load configuration")?;
        let reporter: Arc<dyn Reporter> = Arc::new(ConsoleReporter::new(self.quiet));
        Context::open(layout, config, reporter).context("Failed to open lpk home")
    }
}

pub(crate) fn package_id(raw: &str) -> Result<PackageId> {
    PackageId::new(raw).with_context(|| format!("'{raw}' is not a valid package identifier"))
}

/// Write `text` to `out`, or to stdout when no file is given.
pub(crate) fn emit(text: &str, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}
