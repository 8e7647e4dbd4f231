use dirs::home_dir;
use lpk_schema::PackageId;
use std::path::{Path, PathBuf};

/// Environment variable overriding the lpk home directory.
pub const HOME_ENV: &str = "LPK_HOME";

/// Returns the lpk home directory, or None if the user's home cannot be resolved.
pub fn try_lpk_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var(HOME_ENV) {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".lpk"))
}

/// On-disk layout rooted at the lpk home directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout at [`try_lpk_home`].
    pub fn discover() -> Option<Self> {
        try_lpk_home().map(Self::new)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Installed packages: `<home>/store`
    pub fn store_dir(&self) -> PathBuf {
        self.root.join("store")
    }

    /// Scratch space: `<home>/tmp` (same volume as the store, so renames are atomic)
    pub fn tmp_dir(&self) -> PathBuf {
        self.root.join("tmp")
    }

    /// `SQLite` database: `<home>/state.db`
    pub fn db_path(&self) -> PathBuf {
        self.root.join("state.db")
    }

    /// Optional user configuration: `<home>/config.toml`
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Install directory of one package: `<home>/store/<package>`
    pub fn package_dir(&self, package: &PackageId) -> PathBuf {
        self.store_dir().join(package.as_str())
    }

    /// Create the directories the layout relies on.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error if a directory cannot be created.
    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.store_dir())?;
        std::fs::create_dir_all(self.tmp_dir())?;
        Ok(())
    }
}
