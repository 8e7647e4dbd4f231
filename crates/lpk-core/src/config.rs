//! User configuration: `config.toml` plus environment overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::manifest::ManifestMode;
use crate::paths::Layout;

/// Default authority of asset addresses handed to launched units.
pub const DEFAULT_ASSET_AUTHORITY: &str = "com.eidu.integration.test.app.assets";
/// Default action a unit's launch activity must handle.
pub const DEFAULT_LAUNCH_ACTION: &str = "com.eidu.integration.LAUNCH_LEARNING_UNIT";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value '{value}' for {key}")]
    InvalidEnv { key: &'static str, value: String },
}

/// Values used to fill a launch request when the caller gives none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestDefaults {
    pub run_id: String,
    pub learner_id: String,
    pub school_id: String,
    pub stage: String,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            run_id: "Test Run".to_string(),
            learner_id: "Test Learner".to_string(),
            school_id: "Test School".to_string(),
            stage: "test".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where application metadata is read from during import.
    pub manifest_mode: ManifestMode,
    /// Number of loaded packages kept by the asset server.
    pub cache_size: usize,
    pub asset_authority: String,
    pub launch_action: String,
    pub request: RequestDefaults,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifest_mode: ManifestMode::Auto,
            cache_size: 8,
            asset_authority: DEFAULT_ASSET_AUTHORITY.to_string(),
            launch_action: DEFAULT_LAUNCH_ACTION.to_string(),
            request: RequestDefaults::default(),
        }
    }
}

impl Config {
    /// Load `config.toml` from the layout (defaults when absent) and apply
    /// `LPK_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed, or an override
    /// has an invalid value.
    pub fn load(layout: &Layout) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(&layout.config_path())?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a config file; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// See [`ConfigError::Read`] and [`ConfigError::Parse`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(toml::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// Apply overrides from `lookup` (normally the process environment).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] for unparsable values.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup("LPK_MANIFEST_MODE") {
            self.manifest_mode = value.parse().map_err(|_| ConfigError::InvalidEnv {
                key: "LPK_MANIFEST_MODE",
                value,
            })?;
        }
        if let Some(value) = lookup("LPK_CACHE_SIZE") {
            self.cache_size = value.parse().map_err(|_| ConfigError::InvalidEnv {
                key: "LPK_CACHE_SIZE",
                value,
            })?;
        }
        if let Some(value) = lookup("LPK_ASSET_AUTHORITY") {
            self.asset_authority = value;
        }
        if let Some(value) = lookup("LPK_LAUNCH_ACTION") {
            self.launch_action = value;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_file(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.request.learner_id, "Test Learner");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "manifest_mode = \"apk\"\ncache_size = 2\n[request]\nstage = \"prod\"\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.manifest_mode, ManifestMode::Apk);
        assert_eq!(config.cache_size, 2);
        assert_eq!(config.request.stage, "prod");
        assert_eq!(config.request.run_id, "Test Run");
        assert_eq!(config.launch_action, DEFAULT_LAUNCH_ACTION);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("LPK_MANIFEST_MODE", "metadata"),
            ("LPK_ASSET_AUTHORITY", "org.test.assets"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env(|k| env.get(k).map(ToString::to_string))
            .unwrap();
        assert_eq!(config.manifest_mode, ManifestMode::Metadata);
        assert_eq!(config.asset_authority, "org.test.assets");
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = Config::default();
        let err = config
            .apply_env(|k| (k == "LPK_CACHE_SIZE").then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: "LPK_CACHE_SIZE", .. }));
    }
}
