//! Application manifest discovery and parsing.
//!
//! An extracted learning package describes its application either through a
//! single `.apk` (whose `AndroidManifest.xml` is read) or through an
//! `application-metadata.json` sidecar. [`ManifestMode`] picks the source.

pub mod apk;
pub mod axml;
pub mod metadata;
pub mod xml;

use lpk_schema::ApplicationMetadata;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the JSON sidecar describing the application.
pub const METADATA_FILE: &str = "application-metadata.json";

#[derive(thiserror::Error, Debug)]
pub enum ManifestError {
    #[error("not exactly one manifest source (found {found})")]
    NoManifestSource { found: usize },

    #[error("no matching launch activity (found {found})")]
    NoLaunchActivity { found: usize },

    #[error("malformed metadata: {0}")]
    MalformedMetadata(String),

    #[error("manifest is missing <{0}>")]
    MissingElement(&'static str),

    #[error("manifest is missing attribute {0}")]
    MissingAttribute(&'static str),

    #[error("unresolved label resource {0}")]
    UnresolvedLabel(String),

    #[error("invalid manifest XML: {0}")]
    Xml(String),

    #[error("cannot read APK: {0}")]
    Apk(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<axml::AxmlError> for ManifestError {
    fn from(e: axml::AxmlError) -> Self {
        Self::Xml(e.to_string())
    }
}

/// Where application metadata is taken from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestMode {
    /// The sidecar when present, otherwise the APK.
    #[default]
    Auto,
    /// Exactly one top-level `.apk`.
    Apk,
    /// Only `application-metadata.json`.
    Metadata,
}

impl std::str::FromStr for ManifestMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "apk" => Ok(Self::Apk),
            "metadata" | "json" => Ok(Self::Metadata),
            other => Err(format!("unknown manifest mode '{other}'")),
        }
    }
}

impl std::fmt::Display for ManifestMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Apk => "apk",
            Self::Metadata => "metadata",
        })
    }
}

/// Top-level `.apk` files of an extracted package, sorted by name.
///
/// # Errors
///
/// Returns the IO error if `dir` cannot be listed.
pub fn find_apks(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut apks = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_apk = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("apk"));
        if is_apk && entry.file_type()?.is_file() {
            apks.push(path);
        }
    }
    apks.sort();
    Ok(apks)
}

fn single_apk(dir: &Path) -> Result<PathBuf, ManifestError> {
    let mut apks = find_apks(dir)?;
    if apks.len() != 1 {
        return Err(ManifestError::NoManifestSource { found: apks.len() });
    }
    Ok(apks.remove(0))
}

/// Recover application metadata from an extracted package directory.
///
/// `launch_action` is the intent action the unit launch activity must
/// declare (APK sources only).
///
/// # Errors
///
/// See [`ManifestError`]. In `Auto` mode a missing application name is
/// filled from the APK label on a best-effort basis and never fails the
/// import.
pub fn read_application_metadata(
    dir: &Path,
    mode: ManifestMode,
    launch_action: &str,
) -> Result<ApplicationMetadata, ManifestError> {
    let sidecar = dir.join(METADATA_FILE);

    match mode {
        ManifestMode::Metadata => {
            if !sidecar.is_file() {
                return Err(ManifestError::NoManifestSource { found: 0 });
            }
            metadata::read_metadata_file(&sidecar)
        }
        ManifestMode::Apk => {
            let apk = single_apk(dir)?;
            let manifest = apk::read_apk_manifest(&apk, launch_action)?;
            Ok(ApplicationMetadata {
                application_name: Some(manifest.resolved_label()?.to_string()),
                application_package: manifest.package,
                unit_launch_activity_class: manifest.launch_activity,
            })
        }
        ManifestMode::Auto if sidecar.is_file() => {
            let mut meta = metadata::read_metadata_file(&sidecar)?;
            if meta.application_name.is_none() {
                meta.application_name = label_from_single_apk(dir, launch_action);
            }
            Ok(meta)
        }
        ManifestMode::Auto => {
            tracing::debug!(dir = %dir.display(), "no metadata sidecar, using APK manifest");
            read_application_metadata(dir, ManifestMode::Apk, launch_action)
        }
    }
}

fn label_from_single_apk(dir: &Path, launch_action: &str) -> Option<String> {
    let apk = single_apk(dir).ok()?;
    match apk::read_apk_manifest(&apk, launch_action) {
        Ok(manifest) => manifest.resolved_label().ok().map(str::to_string),
        Err(e) => {
            tracing::debug!(apk = %apk.display(), error = %e, "ignoring APK label");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    const ACTION: &str = "com.eidu.integration.LAUNCH_LEARNING_UNIT";

    fn text_manifest(label: &str) -> String {
        format!(
            r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.example.unit">
  <application android:label="{label}">
    <activity android:name="MainActivity">
      <intent-filter><action android:name="{ACTION}"/></intent-filter>
    </activity>
  </application>
</manifest>"#
        )
    }

    fn write_apk(path: &Path, manifest: &str) {
        let mut zip = zip::ZipWriter::new(std::fs::File::create(path).unwrap());
        zip.start_file("AndroidManifest.xml", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(manifest.as_bytes()).unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn test_apk_mode() {
        let dir = tempdir().unwrap();
        write_apk(&dir.path().join("app.apk"), &text_manifest("Example"));

        let meta = read_application_metadata(dir.path(), ManifestMode::Apk, ACTION).unwrap();
        assert_eq!(meta.application_name.as_deref(), Some("Example"));
        assert_eq!(meta.application_package, "com.example.unit");
        assert_eq!(meta.unit_launch_activity_class, "MainActivity");
    }

    #[test]
    fn test_apk_mode_counts_sources() {
        let dir = tempdir().unwrap();
        let err = read_application_metadata(dir.path(), ManifestMode::Apk, ACTION).unwrap_err();
        assert!(matches!(err, ManifestError::NoManifestSource { found: 0 }));

        write_apk(&dir.path().join("a.apk"), &text_manifest("A"));
        write_apk(&dir.path().join("b.apk"), &text_manifest("B"));
        let err = read_application_metadata(dir.path(), ManifestMode::Apk, ACTION).unwrap_err();
        assert!(matches!(err, ManifestError::NoManifestSource { found: 2 }));
    }

    #[test]
    fn test_auto_prefers_sidecar_and_fills_name() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(METADATA_FILE),
            r#"{"applicationPackage":"com.example.unit","unitLaunchActivityClass":"com.example.unit.Launch"}"#,
        )
        .unwrap();
        write_apk(&dir.path().join("app.apk"), &text_manifest("From APK"));

        let meta = read_application_metadata(dir.path(), ManifestMode::Auto, ACTION).unwrap();
        assert_eq!(meta.application_name.as_deref(), Some("From APK"));
        assert_eq!(meta.unit_launch_activity_class, "com.example.unit.Launch");
    }

    #[test]
    fn test_auto_ignores_unresolved_label() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(METADATA_FILE),
            r#"{"applicationPackage":"com.example.unit","unitLaunchActivityClass":"Launch"}"#,
        )
        .unwrap();
        write_apk(&dir.path().join("app.apk"), &text_manifest("@string/app_name"));

        let meta = read_application_metadata(dir.path(), ManifestMode::Auto, ACTION).unwrap();
        assert_eq!(meta.application_name, None);
    }

    #[test]
    fn test_apk_mode_rejects_unresolved_label() {
        let dir = tempdir().unwrap();
        write_apk(&dir.path().join("app.apk"), &text_manifest("@0x7f0b0001"));
        let err = read_application_metadata(dir.path(), ManifestMode::Apk, ACTION).unwrap_err();
        assert!(matches!(err, ManifestError::UnresolvedLabel(_)));
    }

    #[test]
    fn test_metadata_mode_requires_sidecar() {
        let dir = tempdir().unwrap();
        write_apk(&dir.path().join("app.apk"), &text_manifest("Example"));
        let err = read_application_metadata(dir.path(), ManifestMode::Metadata, ACTION).unwrap_err();
        assert!(matches!(err, ManifestError::NoManifestSource { found: 0 }));
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("APK".parse::<ManifestMode>(), Ok(ManifestMode::Apk));
        assert_eq!("json".parse::<ManifestMode>(), Ok(ManifestMode::Metadata));
        assert!("xml".parse::<ManifestMode>().is_err());
    }
}
