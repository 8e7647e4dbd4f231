use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};

use crate::UNKNOWN_APPLICATION;

/// Errors raised when a string is not a usable identifier.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The identifier is empty.
    #[error("identifier is empty")]
    Empty,

    /// The package identifier does not follow the `segment.segment` form.
    #[error("'{0}' is not a valid application package (expected e.g. 'com.example.app')")]
    InvalidPackage(String),

    /// Application metadata names no launch activity.
    #[error("application '{0}' has no launch activity")]
    EmptyLaunchActivity(String),
}

/// Application package identifier of a learning app (e.g. `com.example.unit`).
///
/// Package identifiers double as directory names in the package store, so
/// construction validates them: at least two dot-separated segments, each
/// starting with an ASCII letter and containing only ASCII alphanumerics or
/// `_`. Comparison is case-sensitive, matching the Android platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PackageId(String);

impl PackageId {
    /// Validate and wrap a package identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::Empty`] for an empty string and
    /// [`IdError::InvalidPackage`] when the segment rules are violated.
    pub fn new(id: &str) -> Result<Self, IdError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(IdError::Empty);
        }

        let segments: Vec<&str> = id.split('.').collect();
        let valid_segment = |s: &&str| {
            s.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
                && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        };
        if segments.len() < 2 || !segments.iter().all(valid_segment) {
            return Err(IdError::InvalidPackage(id.to_string()));
        }

        Ok(Self(id.to_string()))
    }

    /// Return the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for PackageId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(&raw).map_err(serde::de::Error::custom)
    }
}

impl std::str::FromStr for PackageId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for PackageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::ops::Deref for PackageId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for PackageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<std::path::Path> for PackageId {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

impl Borrow<str> for PackageId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for PackageId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Identifier of a learning unit, unique within its owning app.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    /// Wrap a unit identifier as-is.
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Return the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::ops::Deref for UnitId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Borrow<str> for UnitId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UnitId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for UnitId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<&str> for UnitId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// An imported learning app. Identity is the package identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningApp {
    /// Human-readable label shown in the host.
    pub display_name: String,
    /// Application package identifier (unique).
    pub package: PackageId,
    /// Activity that receives unit launch requests, exactly as declared in
    /// the manifest (fully qualified or relative like `.MainActivity`).
    pub launch_activity: String,
}

impl LearningApp {
    /// Build an app record from parsed application metadata.
    ///
    /// # Errors
    ///
    /// Returns [`IdError`] if the metadata carries an invalid package.
    pub fn from_metadata(metadata: ApplicationMetadata) -> Result<Self, IdError> {
        let package = PackageId::new(&metadata.application_package)?;
        if metadata.unit_launch_activity_class.trim().is_empty() {
            return Err(IdError::EmptyLaunchActivity(package.to_string()));
        }
        Ok(Self {
            display_name: metadata
                .application_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_APPLICATION.to_string()),
            package,
            launch_activity: metadata.unit_launch_activity_class,
        })
    }

    /// Fully qualified class name of the launch activity.
    ///
    /// Relative names (`.MainActivity`) and bare names (`MainActivity`) are
    /// resolved against the package, as the Android package manager does.
    pub fn launch_class(&self) -> String {
        let activity = self.launch_activity.trim();
        if activity.starts_with('.') {
            format!("{}{activity}", self.package)
        } else if activity.contains('.') {
            activity.to_string()
        } else {
            format!("{}.{activity}", self.package)
        }
    }
}

/// A launchable unit of a learning app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningUnit {
    /// Package identifier of the owning app.
    pub package: PackageId,
    /// Unit identifier, unique per package.
    pub unit_id: UnitId,
    /// Package-relative path of the unit icon.
    pub icon: String,
    /// Ordered asset patterns: exact paths, or directory prefixes ending in `/`.
    pub permitted_assets: Vec<String>,
    /// Free-form key/value fields from the catalog.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    /// Tag groups from the catalog.
    #[serde(default)]
    pub tags: BTreeMap<String, BTreeSet<String>>,
}

impl LearningUnit {
    /// Create a unit with no extra fields or tags.
    pub fn new(package: PackageId, unit_id: UnitId, icon: &str, permitted_assets: Vec<String>) -> Self {
        Self {
            package,
            unit_id,
            icon: icon.to_string(),
            permitted_assets,
            fields: BTreeMap::new(),
            tags: BTreeMap::new(),
        }
    }
}

/// Application metadata recovered from an APK manifest or the JSON sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationMetadata {
    /// Application label, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_name: Option<String>,
    /// Application package identifier.
    pub application_package: String,
    /// Activity handling unit launches.
    pub unit_launch_activity_class: String,
}

/// The unit catalog shipped inside a learning package.
///
/// Older packages name the list `contentUnits`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitCatalog {
    /// Catalog entries in declaration order.
    #[serde(rename = "learningUnits", alias = "contentUnits")]
    pub units: Vec<UnitCatalogEntry>,
}

/// One entry of the unit catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitCatalogEntry {
    /// Unit identifier.
    pub unit_id: String,
    /// Package-relative icon path.
    pub icon: String,
    /// Asset patterns the unit may read.
    #[serde(default)]
    pub additional_assets: Vec<String>,
    /// Free-form fields.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    /// Tag groups.
    #[serde(default)]
    pub tags: BTreeMap<String, BTreeSet<String>>,
}

impl UnitCatalogEntry {
    /// Turn the catalog entry into a unit owned by `package`.
    pub fn into_unit(self, package: &PackageId) -> LearningUnit {
        LearningUnit {
            package: package.clone(),
            unit_id: UnitId::from(self.unit_id),
            icon: self.icon,
            permitted_assets: self.additional_assets,
            fields: self.fields,
            tags: self.tags,
        }
    }
}
