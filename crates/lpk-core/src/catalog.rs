//! Unit catalog parsing.

use lpk_schema::{LearningUnit, PackageId, UnitCatalog, UnitCatalogEntry};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Catalog file names, in lookup order.
pub const CATALOG_FILES: [&str; 2] = ["content-units.json", "learning-units.json"];

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid unit catalog: {0}")]
    Decode(String),

    #[error("duplicate unit id '{0}'")]
    DuplicateUnit(String),

    #[error("unit at position {0} has an empty id")]
    EmptyUnitId(usize),
}

/// How the catalog of an import turned out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "camelCase")]
pub enum CatalogStatus {
    /// Catalog found and decoded with this many units.
    Loaded(usize),
    /// The package has no catalog; units can be added by hand.
    NotFound,
    /// A catalog exists but could not be used.
    Error(String),
}

impl std::fmt::Display for CatalogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loaded(1) => write!(f, "1 unit"),
            Self::Loaded(n) => write!(f, "{n} units"),
            Self::NotFound => write!(f, "no unit catalog"),
            Self::Error(reason) => write!(f, "catalog error: {reason}"),
        }
    }
}

/// Decode catalog JSON, rejecting empty and duplicate unit ids.
///
/// # Errors
///
/// See [`CatalogError`].
pub fn parse_catalog(text: &str) -> Result<Vec<UnitCatalogEntry>, CatalogError> {
    let catalog: UnitCatalog =
        serde_json::from_str(text).map_err(|e| CatalogError::Decode(e.to_string()))?;

    let mut seen = HashSet::new();
    for (position, entry) in catalog.units.iter().enumerate() {
        if entry.unit_id.trim().is_empty() {
            return Err(CatalogError::EmptyUnitId(position));
        }
        if !seen.insert(entry.unit_id.as_str()) {
            return Err(CatalogError::DuplicateUnit(entry.unit_id.clone()));
        }
    }
    Ok(catalog.units)
}

/// Locate the catalog file of an extracted package, if any.
pub fn find_catalog(dir: &Path) -> Option<PathBuf> {
    CATALOG_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Load the catalog of an extracted package. `Ok(None)` means there is none.
///
/// # Errors
///
/// See [`CatalogError`].
pub fn load_catalog(dir: &Path) -> Result<Option<Vec<UnitCatalogEntry>>, CatalogError> {
    let Some(path) = find_catalog(dir) else {
        return Ok(None);
    };
    tracing::debug!(path = %path.display(), "reading unit catalog");
    let text = std::fs::read_to_string(&path).map_err(|source| CatalogError::Io {
        path: path.clone(),
        source,
    })?;
    parse_catalog(&text).map(Some)
}

/// Turn a load result into units plus the status shown to the user.
///
/// A missing or broken catalog still yields an (empty) unit set so the app
/// import can go ahead.
pub fn resolve_units(
    package: &PackageId,
    loaded: Result<Option<Vec<UnitCatalogEntry>>, CatalogError>,
) -> (Vec<LearningUnit>, CatalogStatus) {
    match loaded {
        Ok(Some(entries)) => {
            let units: Vec<LearningUnit> =
                entries.into_iter().map(|e| e.into_unit(package)).collect();
            let status = CatalogStatus::Loaded(units.len());
            (units, status)
        }
        Ok(None) => (Vec::new(), CatalogStatus::NotFound),
        Err(e) => {
            tracing::warn!(package = %package, error = %e, "ignoring unusable unit catalog");
            (Vec::new(), CatalogStatus::Error(e.to_string()))
        }
    }
}
