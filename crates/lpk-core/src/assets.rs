//! Asset serving for launched units.
//!
//! A unit receives a base address `content://<authority>/<package>?unit=<id>`
//! and requests files below it. Every read goes through the access guard,
//! holds the package's read gate, and is resolved against a cached
//! [`LoadedPackage`].

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use futures::FutureExt;
use lpk_schema::{LearningApp, LearningUnit, PackageId, UnitId};
use url::Url;

use crate::access::{is_asset_accessible, normalize_asset_path};
use crate::cache::{AsyncCache, CacheError};
use crate::gate::KeyedGate;
use crate::repo::AppRepository;
use crate::store::PackageStore;

const SCHEME: &str = "content";
const UNIT_PARAM: &str = "unit";
const FALLBACK_MIME: &str = "application/octet-stream";

/// Operations a unit may attempt on the asset endpoint. Only reads are served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetVerb {
    Read,
    Query,
    Insert,
    Update,
    Delete,
}

impl fmt::Display for AssetVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "Read",
            Self::Query => "Query",
            Self::Insert => "Insertion",
            Self::Update => "Update",
            Self::Delete => "Deletion",
        })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum AssetError {
    #[error("{0} is not supported.")]
    Unsupported(AssetVerb),

    #[error("Invalid mode {0}; only reading is allowed.")]
    InvalidMode(String),

    #[error("Invalid asset address '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("Asset address '{0}' belongs to another authority")]
    WrongAuthority(String),

    #[error("No unit ID in {0}")]
    MissingUnit(String),

    #[error("No path in {0}")]
    MissingPath(String),

    #[error("Learning app '{0}' is not installed")]
    UnknownPackage(PackageId),

    #[error("Unit '{unit}' does not exist in '{package}'")]
    UnknownUnit { package: PackageId, unit: UnitId },

    #[error("Asset '{path}' is not accessible by unit '{unit}'.")]
    Denied { path: String, unit: UnitId },

    #[error("Asset '{0}' does not exist.")]
    NotFound(String),

    #[error("Failed to load package: {0}")]
    Load(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A parsed asset address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetAddress {
    pub package: PackageId,
    /// Percent-decoded path below the package, possibly empty.
    pub path: String,
    pub unit: UnitId,
}

impl AssetAddress {
    /// Parse `uri`, requiring the `content` scheme and `authority`.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::InvalidUri`], [`AssetError::WrongAuthority`],
    /// [`AssetError::MissingPath`] (no package segment) or
    /// [`AssetError::MissingUnit`].
    pub fn parse(uri: &str, authority: &str) -> Result<Self, AssetError> {
        let invalid = |reason: String| AssetError::InvalidUri {
            uri: uri.to_string(),
            reason,
        };

        let url = Url::parse(uri).map_err(|e| invalid(e.to_string()))?;
        if url.scheme() != SCHEME {
            return Err(invalid(format!("scheme must be '{SCHEME}'")));
        }
        if url.host_str() != Some(authority) {
            return Err(AssetError::WrongAuthority(uri.to_string()));
        }

        let mut segments = Vec::new();
        for segment in url.path_segments().into_iter().flatten() {
            let decoded = urlencoding::decode(segment).map_err(|e| invalid(e.to_string()))?;
            segments.push(decoded.into_owned());
        }
        let Some(first) = segments.first().filter(|s| !s.is_empty()) else {
            return Err(AssetError::MissingPath(uri.to_string()));
        };
        let package = PackageId::new(first).map_err(|e| invalid(e.to_string()))?;
        let path = segments[1..].join("/");

        let unit = url
            .query_pairs()
            .find(|(k, _)| k == UNIT_PARAM)
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AssetError::MissingUnit(uri.to_string()))?;

        Ok(Self {
            package,
            path,
            unit: UnitId::from(unit),
        })
    }
}

/// Base address handed to a unit in its launch request.
pub fn asset_base_uri(authority: &str, package: &PackageId, unit: &UnitId) -> String {
    let mut url = match Url::parse(&format!("{SCHEME}://{authority}/")) {
        Ok(url) => url,
        Err(_) => return format!("{SCHEME}://{authority}/{package}?{UNIT_PARAM}={unit}"),
    };
    url.set_path(&format!("/{package}"));
    url.query_pairs_mut().append_pair(UNIT_PARAM, unit.as_str());
    url.to_string()
}

/// Best-effort MIME type from a file extension.
pub fn mime_type_for(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "wav" => "audio/x-wav",
        "m4a" => "audio/mp4",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "json" => "application/json",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "xml" => "text/xml",
        "pdf" => "application/pdf",
        "ttf" => "font/ttf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => FALLBACK_MIME,
    }
}

/// Bytes of a served asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub path: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Everything needed to answer asset requests for one package.
#[derive(Debug, Clone)]
pub struct LoadedPackage {
    pub app: LearningApp,
    pub units: Vec<LearningUnit>,
    pub root: PathBuf,
    pub files: BTreeSet<String>,
}

impl LoadedPackage {
    pub fn unit(&self, id: &UnitId) -> Option<&LearningUnit> {
        self.units.iter().find(|u| &u.unit_id == id)
    }
}

/// Carries a typed error through the cache's `anyhow` generator.
fn load_error(e: &CacheError) -> AssetError {
    let CacheError::Generation(inner) = e;
    match inner.downcast_ref::<AssetError>() {
        Some(AssetError::UnknownPackage(p)) => AssetError::UnknownPackage(p.clone()),
        _ => AssetError::Load(format!("{inner:#}")),
    }
}

/// Read-only asset endpoint.
pub struct AssetServer {
    authority: String,
    gate: Arc<KeyedGate>,
    cache: AsyncCache<PackageId, Arc<LoadedPackage>>,
}

impl fmt::Debug for AssetServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetServer")
            .field("authority", &self.authority)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl AssetServer {
    pub fn new(
        authority: &str,
        store: PackageStore,
        gate: Arc<KeyedGate>,
        repo: Arc<dyn AppRepository>,
        cache_size: usize,
    ) -> Self {
        let cache = AsyncCache::new(cache_size, move |package: PackageId| {
            let repo = Arc::clone(&repo);
            let store = store.clone();
            async move {
                let app = repo
                    .find_app(&package)
                    .await?
                    .ok_or_else(|| AssetError::UnknownPackage(package.clone()))?;
                let units = repo.units(&package).await?;
                let root = store.package_dir(&package);
                let files = tokio::task::spawn_blocking(move || store.list_files(&package))
                    .await??
                    .into_iter()
                    .collect();
                tracing::debug!(package = %app.package, units = units.len(), "loaded package");
                Ok(Arc::new(LoadedPackage {
                    app,
                    units,
                    root,
                    files,
                }))
            }
            .boxed()
        })
        .with_eviction(|loaded: Arc<LoadedPackage>| {
            async move {
                tracing::debug!(package = %loaded.app.package, "evicted loaded package");
            }
            .boxed()
        });

        Self {
            authority: authority.to_string(),
            gate,
            cache,
        }
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Base address for `unit` of `package`.
    pub fn base_uri(&self, package: &PackageId, unit: &UnitId) -> String {
        asset_base_uri(&self.authority, package, unit)
    }

    /// MIME type reported for an address, without reading it.
    ///
    /// # Errors
    ///
    /// Fails if `uri` is not a valid asset address.
    pub fn mime_type(&self, uri: &str) -> Result<&'static str, AssetError> {
        let address = AssetAddress::parse(uri, &self.authority)?;
        Ok(mime_type_for(&address.path))
    }

    /// Dispatch a request; anything but [`AssetVerb::Read`] is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::Unsupported`] or any error of [`Self::open`].
    pub async fn handle(&self, verb: AssetVerb, uri: &str) -> Result<Asset, AssetError> {
        match verb {
            AssetVerb::Read => self.open(uri).await,
            other => Err(AssetError::Unsupported(other)),
        }
    }

    /// Read an asset.
    ///
    /// # Errors
    ///
    /// See [`AssetError`]; a missing unit id, an unknown unit, a denied path
    /// and a missing file are reported distinctly.
    pub async fn open(&self, uri: &str) -> Result<Asset, AssetError> {
        self.open_file(uri, "r").await
    }

    /// Read an asset with an explicit open mode; only `"r"` is allowed.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::InvalidMode`] for other modes, otherwise as
    /// [`Self::open`].
    pub async fn open_file(&self, uri: &str, mode: &str) -> Result<Asset, AssetError> {
        if mode != "r" {
            return Err(AssetError::InvalidMode(mode.to_string()));
        }
        let address = AssetAddress::parse(uri, &self.authority)?;
        if address.path.is_empty() {
            return Err(AssetError::MissingPath(uri.to_string()));
        }

        let _guard = self.gate.read(address.package.as_str()).await;
        let loaded = self
            .cache
            .get(address.package.clone())
            .await
            .map_err(|e| load_error(&e))?;

        let unit = loaded
            .unit(&address.unit)
            .ok_or_else(|| AssetError::UnknownUnit {
                package: address.package.clone(),
                unit: address.unit.clone(),
            })?;

        let denied = || AssetError::Denied {
            path: address.path.clone(),
            unit: address.unit.clone(),
        };
        let path = normalize_asset_path(&address.path).ok_or_else(denied)?;
        if !is_asset_accessible(unit, &path) {
            tracing::warn!(package = %address.package, unit = %address.unit, path = %path, "asset access denied");
            return Err(denied());
        }
        if !loaded.files.contains(&path) {
            return Err(AssetError::NotFound(path));
        }

        let file = loaded.root.join(&path);
        let bytes = tokio::task::spawn_blocking(move || std::fs::read(file))
            .await
            .map_err(std::io::Error::other)??;

        Ok(Asset {
            mime_type: mime_type_for(&path),
            path,
            bytes,
        })
    }

    /// Forget the loaded state of `package`; call after it changes on disk.
    pub async fn invalidate(&self, package: &PackageId) {
        self.cache.invalidate(package).await;
    }

    pub async fn is_loaded(&self, package: &PackageId) -> bool {
        self.cache.contains(package).await
    }
}
