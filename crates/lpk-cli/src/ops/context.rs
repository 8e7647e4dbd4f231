//! Shared operation context.
//!
//! Groups the state every command needs (database actor, package store,
//! per-package gate, asset server, reporter) so operations take one argument
//! instead of six.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use lpk_core::assets::AssetServer;
use lpk_core::gate::KeyedGate;
use lpk_core::store::PackageStore;
use lpk_core::{Config, Layout, Reporter};
use lpk_schema::PackageId;

use crate::ops::ImportError;
use crate::store::{DbHandle, StateDb};

/// Groups common state used by import, removal and launch operations.
#[derive(Clone)]
pub struct Context {
    pub layout: Layout,
    pub config: Config,
    pub db: DbHandle,
    pub store: PackageStore,
    /// Imports and removals take the write side, asset reads the read side.
    pub gate: Arc<KeyedGate>,
    pub assets: Arc<AssetServer>,
    pub reporter: Arc<dyn Reporter>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("layout", &self.layout)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Context {
    pub fn new(layout: Layout, config: Config, db: DbHandle, reporter: Arc<dyn Reporter>) -> Self {
        let store = PackageStore::new(layout.store_dir());
        let gate = Arc::new(KeyedGate::new());
        let assets = Arc::new(AssetServer::new(
            &config.asset_authority,
            store.clone(),
            Arc::clone(&gate),
            Arc::new(db.clone()),
            config.cache_size,
        ));

        Self {
            layout,
            config,
            db,
            store,
            gate,
            assets,
            reporter,
        }
    }

    /// Create the home directories, bring the package store in line with the
    /// database after any interrupted install, and start the database actor.
    pub fn open(
        layout: Layout,
        config: Config,
        reporter: Arc<dyn Reporter>,
    ) -> Result<Self, ImportError> {
        layout.ensure()?;
        let db = StateDb::open_at(&layout.db_path())?;
        let store = PackageStore::new(layout.store_dir());

        let recovered = store.recover_interrupted()?;
        if recovered > 0 {
            tracing::info!(recovered, "restored package trees of interrupted installs");
        }
        let known: HashSet<PackageId> = db.list_apps()?.into_iter().map(|app| app.package).collect();
        let swept = store.sweep_untracked(&known)?;
        if !swept.is_empty() {
            tracing::info!(swept = swept.len(), "removed package trees without a record");
        }

        Ok(Self::new(layout, config, DbHandle::start(db), reporter))
    }
}
