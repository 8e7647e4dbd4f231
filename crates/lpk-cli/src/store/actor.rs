//! DB Actor - Thread-safe access to SQLite
//!
//! SQLite connections are not `Sync`, so the database lives on a dedicated
//! background thread and async callers talk to it via message passing.
//! [`DbHandle`] is cheap to clone and implements [`AppRepository`].

use std::path::Path;
use std::sync::mpsc;
use std::thread;

use async_trait::async_trait;
use lpk_core::repo::{AppRepository, RepositoryError};
use lpk_schema::{LearningApp, LearningUnit, PackageId};
use tokio::sync::oneshot;

use super::db::{DbError, HistoryEvent, StateDb};

type Reply<T> = oneshot::Sender<Result<T, DbError>>;

/// Events that can be sent to the DB actor
enum DbEvent {
    ListApps {
        resp: Reply<Vec<LearningApp>>,
    },
    FindApp {
        package: String,
        resp: Reply<Option<LearningApp>>,
    },
    UpsertApp {
        app: LearningApp,
        resp: Reply<()>,
    },
    DeleteApp {
        package: String,
        resp: Reply<bool>,
    },
    Units {
        package: String,
        resp: Reply<Vec<LearningUnit>>,
    },
    ReplaceUnits {
        package: String,
        units: Vec<LearningUnit>,
        resp: Reply<()>,
    },
    CommitImport {
        app: LearningApp,
        units: Vec<LearningUnit>,
        resp: Reply<()>,
    },
    AddHistory {
        package: String,
        action: String,
        detail: String,
        resp: Reply<()>,
    },
    History {
        package: String,
        resp: Reply<Vec<HistoryEvent>>,
    },
    /// Shutdown the actor
    Shutdown,
}

/// A handle to the Database Actor that is Send + Sync and Clone.
#[derive(Debug, Clone)]
pub struct DbHandle {
    sender: mpsc::Sender<DbEvent>,
}

impl DbHandle {
    /// Open the database at `path` and spawn the actor thread.
    pub fn spawn(path: &Path) -> Result<Self, DbError> {
        Ok(Self::start(StateDb::open_at(path)?))
    }

    /// Actor over an in-memory database.
    pub fn spawn_in_memory() -> Result<Self, DbError> {
        Ok(Self::start(StateDb::open_in_memory()?))
    }

    /// Actor over an already opened database.
    pub fn start(db: StateDb) -> Self {
        let (sender, receiver) = mpsc::channel();

        thread::spawn(move || {
            run_db_event_loop(&db, &receiver);
        });

        Self { sender }
    }

    /// Helper to send a request and wait for the response
    async fn request<T, F>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(Reply<T>) -> DbEvent,
    {
        let (tx, rx) = oneshot::channel();
        self.sender.send(f(tx)).map_err(|_| DbError::ActorDied)?;
        rx.await.map_err(|_| DbError::ActorDied)?
    }

    pub async fn list_apps(&self) -> Result<Vec<LearningApp>, DbError> {
        self.request(|resp| DbEvent::ListApps { resp }).await
    }

    pub async fn find_app(&self, package: &PackageId) -> Result<Option<LearningApp>, DbError> {
        let package = package.to_string();
        self.request(|resp| DbEvent::FindApp { package, resp }).await
    }

    pub async fn upsert_app(&self, app: LearningApp) -> Result<(), DbError> {
        self.request(|resp| DbEvent::UpsertApp { app, resp }).await
    }

    pub async fn delete_app(&self, package: &PackageId) -> Result<bool, DbError> {
        let package = package.to_string();
        self.request(|resp| DbEvent::DeleteApp { package, resp }).await
    }

    pub async fn units(&self, package: &PackageId) -> Result<Vec<LearningUnit>, DbError> {
        let package = package.to_string();
        self.request(|resp| DbEvent::Units { package, resp }).await
    }

    pub async fn replace_units(
        &self,
        package: &PackageId,
        units: Vec<LearningUnit>,
    ) -> Result<(), DbError> {
        let package = package.to_string();
        self.request(|resp| DbEvent::ReplaceUnits {
            package,
            units,
            resp,
        })
        .await
    }

    pub async fn commit_import(
        &self,
        app: LearningApp,
        units: Vec<LearningUnit>,
    ) -> Result<(), DbError> {
        self.request(|resp| DbEvent::CommitImport { app, units, resp })
            .await
    }

    pub async fn add_history(
        &self,
        package: &PackageId,
        action: &str,
        detail: String,
    ) -> Result<(), DbError> {
        let package = package.to_string();
        let action = action.to_string();
        self.request(|resp| DbEvent::AddHistory {
            package,
            action,
            detail,
            resp,
        })
        .await
    }

    pub async fn history(&self, package: &str) -> Result<Vec<HistoryEvent>, DbError> {
        let package = package.to_string();
        self.request(|resp| DbEvent::History { package, resp }).await
    }

    /// Ask the actor thread to exit once queued events are handled.
    pub fn shutdown(&self) {
        let _ = self.sender.send(DbEvent::Shutdown);
    }
}

impl From<DbError> for RepositoryError {
    fn from(err: DbError) -> Self {
        RepositoryError::new(err.to_string())
    }
}

#[async_trait]
impl AppRepository for DbHandle {
    async fn list_apps(&self) -> Result<Vec<LearningApp>, RepositoryError> {
        Ok(DbHandle::list_apps(self).await?)
    }

    async fn find_app(&self, package: &PackageId) -> Result<Option<LearningApp>, RepositoryError> {
        Ok(DbHandle::find_app(self, package).await?)
    }

    async fn upsert_app(&self, app: &LearningApp) -> Result<(), RepositoryError> {
        Ok(DbHandle::upsert_app(self, app.clone()).await?)
    }

    async fn delete_app(&self, package: &PackageId) -> Result<bool, RepositoryError> {
        Ok(DbHandle::delete_app(self, package).await?)
    }

    async fn units(&self, package: &PackageId) -> Result<Vec<LearningUnit>, RepositoryError> {
        Ok(DbHandle::units(self, package).await?)
    }

    async fn replace_units(
        &self,
        package: &PackageId,
        units: &[LearningUnit],
    ) -> Result<(), RepositoryError> {
        Ok(DbHandle::replace_units(self, package, units.to_vec()).await?)
    }

    async fn commit_import(
        &self,
        app: &LearningApp,
        units: &[LearningUnit],
    ) -> Result<(), RepositoryError> {
        Ok(DbHandle::commit_import(self, app.clone(), units.to_vec()).await?)
    }
}

/// The actual event loop running in the background thread
fn run_db_event_loop(db: &StateDb, receiver: &mpsc::Receiver<DbEvent>) {
    while let Ok(event) = receiver.recv() {
        match event {
            DbEvent::ListApps { resp } => {
                let _ = resp.send(db.list_apps());
            }
            DbEvent::FindApp { package, resp } => {
                let _ = resp.send(db.find_app(&package));
            }
            DbEvent::UpsertApp { app, resp } => {
                let _ = resp.send(db.upsert_app(&app));
            }
            DbEvent::DeleteApp { package, resp } => {
                let _ = resp.send(db.delete_app(&package));
            }
            DbEvent::Units { package, resp } => {
                let _ = resp.send(db.units(&package));
            }
            DbEvent::ReplaceUnits {
                package,
                units,
                resp,
            } => {
                let _ = resp.send(db.replace_units(&package, &units));
            }
            DbEvent::CommitImport { app, units, resp } => {
                let _ = resp.send(db.commit_import(&app, &units));
            }
            DbEvent::AddHistory {
                package,
                action,
                detail,
                resp,
            } => {
                let _ = resp.send(db.add_history(&package, &action, &detail));
            }
            DbEvent::History { package, resp } => {
                let _ = resp.send(db.history(&package));
            }
            DbEvent::Shutdown => break,
        }
    }
    tracing::debug!("database actor stopped");
}
