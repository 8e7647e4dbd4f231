//! Persistence boundary for apps and units.
//!
//! The host owns the actual store; core code only sees this trait.

use async_trait::async_trait;
use lpk_schema::{LearningApp, LearningUnit, PackageId};

/// Error raised by a repository implementation.
#[derive(thiserror::Error, Debug)]
#[error("{message}")]
pub struct RepositoryError {
    pub message: String,
}

impl RepositoryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait AppRepository: Send + Sync {
    async fn list_apps(&self) -> Result<Vec<LearningApp>, RepositoryError>;

    async fn find_app(&self, package: &PackageId) -> Result<Option<LearningApp>, RepositoryError>;

    async fn upsert_app(&self, app: &LearningApp) -> Result<(), RepositoryError>;

    /// Delete an app together with its units. Returns whether it existed.
    async fn delete_app(&self, package: &PackageId) -> Result<bool, RepositoryError>;

    /// Units of `package` in catalog order.
    async fn units(&self, package: &PackageId) -> Result<Vec<LearningUnit>, RepositoryError>;

    /// Replace the full unit set of `package`.
    async fn replace_units(
        &self,
        package: &PackageId,
        units: &[LearningUnit],
    ) -> Result<(), RepositoryError>;

    /// Upsert `app` and replace its units as one transaction.
    async fn commit_import(
        &self,
        app: &LearningApp,
        units: &[LearningUnit],
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
impl<T: AppRepository + ?Sized> AppRepository for std::sync::Arc<T> {
    async fn list_apps(&self) -> Result<Vec<LearningApp>, RepositoryError> {
        (**self).list_apps().await
    }
    async fn find_app(&self, package: &PackageId) -> Result<Option<LearningApp>, RepositoryError> {
        (**self).find_app(package).await
    }
    async fn upsert_app(&self, app: &LearningApp) -> Result<(), RepositoryError> {
        (**self).upsert_app(app).await
    }
    async fn delete_app(&self, package: &PackageId) -> Result<bool, RepositoryError> {
        (**self).delete_app(package).await
    }
    async fn units(&self, package: &PackageId) -> Result<Vec<LearningUnit>, RepositoryError> {
        (**self).units(package).await
    }
    async fn replace_units(
        &self,
        package: &PackageId,
        units: &[LearningUnit],
    ) -> Result<(), RepositoryError> {
        (**self).replace_units(package, units).await
    }
    async fn commit_import(
        &self,
        app: &LearningApp,
        units: &[LearningUnit],
    ) -> Result<(), RepositoryError> {
        (**self).commit_import(app, units).await
    }
}

/// In-memory repository for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: tokio::sync::RwLock<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    apps: std::collections::BTreeMap<PackageId, LearningApp>,
    units: std::collections::HashMap<PackageId, Vec<LearningUnit>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppRepository for MemoryRepository {
    async fn list_apps(&self) -> Result<Vec<LearningApp>, RepositoryError> {
        Ok(self.state.read().await.apps.values().cloned().collect())
    }

    async fn find_app(&self, package: &PackageId) -> Result<Option<LearningApp>, RepositoryError> {
        Ok(self.state.read().await.apps.get(package).cloned())
    }

    async fn upsert_app(&self, app: &LearningApp) -> Result<(), RepositoryError> {
        self.state
            .write()
            .await
            .apps
            .insert(app.package.clone(), app.clone());
        Ok(())
    }

    async fn delete_app(&self, package: &PackageId) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        state.units.remove(package);
        Ok(state.apps.remove(package).is_some())
    }

    async fn units(&self, package: &PackageId) -> Result<Vec<LearningUnit>, RepositoryError> {
        Ok(self
            .state
            .read()
            .await
            .units
            .get(package)
            .cloned()
            .unwrap_or_default())
    }

    async fn replace_units(
        &self,
        package: &PackageId,
        units: &[LearningUnit],
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if !state.apps.contains_key(package) {
            return Err(RepositoryError::new(format!("unknown app {package}")));
        }
        state.units.insert(package.clone(), units.to_vec());
        Ok(())
    }

    async fn commit_import(
        &self,
        app: &LearningApp,
        units: &[LearningUnit],
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state.apps.insert(app.package.clone(), app.clone());
        state.units.insert(app.package.clone(), units.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpk_schema::UnitId;

    fn app() -> LearningApp {
        LearningApp {
            display_name: "Example".to_string(),
            package: PackageId::new("com.example.unit").unwrap(),
            launch_activity: "MainActivity".to_string(),
        }
    }

    #[tokio::test]
    async fn test_memory_repository_replaces_units_wholesale() {
        let repo = MemoryRepository::new();
        let app = app();
        let unit = |id: &str| LearningUnit::new(app.package.clone(), UnitId::new(id), "i.png", vec![]);

        repo.commit_import(&app, &[unit("a"), unit("b")]).await.unwrap();
        repo.commit_import(&app, &[unit("c")]).await.unwrap();

        let ids: Vec<String> = repo
            .units(&app.package)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.unit_id.to_string())
            .collect();
        assert_eq!(ids, vec!["c"]);
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let repo = MemoryRepository::new();
        let app = app();
        repo.commit_import(&app, &[LearningUnit::new(app.package.clone(), UnitId::new("a"), "i", vec![])])
            .await
            .unwrap();

        assert!(repo.delete_app(&app.package).await.unwrap());
        assert!(repo.units(&app.package).await.unwrap().is_empty());
        assert!(!repo.delete_app(&app.package).await.unwrap());
    }

    #[tokio::test]
    async fn test_replace_units_requires_app() {
        let repo = MemoryRepository::new();
        assert!(repo.replace_units(&app().package, &[]).await.is_err());
    }
}
