//! Domain-specific errors for package operations

use lpk_core::io::extract::ExtractError;
use lpk_core::manifest::ManifestError;
use lpk_core::repo::RepositoryError;
use lpk_core::store::StoreError;
use lpk_schema::{IdError, ProtocolError};
use thiserror::Error;

use crate::store::DbError;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Invalid manifest: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Invalid application identifier: {0}")]
    Identifier(#[from] IdError),

    #[error("Failed to install package files: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to save learning app: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Import cancelled")]
    Cancelled,

    #[error("{context}: {message}")]
    Context { context: String, message: String },

    #[error("{0}")]
    Other(String),
}

impl ImportError {
    /// Wrap any error with a short description of what was being done.
    pub fn context(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Context {
            context: context.into(),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for ImportError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ImportError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::context("background task failed", err)
    }
}

/// Errors from building a launch request or reading a unit's answer.
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Unable to launch learning unit {unit} of {package}: app could not be found")]
    AppNotFound { package: String, unit: String },

    #[error("Unable to launch learning unit {unit} of {package}: unit could not be found")]
    UnitNotFound { package: String, unit: String },

    #[error("{0}")]
    Protocol(#[from] ProtocolError),

    #[error("Database error: {0}")]
    Db(#[from] DbError),
}
