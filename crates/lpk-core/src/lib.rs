//! Core library for lpk.
//!
//! Everything that touches a learning package on disk lives here: safe
//! archive extraction, manifest and catalog parsing, the package store with
//! its install-then-swap semantics, the asset access guard and the asset
//! server built on top of it. Persistence is abstracted behind
//! [`repo::AppRepository`] so the binary can plug in its own store.

pub mod access;
pub mod assets;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod gate;
pub mod io;
pub mod manifest;
pub mod paths;
pub mod repo;
pub mod reporter;
pub mod store;

pub use config::Config;
pub use paths::*;
pub use reporter::{NullReporter, Reporter};
