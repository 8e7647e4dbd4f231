//! Operations behind the `lpk` commands.
//!
//! Each operation has a `Result`-returning form for callers that want the
//! typed error, and most have an [`Outcome`](lpk_schema::Outcome) form that
//! never fails past its boundary.

pub mod context;
pub mod edit;
pub mod error;
pub mod import;
pub mod launch;
pub mod query;
pub mod remove;

pub use context::Context;
pub use error::{ImportError, LaunchError};
