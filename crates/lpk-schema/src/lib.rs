//! Shared types and wire formats for learning packages.
//!
//! This crate has no IO. It defines the data model persisted by the host
//! (`LearningApp`, `LearningUnit`), the JSON shapes found inside a learning
//! package (`ApplicationMetadata`, `UnitCatalog`), and the launch protocol
//! exchanged with a running unit.

pub mod outcome;
pub mod protocol;
pub mod types;

// Re-exports
pub use outcome::Outcome;
pub use protocol::{
    ComponentName, ExtraValue, LaunchRequest, LaunchResult, ProtocolError, ResultCode,
    ResultItem, ResultType, TransportMessage, UnitOutcome, UnitResponse,
};
pub use types::*;

/// Display name used when neither the metadata sidecar nor the APK provide a label.
pub const UNKNOWN_APPLICATION: &str = "Unknown Application";
