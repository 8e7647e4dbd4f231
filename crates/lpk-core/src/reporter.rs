//! Progress reporting for imports and removals.
//!
//! Pipelines talk to a `Reporter` instead of a terminal. Every method has a
//! silent default, so an implementation only overrides what it shows.

#[allow(unused_variables)]
pub trait Reporter: Send + Sync {
    /// A new phase starts ("Importing", "Removing").
    fn section(&self, title: &str) {}

    /// `current` of `total` entries of the archive `source` are extracted.
    fn extracting(&self, source: &str, current: u64, total: Option<u64>) {}

    /// The application manifest or unit catalog is being read.
    fn parsing(&self, what: &str) {}

    /// A package tree is being swapped into the store.
    fn installing(&self, package: &str) {}

    fn removing(&self, package: &str) {}

    /// A package operation finished.
    fn done(&self, package: &str, detail: &str) {}

    /// A package operation failed; `reason` is meant for humans.
    fn failed(&self, package: &str, reason: &str) {}

    fn info(&self, msg: &str) {}

    fn success(&self, msg: &str) {}

    fn warning(&self, msg: &str) {}

    fn error(&self, msg: &str) {}
}

/// Reports nothing. Used by tests and library callers without a terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {}
