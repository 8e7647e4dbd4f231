//! lpk - learning package tool
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Imports EIDU learning packages, keeps track of their apps and units, and
//! speaks the unit launch protocol.
//!
//! # Architecture
//!
//! - **Actor Pattern**: Database access is serialized through `DbHandle`.
//! - **Install-then-swap**: a package tree is extracted to `tmp/` and renamed
//!   into `store/` under a per-package write gate.
//! - **Outcomes**: operations report `Loading | Success | NotFound | Error`
//!   instead of failing past their boundary.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.lpk/
//! ├── store/        # One directory per imported package
//! ├── tmp/          # Extraction staging (same volume as store/)
//! ├── config.toml   # Optional settings
//! └── state.db      # SQLite database
//! ```

pub mod cmd;
pub mod ops;
pub mod store;
pub mod ui;

pub use crate::store::DbHandle;
pub use lpk_core::paths::*;

use clap::{Parser, Subcommand};
use lpk_schema::ResultType;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "lpk")]
#[command(author, version, about = "lpk - import and launch EIDU learning packages")]
pub struct Cli {
    /// Home directory (defaults to ~/.lpk)
    #[arg(long, global = true, env = "LPK_HOME")]
    pub home: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Import learning package archives
    Import {
        /// Package zip file(s)
        #[arg(required = true)]
        archives: Vec<PathBuf>,
    },
    /// List imported learning apps
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List the units of a learning app
    Units {
        /// Package identifier
        package: String,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Manage units by hand
    Unit {
        #[command(subcommand)]
        command: UnitCommands,
    },
    /// Create or change a learning app record
    Edit {
        /// Package identifier
        package: String,
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Launch activity class (e.g. .MainActivity)
        #[arg(long)]
        activity: Option<String>,
    },
    /// Remove learning apps, their units and files
    Remove {
        /// Package identifier(s)
        #[arg(required = true)]
        packages: Vec<String>,
    },
    /// Build the launch request for a unit
    Launch {
        /// Package identifier
        package: String,
        /// Unit id
        unit: String,
        /// Remaining foreground time in milliseconds
        #[arg(long)]
        remaining_ms: Option<u64>,
        /// Inactivity timeout in milliseconds
        #[arg(long)]
        inactivity_ms: Option<u64>,
        /// Run id (defaults to the configured value)
        #[arg(long)]
        run_id: Option<String>,
        /// Learner id (defaults to the configured value)
        #[arg(long)]
        learner_id: Option<String>,
        /// School id (defaults to the configured value)
        #[arg(long)]
        school_id: Option<String>,
        /// Stage (defaults to the configured value)
        #[arg(long)]
        stage: Option<String>,
        /// Write the request JSON here instead of stdout
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Decode a unit response
    Result {
        /// Unit response JSON file
        file: PathBuf,
    },
    /// Answer a launch request as a unit would
    Respond {
        /// Launch request JSON file
        request: PathBuf,
        /// Result type
        #[arg(long = "type", value_parser = parse_result_type)]
        result_type: ResultType,
        /// Score between 0 and 1 (Success only)
        #[arg(long)]
        score: Option<f32>,
        /// Foreground duration in milliseconds
        #[arg(long, default_value_t = 0)]
        duration_ms: u64,
        /// Error details (Error only)
        #[arg(long)]
        details: Option<String>,
        /// Opaque additional data
        #[arg(long)]
        additional_data: Option<String>,
        /// Result items as a JSON array
        #[arg(long)]
        items: Option<String>,
        /// Write the response JSON here instead of stdout
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Read an asset through the unit access rules
    Asset {
        /// Asset address (content://<authority>/<package>/<path>?unit=<id>)
        uri: String,
        /// Write the bytes here instead of stdout
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// View the import history of a learning app
    History {
        /// Package identifier
        package: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum UnitCommands {
    /// Add or replace a unit of an imported app
    Add {
        /// Package identifier
        package: String,
        /// Unit id
        unit: String,
        /// Icon path inside the package
        #[arg(long, default_value = "")]
        icon: String,
        /// Permitted asset path or directory prefix (repeatable)
        #[arg(long = "asset")]
        assets: Vec<String>,
    },
}

fn parse_result_type(s: &str) -> Result<ResultType, String> {
    ResultType::parse(s).ok_or_else(|| {
        let known: Vec<&str> = ResultType::ALL.into_iter().map(ResultType::as_str).collect();
        format!("expected one of: {}", known.join(", "))
    })
}
