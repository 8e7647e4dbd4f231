//! Terminal output: the console [`Reporter`](lpk_core::Reporter) and tables.

pub mod output;
pub mod table;
pub mod theme;

pub use output::ConsoleReporter;
