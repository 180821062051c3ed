//! Command-line interface for dirwatch
//!
//! Subcommands cover the long-running service (`serve`) and the operator
//! surface: trigger a run, page through results, inspect or replace the
//! task configuration.

pub mod commands;
pub mod output;

pub use commands::Cli;
pub use output::Output;
