//! # dirwatch - periodic directory scan and diff
//!
//! dirwatch walks a directory tree on a schedule, counts occurrences of a
//! regular expression (the "magic word") in every file, and records which
//! files appeared or disappeared since the previous successful run.
//!
//! ## Layout
//!
//! - [`scanner`]: parallel walk-and-count over one directory tree
//! - [`store`]: run results and the task configuration (SQLite or in-memory)
//! - [`tasks`]: scheduler, worker and the per-run state machine
//! - [`config`]: layered settings
//! - [`cli`]: the `dirwatch` command
//!
//! ## Quick Start
//!
//! ```bash
//! dirwatch config set --interval 30 --magic-word 'TODO|FIXME'
//! dirwatch serve
//! dirwatch results --page 1
//! ```

pub mod cli;
pub mod config;
pub mod parallel;
pub mod scanner;
pub mod store;
pub mod tasks;

pub use cli::{Cli, Output};
pub use config::DirwatchConfig;

/// Result type alias for dirwatch operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
