//! Configuration management for dirwatch
//!
//! Settings are layered with figment (see [`DirwatchConfig`]) and extracted
//! into the typed structures below. The scanned root, the fallback task
//! configuration and the store location all come from here.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod core;

pub use core::DirwatchConfig;

use crate::store::TaskConfig;

/// Main configuration structure for dirwatch
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub scanner: ScannerSettings,
    pub task: TaskSettings,
    pub store: StoreSettings,
    pub results: ResultsSettings,
}

/// Directory scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    /// Directory tree scanned on every run
    pub root_path: PathBuf,

    /// Follow symbolic links while walking
    pub follow_symlinks: bool,

    /// Counter workers (0 = derive from thread_percentage)
    pub max_threads: usize,

    /// Percentage of CPU cores to use when max_threads is 0
    pub thread_percentage: u8,
}

/// Fallback task configuration and scheduler cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSettings {
    /// Interval in seconds used when no task configuration is stored
    pub default_interval: f64,

    /// Pattern used when no task configuration is stored
    pub default_magic_word: String,

    /// Seconds between scheduler resyncs
    pub sync_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// SQLite database file
    pub database: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultsSettings {
    pub page_size: usize,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("."),
            follow_symlinks: false,
            max_threads: 1,
            thread_percentage: 75,
        }
    }
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            default_interval: 60.0,
            default_magic_word: "TODO".to_string(),
            sync_interval_secs: 10,
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database: PathBuf::from("dirwatch.db"),
        }
    }
}

impl Default for ResultsSettings {
    fn default() -> Self {
        Self { page_size: 10 }
    }
}

impl TaskSettings {
    /// Task configuration persisted the first time none is found in the store
    pub fn default_task_config(&self) -> TaskConfig {
        TaskConfig {
            interval: self.default_interval,
            magic_word: self.default_magic_word.clone(),
        }
    }
}

impl Settings {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.task
            .default_task_config()
            .validate()
            .context("Invalid task.default_interval")?;

        if self.task.sync_interval_secs == 0 {
            anyhow::bail!("task.sync_interval_secs cannot be 0");
        }

        if self.results.page_size == 0 {
            anyhow::bail!("results.page_size cannot be 0");
        }

        if !(1..=100).contains(&self.scanner.thread_percentage) {
            anyhow::bail!(
                "scanner.thread_percentage must be between 1 and 100, got {}",
                self.scanner.thread_percentage
            );
        }

        if self.scanner.root_path.as_os_str().is_empty() {
            anyhow::bail!("scanner.root_path cannot be empty");
        }

        Ok(())
    }
}
