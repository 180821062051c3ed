//! Terminal output for dirwatch commands
//!
//! Styled status lines plus renderers for run records and the task
//! configuration. Machine-readable output goes through [`Output::json`].

use anyhow::{Context, Result};
use console::style;
use serde::Serialize;

use crate::store::{RunStatus, StoredResult, TaskConfig};

/// Output handler for consistent CLI formatting
pub struct Output {
    quiet: bool,
}

impl Output {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("✔").green(), message);
        }
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("ℹ").blue(), message);
        }
    }

    /// Print a header/title
    pub fn header(&self, title: &str) {
        if !self.quiet {
            println!("\n{}", style(title).bold().underlined());
        }
    }

    /// Print a key-value pair with consistent styling
    pub fn key_value(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {:<14} {}", style(key).dim(), value);
        }
    }

    /// Pretty JSON on stdout; printed even in quiet mode
    pub fn json<T: Serialize>(&self, value: &T) -> Result<()> {
        let rendered = serde_json::to_string_pretty(value).context("Failed to encode output")?;
        println!("{}", rendered);
        Ok(())
    }

    pub fn task_config(&self, config: &TaskConfig) {
        self.key_value("interval", &format!("{}s", config.interval));
        self.key_value("magic word", &format!("{:?}", config.magic_word));
    }

    /// One run record, with file lists
    pub fn run_result(&self, stored: &StoredResult) {
        if self.quiet {
            return;
        }
        let result = &stored.result;
        let status = match result.status {
            RunStatus::Success => style(result.status.as_str()).green().bold(),
            RunStatus::Failed => style(result.status.as_str()).red().bold(),
            RunStatus::Running => style(result.status.as_str()).yellow().bold(),
        };
        println!(
            "{} {} {}",
            style(format!("#{}", stored.id)).cyan().bold(),
            status,
            style(format!("started {}", format_epoch(result.start_time))).dim()
        );
        self.key_value("magic word", &format!("{:?}", result.magic_word));
        if result.status.is_terminal() {
            self.key_value("run time", &format!("{:.3}s", result.run_time));
        }
        match result.status {
            RunStatus::Success => {
                self.key_value("occurrences", &result.occurrence.to_string());
                self.key_value("files", &result.files.len().to_string());
                self.file_list("new", &result.new_files, "+");
                self.file_list("removed", &result.removed_files, "-");
            }
            RunStatus::Failed => self.key_value("error", &result.error),
            RunStatus::Running => {}
        }
    }

    fn file_list(&self, label: &str, files: &[String], marker: &str) {
        self.key_value(label, &files.len().to_string());
        for file in files {
            println!("    {} {}", style(marker).dim(), file);
        }
    }
}

fn format_epoch(seconds: i64) -> String {
    chrono::DateTime::from_timestamp(seconds, 0)
        .map(|time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| seconds.to_string())
}
