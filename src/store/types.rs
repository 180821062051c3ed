use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::scanner::ScanReport;

/// Recurring task configuration: how often to run and what to search for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskConfig {
    /// Seconds between runs
    pub interval: f64,
    /// Pattern (regex or literal) counted in every scanned file
    pub magic_word: String,
}

impl TaskConfig {
    /// Shortest accepted interval; anything below would keep the scheduler busy
    pub const MIN_INTERVAL_SECS: f64 = 0.001;
    /// Longest accepted interval (one year)
    pub const MAX_INTERVAL_SECS: f64 = 365.0 * 24.0 * 60.0 * 60.0;

    pub fn validate(&self) -> Result<()> {
        self.every().map(|_| ())
    }

    /// The interval as a [`Duration`], rejecting values outside
    /// `MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS`
    pub fn every(&self) -> Result<Duration> {
        if !(self.interval.is_finite()
            && (Self::MIN_INTERVAL_SECS..=Self::MAX_INTERVAL_SECS).contains(&self.interval))
        {
            anyhow::bail!(
                "interval must be between {} and {} seconds, got {}",
                Self::MIN_INTERVAL_SECS,
                Self::MAX_INTERVAL_SECS,
                self.interval
            );
        }
        Ok(Duration::from_secs_f64(self.interval))
    }
}

/// Identifier assigned by the store when a run record is appended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultId(pub i64);

impl fmt::Display for ResultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a run record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "running" => Ok(RunStatus::Running),
            "success" => Ok(RunStatus::Success),
            "failed" => Ok(RunStatus::Failed),
            other => anyhow::bail!("Unknown run status: {}", other),
        }
    }
}

/// Persisted outcome of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    /// Epoch seconds
    pub start_time: i64,
    /// Epoch seconds, zero while running
    pub end_time: i64,
    /// Seconds between start and end
    pub run_time: f64,
    pub status: RunStatus,
    pub magic_word: String,
    pub occurrence: u64,
    pub files: Vec<String>,
    pub new_files: Vec<String>,
    pub removed_files: Vec<String>,
    /// Fault description, empty unless the run failed
    pub error: String,
}

impl RunResult {
    /// Shell written before scanning begins
    pub fn running(magic_word: impl Into<String>, start_time: i64) -> Self {
        Self {
            start_time,
            end_time: 0,
            run_time: 0.0,
            status: RunStatus::Running,
            magic_word: magic_word.into(),
            occurrence: 0,
            files: Vec::new(),
            new_files: Vec::new(),
            removed_files: Vec::new(),
            error: String::new(),
        }
    }

    /// Move to `success`, copying the scan report
    pub fn succeed(&mut self, report: ScanReport, end_time: i64, run_time: f64) {
        self.end_time = end_time;
        self.run_time = run_time;
        self.occurrence = report.occurrence;
        self.files = report.files;
        self.new_files = report.new_files;
        self.removed_files = report.removed_files;
        self.status = RunStatus::Success;
    }

    /// Move to `failed` with a human-readable fault description
    pub fn fail(&mut self, error: impl Into<String>, end_time: i64, run_time: f64) {
        self.end_time = end_time;
        self.run_time = run_time;
        self.error = error.into();
        self.status = RunStatus::Failed;
    }
}

/// A run record together with its store identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResult {
    pub id: ResultId,
    #[serde(flatten)]
    pub result: RunResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [RunStatus::Running, RunStatus::Success, RunStatus::Failed] {
            assert_eq!(status.as_str().parse::<RunStatus>().unwrap(), status);
        }
        assert!("stuck".parse::<RunStatus>().is_err());
    }

    #[test]
    fn test_running_shell_is_not_terminal() {
        let result = RunResult::running("foo", 100);
        assert_eq!(result.status, RunStatus::Running);
        assert!(!result.status.is_terminal());
        assert!(result.error.is_empty());
        assert_eq!(result.end_time, 0);
    }

    #[test]
    fn test_fail_keeps_scan_fields_empty() {
        let mut result = RunResult::running("foo", 100);
        result.fail("boom", 103, 2.5);
        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(result.error, "boom");
        assert_eq!(result.end_time, 103);
        assert!(result.files.is_empty());
    }

    #[test]
    fn test_json_field_names() {
        let result = RunResult::running("foo", 1);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "running");
        assert_eq!(json["magicWord"], "foo");
        assert!(json.get("newFiles").is_some());
        assert!(json.get("removedFiles").is_some());
    }

    #[test]
    fn test_task_config_validation() {
        let mut config = TaskConfig {
            interval: 5.0,
            magic_word: "foo".into(),
        };
        assert!(config.validate().is_ok());
        config.interval = 0.0;
        assert!(config.validate().is_err());
        config.interval = f64::INFINITY;
        assert!(config.validate().is_err());
        config.interval = 1e19;
        assert!(config.validate().is_err());
        config.interval = 1e-12;
        assert!(config.validate().is_err());
        config.interval = TaskConfig::MAX_INTERVAL_SECS;
        assert_eq!(
            config.every().unwrap(),
            Duration::from_secs(365 * 24 * 60 * 60)
        );
        config.interval = 0.02;
        let every = config.every().unwrap();
        assert!((every.as_secs_f64() - 0.02).abs() < 1e-9);
    }
}
