use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::RunRequest;
use crate::scanner::{DirectoryScanner, ScanReport};
use crate::store::{RunResult, Store, StoredResult};

/// Drives one run through `running → success | failed`.
///
/// The `running` record is persisted before any scanning starts. Faults
/// raised while scanning (including a failed read of the previous result)
/// end the run as `failed` with the fault text in `error`; they are not
/// returned to the caller. Only store faults on the start or finish write
/// are returned, since the run's record cannot be trusted after those.
pub struct TaskExecutor {
    store: Arc<dyn Store>,
    scanner: DirectoryScanner,
    root: PathBuf,
}

impl TaskExecutor {
    pub fn new(store: Arc<dyn Store>, scanner: DirectoryScanner, root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            scanner,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn execute(&self, request: &RunRequest) -> Result<StoredResult> {
        self.run(request, |previous_files| {
            Ok(self
                .scanner
                .scan(&self.root, &request.magic_word, previous_files)?)
        })
    }

    /// State machine around `scan`, which receives the previous run's files
    fn run<F>(&self, request: &RunRequest, scan: F) -> Result<StoredResult>
    where
        F: FnOnce(&[String]) -> Result<ScanReport>,
    {
        let started = Instant::now();
        let start_time = Utc::now().timestamp();

        let mut result = RunResult::running(request.magic_word.as_str(), start_time);
        let id = self
            .store
            .append_result(&result)
            .context("Failed to record run start")?;
        info!(
            "Run {} started: counting {:?} under {}",
            id,
            request.magic_word,
            self.root.display()
        );

        let outcome = self
            .previous_files()
            .and_then(|previous_files| scan(&previous_files));

        // Wall-clock seconds can step backwards; never end before we started
        let end_time = Utc::now().timestamp().max(start_time);
        let run_time = started.elapsed().as_secs_f64();

        match outcome {
            Ok(report) => {
                info!(
                    "Run {} succeeded in {:.3}s: {} occurrences, {} files, {} new, {} removed",
                    id,
                    run_time,
                    report.occurrence,
                    report.files.len(),
                    report.new_files.len(),
                    report.removed_files.len()
                );
                result.succeed(report, end_time, run_time);
            }
            Err(err) => {
                let error = format!("{:#}", err);
                warn!("Run {} failed after {:.3}s: {}", id, run_time, error);
                result.fail(error, end_time, run_time);
            }
        }

        self.store
            .update_result(id, &result)
            .with_context(|| format!("Failed to record final state of run {}", id))?;

        Ok(StoredResult { id, result })
    }

    fn previous_files(&self) -> Result<Vec<String>> {
        Ok(self
            .store
            .last_result()
            .context("Failed to fetch the previous result")?
            .map(|previous| previous.files)
            .unwrap_or_default())
    }
}
