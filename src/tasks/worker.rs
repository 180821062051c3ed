use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::RunRequest;
use super::executor::TaskExecutor;
use crate::store::Store;

/// Consumes triggered runs one at a time.
///
/// Runs must not overlap: each one diffs against the last successful result,
/// so two concurrent runs would read the same baseline and report
/// inconsistent new and removed files.
pub struct Worker {
    executor: Arc<TaskExecutor>,
    store: Arc<dyn Store>,
}

impl Worker {
    pub fn new(executor: Arc<TaskExecutor>, store: Arc<dyn Store>) -> Self {
        Self { executor, store }
    }

    /// Execute requests until the channel closes
    pub async fn run(self, mut runs: mpsc::Receiver<RunRequest>) -> Result<()> {
        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || Self::stuck_count(store.as_ref())).await {
            Ok(Ok(0)) => {}
            Ok(Ok(count)) => warn!("{} run(s) from earlier processes never finished", count),
            Ok(Err(err)) => warn!("Could not check for unfinished runs: {:#}", err),
            Err(err) => warn!("Unfinished run check panicked: {}", err),
        }

        info!("Worker ready, scanning {}", self.executor.root().display());

        while let Some(request) = runs.recv().await {
            let executor = self.executor.clone();
            match tokio::task::spawn_blocking(move || executor.execute(&request)).await {
                Ok(Ok(stored)) => debug!("Run {} finished as {}", stored.id, stored.result.status),
                Ok(Err(err)) => error!("Run aborted: {:#}", err),
                Err(err) => error!("Run panicked: {}", err),
            }
        }

        info!("Worker stopping");
        Ok(())
    }

    /// Log runs left `running` by an earlier process. They are not
    /// reconciled: the process may have died mid-scan, or still be alive
    /// elsewhere.
    fn stuck_count(store: &dyn Store) -> Result<usize> {
        let stuck = store.running_results()?;
        for stored in &stuck {
            warn!(
                "Run {} started at {} is still marked running",
                stored.id, stored.result.start_time
            );
        }
        Ok(stuck.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::DirectoryScanner;
    use crate::store::{MemoryStore, RunResult, RunStatus};
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_executes_each_request() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "foo foo foo").unwrap();

        let store = Arc::new(MemoryStore::new());
        let executor = Arc::new(TaskExecutor::new(
            store.clone(),
            DirectoryScanner::default(),
            dir.path(),
        ));
        let worker = Worker::new(executor, store.clone());

        let (tx, rx) = mpsc::channel(4);
        for magic_word in ["foo", "bar"] {
            tx.send(RunRequest {
                magic_word: magic_word.into(),
            })
            .await
            .unwrap();
        }
        drop(tx);

        worker.run(rx).await.unwrap();

        let results = store.results(0, 10).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|s| s.result.status == RunStatus::Success));
        let mut counts: Vec<(String, u64)> = results
            .iter()
            .map(|s| (s.result.magic_word.clone(), s.result.occurrence))
            .collect();
        counts.sort();
        assert_eq!(counts, vec![("bar".into(), 0), ("foo".into(), 3)]);
    }

    #[test]
    fn test_reports_stuck_runs_without_touching_them() {
        let store = Arc::new(MemoryStore::new());
        store.append_result(&RunResult::running("foo", 1)).unwrap();
        assert_eq!(Worker::stuck_count(store.as_ref()).unwrap(), 1);
        assert_eq!(store.running_results().unwrap().len(), 1);
    }
}
