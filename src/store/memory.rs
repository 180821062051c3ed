use anyhow::{Result, anyhow};
use std::sync::{Mutex, MutexGuard};

use super::Store;
use super::types::{ResultId, RunResult, RunStatus, StoredResult, TaskConfig};

/// In-process store, used by tests and `--in-memory` runs
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    results: Vec<StoredResult>,
    task_config: Option<TaskConfig>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))
    }
}

impl Store for MemoryStore {
    fn task_config(&self, defaults: &TaskConfig) -> Result<TaskConfig> {
        let mut inner = self.lock()?;
        Ok(inner
            .task_config
            .get_or_insert_with(|| defaults.clone())
            .clone())
    }

    fn put_task_config(&self, config: &TaskConfig) -> Result<()> {
        self.lock()?.task_config = Some(config.clone());
        Ok(())
    }

    fn append_result(&self, result: &RunResult) -> Result<ResultId> {
        let mut inner = self.lock()?;
        inner.next_id += 1;
        let id = ResultId(inner.next_id);
        inner.results.push(StoredResult {
            id,
            result: result.clone(),
        });
        Ok(id)
    }

    fn update_result(&self, id: ResultId, result: &RunResult) -> Result<()> {
        let mut inner = self.lock()?;
        let stored = inner
            .results
            .iter_mut()
            .find(|stored| stored.id == id)
            .ok_or_else(|| anyhow!("No result with id {}", id))?;
        stored.result = result.clone();
        Ok(())
    }

    fn last_result(&self) -> Result<Option<RunResult>> {
        let inner = self.lock()?;
        Ok(inner
            .results
            .iter()
            .filter(|stored| stored.result.status == RunStatus::Success)
            .max_by_key(|stored| (stored.result.end_time, stored.id))
            .map(|stored| stored.result.clone()))
    }

    fn results(&self, page: usize, size: usize) -> Result<Vec<StoredResult>> {
        let inner = self.lock()?;
        let mut ordered: Vec<&StoredResult> = inner.results.iter().collect();
        ordered.sort_by(|a, b| {
            (b.result.start_time, b.id).cmp(&(a.result.start_time, a.id))
        });
        Ok(ordered
            .into_iter()
            .skip(page.saturating_mul(size))
            .take(size)
            .cloned()
            .collect())
    }

    fn running_results(&self) -> Result<Vec<StoredResult>> {
        let inner = self.lock()?;
        Ok(inner
            .results
            .iter()
            .filter(|stored| stored.result.status == RunStatus::Running)
            .cloned()
            .collect())
    }
}
