//! Durable storage for run results and the task configuration
//!
//! The [`Store`] trait is the seam between the run machinery and the
//! persistence backend. One store is opened per process and shared as an
//! `Arc<dyn Store>` with the executor, the config provider and the CLI.

use anyhow::Result;

pub mod memory;
pub mod sqlite;
pub mod types;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use types::{ResultId, RunResult, RunStatus, StoredResult, TaskConfig};

pub trait Store: Send + Sync {
    /// Current task configuration. When none is stored yet, `defaults` is
    /// persisted and returned, so later reads see the same values.
    fn task_config(&self, defaults: &TaskConfig) -> Result<TaskConfig>;

    /// Replace the stored task configuration wholesale.
    fn put_task_config(&self, config: &TaskConfig) -> Result<()>;

    /// Append a new run record and return its identifier.
    fn append_result(&self, result: &RunResult) -> Result<ResultId>;

    /// Overwrite an existing run record.
    fn update_result(&self, id: ResultId, result: &RunResult) -> Result<()>;

    /// Most recent successful run, by end time.
    fn last_result(&self) -> Result<Option<RunResult>>;

    /// One page (0-based) of run records, newest start time first.
    fn results(&self, page: usize, size: usize) -> Result<Vec<StoredResult>>;

    /// Records still marked `running`, oldest first.
    fn running_results(&self) -> Result<Vec<StoredResult>>;
}

#[cfg(test)]
pub(crate) mod contract;
