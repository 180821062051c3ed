use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use super::RunRequest;
use crate::store::{Store, TaskConfig};

/// Recurring trigger derived from the stored task configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RecurrenceRule {
    pub every: Duration,
    pub request: RunRequest,
}

impl RecurrenceRule {
    /// Cron-style description, e.g. `@every 30s`
    pub fn cronspec(&self) -> String {
        format!("@every {}s", self.every.as_secs_f64())
    }
}

/// Hands the scheduler the current recurrence rule. Queried again on every
/// resync, so stored configuration changes apply without a restart.
pub struct TaskConfigProvider {
    store: Arc<dyn Store>,
    defaults: TaskConfig,
}

impl TaskConfigProvider {
    pub fn new(store: Arc<dyn Store>, defaults: TaskConfig) -> Self {
        Self { store, defaults }
    }

    /// Stored task configuration, persisting the defaults on first use
    pub fn current(&self) -> Result<TaskConfig> {
        self.store
            .task_config(&self.defaults)
            .context("Failed to read task configuration")
    }

    /// Read faults are returned as-is; no default rule is substituted.
    pub fn recurrence(&self) -> Result<RecurrenceRule> {
        let config = self.current()?;
        let every = config.every().context("Stored task configuration is invalid")?;

        Ok(RecurrenceRule {
            every,
            request: RunRequest {
                magic_word: config.magic_word,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, ResultId, RunResult, StoredResult};

    fn defaults() -> TaskConfig {
        TaskConfig {
            interval: 30.0,
            magic_word: "TODO".into(),
        }
    }

    #[test]
    fn test_rule_from_defaults() {
        let store = Arc::new(MemoryStore::new());
        let provider = TaskConfigProvider::new(store.clone(), defaults());

        let rule = provider.recurrence().unwrap();
        assert_eq!(rule.every, Duration::from_secs(30));
        assert_eq!(rule.request.magic_word, "TODO");
        assert_eq!(rule.cronspec(), "@every 30s");

        // Defaults were persisted on first read
        let other_defaults = TaskConfig {
            interval: 1.0,
            magic_word: "other".into(),
        };
        assert_eq!(store.task_config(&other_defaults).unwrap(), defaults());
    }

    #[test]
    fn test_rule_follows_updates() {
        let store = Arc::new(MemoryStore::new());
        let provider = TaskConfigProvider::new(store.clone(), defaults());
        provider.recurrence().unwrap();

        store
            .put_task_config(&TaskConfig {
                interval: 0.5,
                magic_word: "needle".into(),
            })
            .unwrap();

        let rule = provider.recurrence().unwrap();
        assert_eq!(rule.every, Duration::from_millis(500));
        assert_eq!(rule.request.magic_word, "needle");
        assert_eq!(rule.cronspec(), "@every 0.5s");
    }

    #[test]
    fn test_out_of_range_intervals_are_errors() {
        for interval in [1e19, 1e-12] {
            let store = Arc::new(MemoryStore::new());
            store
                .put_task_config(&TaskConfig {
                    interval,
                    magic_word: "x".into(),
                })
                .unwrap();
            let provider = TaskConfigProvider::new(store, defaults());
            assert!(provider.recurrence().is_err(), "interval {interval}");
        }
    }

    #[test]
    fn test_invalid_stored_interval_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        store
            .put_task_config(&TaskConfig {
                interval: -1.0,
                magic_word: "x".into(),
            })
            .unwrap();
        let provider = TaskConfigProvider::new(store, defaults());
        assert!(provider.recurrence().is_err());
    }

    struct BrokenStore;

    impl Store for BrokenStore {
        fn task_config(&self, _defaults: &TaskConfig) -> Result<TaskConfig> {
            anyhow::bail!("connection refused")
        }
        fn put_task_config(&self, _config: &TaskConfig) -> Result<()> {
            anyhow::bail!("connection refused")
        }
        fn append_result(&self, _result: &RunResult) -> Result<ResultId> {
            anyhow::bail!("connection refused")
        }
        fn update_result(&self, _id: ResultId, _result: &RunResult) -> Result<()> {
            anyhow::bail!("connection refused")
        }
        fn last_result(&self) -> Result<Option<RunResult>> {
            anyhow::bail!("connection refused")
        }
        fn results(&self, _page: usize, _size: usize) -> Result<Vec<StoredResult>> {
            anyhow::bail!("connection refused")
        }
        fn running_results(&self) -> Result<Vec<StoredResult>> {
            anyhow::bail!("connection refused")
        }
    }

    #[test]
    fn test_read_failure_is_reported_not_defaulted() {
        let provider = TaskConfigProvider::new(Arc::new(BrokenStore), defaults());
        let err = provider.recurrence().unwrap_err();
        assert!(format!("{:#}", err).contains("connection refused"));
    }
}
