use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::RunRequest;
use super::provider::{RecurrenceRule, TaskConfigProvider};

/// Periodic trigger loop.
///
/// Fires a [`RunRequest`] every `rule.every` and re-reads the rule from the
/// provider every `sync_interval`. A changed interval re-arms the timer from
/// the moment the change is seen. If a resync fails, the last good rule stays
/// in force. Only the initial read is fatal.
///
/// Triggers are handed over with `try_send`: when the worker still has a
/// request queued, the new trigger is dropped instead of piling up.
pub struct Scheduler {
    provider: Arc<TaskConfigProvider>,
    sync_interval: Duration,
    runs: mpsc::Sender<RunRequest>,
}

impl Scheduler {
    pub fn new(
        provider: Arc<TaskConfigProvider>,
        sync_interval: Duration,
        runs: mpsc::Sender<RunRequest>,
    ) -> Self {
        Self {
            provider,
            sync_interval,
            runs,
        }
    }

    /// Run until `shutdown` resolves or the worker goes away
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let mut rule = self
            .fetch_rule()
            .await
            .context("Failed to read initial task configuration")?;
        info!(
            "Scheduling {:?} {} (resync every {:?})",
            rule.request.magic_word,
            rule.cronspec(),
            self.sync_interval
        );

        let mut next_fire = deadline(rule.every)?;
        let mut resync = tokio::time::interval_at(Instant::now() + self.sync_interval, self.sync_interval);
        resync.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Scheduler stopping");
                    return Ok(());
                }
                _ = tokio::time::sleep_until(next_fire) => {
                    next_fire = deadline(rule.every)?;
                    match self.runs.try_send(rule.request.clone()) {
                        Ok(()) => debug!("Triggered run for {:?}", rule.request.magic_word),
                        Err(TrySendError::Full(_)) => {
                            warn!("Previous run still pending, skipping this trigger");
                        }
                        Err(TrySendError::Closed(_)) => {
                            info!("Worker gone, scheduler stopping");
                            return Ok(());
                        }
                    }
                }
                _ = resync.tick() => {
                    let fetched = self.fetch_rule().await.and_then(|fresh| {
                        let rearm = if fresh.every != rule.every {
                            Some(deadline(fresh.every)?)
                        } else {
                            None
                        };
                        Ok((fresh, rearm))
                    });
                    match fetched {
                        Ok((fresh, rearm)) if fresh != rule => {
                            info!(
                                "Task configuration changed: {:?} {} -> {:?} {}",
                                rule.request.magic_word,
                                rule.cronspec(),
                                fresh.request.magic_word,
                                fresh.cronspec()
                            );
                            if let Some(at) = rearm {
                                next_fire = at;
                            }
                            rule = fresh;
                        }
                        Ok(_) => debug!("Task configuration unchanged"),
                        Err(err) => warn!(
                            "Task configuration resync failed, keeping {}: {:#}",
                            rule.cronspec(),
                            err
                        ),
                    }
                }
            }
        }
    }

    async fn fetch_rule(&self) -> Result<RecurrenceRule> {
        let provider = self.provider.clone();
        tokio::task::spawn_blocking(move || provider.recurrence())
            .await
            .context("Task configuration read panicked")?
    }
}

/// When a rule of period `every` next fires, measured from now
fn deadline(every: Duration) -> Result<Instant> {
    Instant::now()
        .checked_add(every)
        .with_context(|| format!("Interval {:?} is too large to schedule", every))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Store, TaskConfig};

    fn provider(store: Arc<MemoryStore>, interval: f64, magic_word: &str) -> Arc<TaskConfigProvider> {
        Arc::new(TaskConfigProvider::new(
            store,
            TaskConfig {
                interval,
                magic_word: magic_word.into(),
            },
        ))
    }

    async fn next(rx: &mut mpsc::Receiver<RunRequest>) -> RunRequest {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no trigger within 5s")
            .expect("scheduler dropped the channel")
    }

    #[tokio::test]
    async fn test_fires_repeatedly() {
        let store = Arc::new(MemoryStore::new());
        let (tx, mut rx) = mpsc::channel(1);
        let scheduler = Scheduler::new(provider(store, 0.02, "foo"), Duration::from_secs(60), tx);
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(scheduler.run(async move {
            let _ = stop_rx.await;
        }));

        for _ in 0..3 {
            assert_eq!(next(&mut rx).await.magic_word, "foo");
        }

        stop_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_picks_up_config_changes_on_resync() {
        let store = Arc::new(MemoryStore::new());
        let (tx, mut rx) = mpsc::channel(1);
        let scheduler = Scheduler::new(
            provider(store.clone(), 0.02, "before"),
            Duration::from_millis(20),
            tx,
        );
        let handle = tokio::spawn(scheduler.run(std::future::pending()));

        assert_eq!(next(&mut rx).await.magic_word, "before");

        store
            .put_task_config(&TaskConfig {
                interval: 0.02,
                magic_word: "after".into(),
            })
            .unwrap();

        let mut seen_after = false;
        for _ in 0..50 {
            if next(&mut rx).await.magic_word == "after" {
                seen_after = true;
                break;
            }
        }
        assert!(seen_after, "updated pattern never reached the worker");

        // Dropping the receiver stops the scheduler on its next trigger
        drop(rx);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_invalid_initial_config_is_fatal() {
        let store = Arc::new(MemoryStore::new());
        store
            .put_task_config(&TaskConfig {
                interval: 0.0,
                magic_word: "foo".into(),
            })
            .unwrap();
        let (tx, _rx) = mpsc::channel(1);
        let scheduler = Scheduler::new(provider(store, 1.0, "foo"), Duration::from_secs(1), tx);

        assert!(scheduler.run(std::future::pending()).await.is_err());
    }

    #[tokio::test]
    async fn test_huge_initial_interval_is_an_error_not_a_panic() {
        let store = Arc::new(MemoryStore::new());
        store
            .put_task_config(&TaskConfig {
                interval: 1e19,
                magic_word: "foo".into(),
            })
            .unwrap();
        let (tx, _rx) = mpsc::channel(1);
        let scheduler = Scheduler::new(provider(store, 1.0, "foo"), Duration::from_secs(1), tx);

        let joined = tokio::spawn(scheduler.run(std::future::pending())).await;
        let outcome = joined.expect("scheduler must not panic");
        assert!(outcome.is_err());
    }

    #[test]
    fn test_deadline_rejects_overflow() {
        assert!(deadline(Duration::from_secs(1)).is_ok());
        assert!(deadline(Duration::MAX).is_err());
    }

    #[tokio::test]
    async fn test_bad_update_keeps_last_good_rule() {
        let store = Arc::new(MemoryStore::new());
        let (tx, mut rx) = mpsc::channel(1);
        let scheduler = Scheduler::new(
            provider(store.clone(), 0.02, "good"),
            Duration::from_millis(10),
            tx,
        );
        let handle = tokio::spawn(scheduler.run(std::future::pending()));

        assert_eq!(next(&mut rx).await.magic_word, "good");
        store
            .put_task_config(&TaskConfig {
                interval: -3.0,
                magic_word: "bad".into(),
            })
            .unwrap();

        for _ in 0..5 {
            assert_eq!(next(&mut rx).await.magic_word, "good");
        }

        store
            .put_task_config(&TaskConfig {
                interval: 1e19,
                magic_word: "huge".into(),
            })
            .unwrap();
        for _ in 0..5 {
            assert_eq!(next(&mut rx).await.magic_word, "good");
        }
        assert!(!handle.is_finished());
        handle.abort();
    }
}
