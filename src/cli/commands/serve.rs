//! Long-running service: scheduler plus worker

use anyhow::{Context as _, Result};
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

use super::Context;
use crate::tasks::{Scheduler, TaskConfigProvider, TaskExecutor, Worker};

#[derive(Args)]
pub struct ServeArgs {
    /// Seconds between task configuration resyncs (overrides task.sync_interval_secs)
    #[arg(long)]
    pub sync_interval: Option<u64>,
}

pub async fn execute(args: ServeArgs, ctx: Context) -> Result<()> {
    let sync_secs = args
        .sync_interval
        .unwrap_or(ctx.settings.task.sync_interval_secs);
    if sync_secs == 0 {
        anyhow::bail!("Sync interval must be greater than zero");
    }

    let provider = Arc::new(TaskConfigProvider::new(
        ctx.store.clone(),
        ctx.settings.task.default_task_config(),
    ));
    let executor = Arc::new(TaskExecutor::new(
        ctx.store.clone(),
        ctx.scanner(),
        ctx.settings.scanner.root_path.clone(),
    ));

    // One pending request at most; see Scheduler
    let (runs_tx, runs_rx) = mpsc::channel(1);
    let scheduler = Scheduler::new(provider, Duration::from_secs(sync_secs), runs_tx);
    let worker = Worker::new(executor, ctx.store.clone());

    ctx.output.info(&format!(
        "Watching {} (Ctrl-C to stop)",
        ctx.settings.scanner.root_path.display()
    ));

    let worker_handle = tokio::spawn(worker.run(runs_rx));
    let scheduled = scheduler
        .run(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", err);
                std::future::pending::<()>().await;
            }
        })
        .await;

    // The scheduler owned the only sender; the worker drains and exits
    info!("Waiting for the worker to finish");
    worker_handle.await.context("Worker panicked")??;

    scheduled?;
    ctx.output.success("Stopped");
    Ok(())
}
