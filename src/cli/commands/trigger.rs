//! Run a single scan now

use anyhow::{Context as _, Result};
use clap::Args;
use std::sync::Arc;

use super::{Context, OutputFormat};
use crate::store::RunStatus;
use crate::tasks::{RunRequest, TaskConfigProvider, TaskExecutor};

#[derive(Args)]
pub struct TriggerArgs {
    /// Count this pattern instead of the stored magic word (not persisted)
    #[arg(long)]
    pub magic_word: Option<String>,
}

pub async fn execute(args: TriggerArgs, ctx: Context) -> Result<()> {
    let provider = TaskConfigProvider::new(ctx.store.clone(), ctx.settings.task.default_task_config());
    let executor = Arc::new(TaskExecutor::new(
        ctx.store.clone(),
        ctx.scanner(),
        ctx.settings.scanner.root_path.clone(),
    ));

    let outcome = tokio::task::spawn_blocking(move || {
        let magic_word = match args.magic_word {
            Some(magic_word) => magic_word,
            None => provider.current()?.magic_word,
        };
        executor.execute(&RunRequest { magic_word })
    })
    .await
    .context("Run panicked")??;

    match ctx.format {
        OutputFormat::Json => ctx.output.json(&outcome)?,
        OutputFormat::Text => ctx.output.run_result(&outcome),
    }

    if outcome.result.status == RunStatus::Failed {
        anyhow::bail!("Run {} failed: {}", outcome.id, outcome.result.error);
    }
    Ok(())
}
