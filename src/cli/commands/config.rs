//! Show or replace the stored task configuration

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};

use super::{Context, OutputFormat};
use crate::store::TaskConfig;
use crate::tasks::TaskConfigProvider;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the stored task configuration, creating it from defaults if absent
    Show,
    /// Replace the task configuration
    Set(SetArgs),
}

#[derive(Args)]
pub struct SetArgs {
    /// Seconds between runs (fractions allowed)
    #[arg(long)]
    pub interval: f64,

    /// Regular expression counted in every file
    #[arg(long)]
    pub magic_word: String,
}

pub async fn execute(args: ConfigArgs, ctx: Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show(ctx).await,
        ConfigCommand::Set(set_args) => set(set_args, ctx).await,
    }
}

async fn show(ctx: Context) -> Result<()> {
    let provider = TaskConfigProvider::new(ctx.store.clone(), ctx.settings.task.default_task_config());
    let config = tokio::task::spawn_blocking(move || provider.current())
        .await
        .context("Task configuration read panicked")??;

    match ctx.format {
        OutputFormat::Json => ctx.output.json(&config),
        OutputFormat::Text => {
            ctx.output.header("Task configuration");
            ctx.output.task_config(&config);
            Ok(())
        }
    }
}

async fn set(args: SetArgs, ctx: Context) -> Result<()> {
    let config = TaskConfig {
        interval: args.interval,
        magic_word: args.magic_word,
    };
    config.validate()?;

    let store = ctx.store.clone();
    let stored = config.clone();
    tokio::task::spawn_blocking(move || store.put_task_config(&stored))
        .await
        .context("Task configuration write panicked")?
        .context("Failed to store task configuration")?;

    match ctx.format {
        OutputFormat::Json => ctx.output.json(&config),
        OutputFormat::Text => {
            ctx.output.success("Task configuration updated");
            ctx.output.task_config(&config);
            ctx.output
                .info("A running service picks this up on its next resync");
            Ok(())
        }
    }
}
