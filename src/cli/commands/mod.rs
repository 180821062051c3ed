use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::cli::Output;
use crate::config::{DirwatchConfig, Settings};
use crate::scanner::{DirectoryScanner, ScannerConfig};
use crate::store::{MemoryStore, SqliteStore, Store};

pub mod config;
pub mod results;
pub mod serve;
pub mod trigger;

#[derive(Parser)]
#[command(
    name = "dirwatch",
    version = crate::VERSION,
    about = "Periodically scan a directory, count pattern occurrences and track added or removed files",
    long_about = "dirwatch re-walks a directory tree on a schedule, counts matches of a configurable \
                  pattern in every file, and records which files appeared or disappeared since the \
                  previous successful run."
)]
pub struct Cli {
    /// Run as if started in <DIR> instead of current working directory
    #[arg(short = 'C', long = "directory", global = true)]
    pub directory: Option<String>,

    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use custom configuration file
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Database file (overrides store.database)
    #[arg(long, global = true, env = "DIRWATCH_DATABASE")]
    pub database: Option<PathBuf>,

    /// Keep everything in memory, ignoring --database; nothing outlives the process
    #[arg(long, global = true)]
    pub in_memory: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the scheduler and worker until interrupted
    Serve(serve::ServeArgs),
    /// Run one scan now with the stored task configuration
    Trigger(trigger::TriggerArgs),
    /// Show stored run results, newest first
    Results(results::ResultsArgs),
    /// Show or replace the task configuration
    Config(config::ConfigArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Styled human-readable output
    Text,
    /// JSON for machine processing
    Json,
}

/// Everything a command needs: settings, the shared store and output
pub struct Context {
    pub settings: Settings,
    pub store: Arc<dyn Store>,
    /// SQLite file backing `store`; `None` with `--in-memory`
    pub database: Option<PathBuf>,
    pub output: Output,
    pub format: OutputFormat,
}

impl Context {
    fn load(cli: &Cli) -> Result<Self> {
        let settings = DirwatchConfig::load_with_custom_config(cli.config.as_deref())?.settings()?;
        let (store, database): (Arc<dyn Store>, _) = if cli.in_memory {
            debug!("Using in-memory store");
            (Arc::new(MemoryStore::new()), None)
        } else {
            let database = cli
                .database
                .clone()
                .unwrap_or_else(|| settings.store.database.clone());
            debug!("Using database {}", database.display());
            (Arc::new(SqliteStore::open(&database)?), Some(database))
        };

        Ok(Self {
            settings,
            store,
            database,
            output: Output::new(cli.quiet),
            format: cli.format,
        })
    }
}

impl Context {
    /// Scanner for `scanner.root_path` that never counts the store's own files
    pub fn scanner(&self) -> DirectoryScanner {
        let config = ScannerConfig::from(&self.settings.scanner);
        match &self.database {
            Some(database) => DirectoryScanner::new(config.exclude_store_files(database)),
            None => DirectoryScanner::new(config),
        }
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        // Change directory if specified
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)
                .with_context(|| format!("Failed to change directory to {}", dir))?;
        }

        // Set up logging based on verbosity
        setup_logging(self.verbose, self.quiet);

        let ctx = Context::load(&self)?;

        match self.command {
            Commands::Serve(args) => serve::execute(args, ctx).await,
            Commands::Trigger(args) => trigger::execute(args, ctx).await,
            Commands::Results(args) => results::execute(args, ctx).await,
            Commands::Config(args) => config::execute(args, ctx).await,
        }
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    // Walker internals are noisy below trace
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info,ignore=warn,globset=warn"),
            2 => tracing_subscriber::EnvFilter::new("debug,ignore=warn,globset=warn"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
