//! Page through stored run results

use anyhow::{Context as _, Result};
use clap::Args;

use super::{Context, OutputFormat};

#[derive(Args)]
pub struct ResultsArgs {
    /// Page number, starting at 1 (newest results first)
    #[arg(long, default_value_t = 1)]
    pub page: usize,
}

pub async fn execute(args: ResultsArgs, ctx: Context) -> Result<()> {
    if args.page < 1 {
        anyhow::bail!("Page must be 1 or greater, got {}", args.page);
    }
    let page_size = ctx.settings.results.page_size;

    let store = ctx.store.clone();
    let page = tokio::task::spawn_blocking(move || store.results(args.page - 1, page_size))
        .await
        .context("Results read panicked")?
        .context("Failed to read results")?;

    match ctx.format {
        OutputFormat::Json => ctx.output.json(&page),
        OutputFormat::Text => {
            ctx.output
                .header(&format!("Results (page {}, {} per page)", args.page, page_size));
            if page.is_empty() {
                ctx.output.info("No results on this page");
            }
            for stored in &page {
                println!();
                ctx.output.run_result(stored);
            }
            Ok(())
        }
    }
}
