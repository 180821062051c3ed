use anyhow::Result;
use clap::Parser;

use dirwatch::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.run().await
}
