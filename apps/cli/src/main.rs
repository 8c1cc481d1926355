//! docketwatch CLI — court decision feed monitor.
//!
//! Ingests the court's opinions-and-orders RSS feed, deduplicates against
//! a local ledger, and delivers an HTML digest of newly issued decisions.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
