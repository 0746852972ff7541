//! oobswap CLI: apply out-of-band swaps from a response to a page.
//!
//! Reads a page and a response body from disk, reconciles the response's OOB
//! nodes into the page, and prints the primary content, the swap record and
//! the resulting page.

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
