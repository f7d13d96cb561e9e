use anyhow::Result;
use clap::Parser;
use log::info;

use circlog::cli::Cli;

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    info!("Starting circlog");
    cli.execute()?;

    Ok(())
}
