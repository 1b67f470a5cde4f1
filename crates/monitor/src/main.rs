//! Drowsiness Monitor - Main Entry Point

use clap::Parser;
use monitor::{run, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run(Cli::parse()).await
}
