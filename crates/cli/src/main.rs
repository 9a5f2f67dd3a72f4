//! resync - resumable copy and sync
//!
//! Copies files and directory trees between the local filesystem and
//! S3-compatible storage, checkpointing progress so interrupted transfers
//! can be resumed.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use resync_cli::commands::{self, Cli};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    commands::execute(cli).await.into()
}
