//! Tracksift - corpus-mined SDK generation classifier CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tracksift::cli;

fn main() -> Result<()> {
    let args = cli::Cli::parse();

    // RUST_LOG wins over the --log-level flag.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.clone()));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let track1_documents = cli::run(args)?;
    std::process::exit(track1_documents.min(i32::from(u8::MAX)));
}
