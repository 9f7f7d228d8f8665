//! lref: seed, encode and decode line-deduplicated files

use anyhow::Result;
use clap::Parser;
use lineref_cli::cli::Cli;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    tracing::info!("lref {} starting", env!("CARGO_PKG_VERSION"));
    cli.run()
}
