//! Inkvault journal binary.
//!
//! # Usage
//!
//! ```bash
//! export INKVAULT_PASSWORD='correct horse battery staple'
//! ACCOUNT=0x00000000000000000000000000000000000000a1
//!
//! inkvault --as $ACCOUNT add "Went for a walk."
//! inkvault --as $ACCOUNT list
//! inkvault --as $ACCOUNT edit 0 --expected-version 1 "Went for a long walk."
//! inkvault --as $ACCOUNT grant 0 0x00000000000000000000000000000000000000b0
//! inkvault --as $ACCOUNT delegates 0
//! inkvault --as $ACCOUNT show 0 --raw
//! inkvault --as $ACCOUNT events --from 0
//! ```

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;

use cli::Args;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    commands::run(args).await?;

    Ok(())
}
