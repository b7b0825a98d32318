//! Nabu studio: a terminal host for Nabu microapps.
//!
//! ```text
//! nabu-studio parse demo/shop
//! nabu-studio resolve '*if(@{shop.count} > 0)*then(items)*else(empty)' --var shop.count=3
//! nabu-studio run demo/shop --script demo/shop/script.json --var shop.user=Ada
//! ```

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use nabu_engine::logging::{LoggingConfig, init_logging};

mod cli;
mod commands;

use crate::cli::{Cli, Command};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::default();
    if let Some(filter) = &cli.log_filter {
        logging = logging.with_filter(filter.clone());
    }
    init_logging(logging);

    match run(cli.command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<bool> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match command {
        Command::Parse(args) => commands::run_parse(&args, &mut out),
        Command::Resolve(args) => commands::run_resolve(&args, &mut out).map(|()| true),
        Command::Run(args) => commands::run_session(&args, &mut out).await.map(|()| true),
    }
}
