use anyhow::Result;
use clap::{Parser, Subcommand};
use std::ffi::OsString;
use tracing::Level;

mod args;
mod config;
mod connect;
mod env;
mod records;
mod ui;
mod utils;

use crate::args::{BaseArgs, CLIArgs};

#[derive(Debug, Parser)]
#[command(name = "rowport", about = "Query, export and copy hosted table records", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Read, export and copy table or view records
    Records(CLIArgs<records::RecordsArgs>),
}

fn init_logging(base: &BaseArgs) {
    let level = if base.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let argv: Vec<OsString> = std::env::args_os().collect();
    env::bootstrap_from_args(&argv)?;
    let cli = Cli::parse_from(argv);

    match cli.command {
        Commands::Records(cmd) => {
            init_logging(&cmd.base);
            records::run(cmd.base, cmd.args).await?
        }
    }

    Ok(())
}
