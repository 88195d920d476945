#![warn(missing_docs)]

//! Entry point for the `formcheck` binary.

mod cli;
mod error;
mod parse;
mod simulate;

use std::process;

use clap::Parser;
use tracing::{error, info};

use crate::{
    cli::{Cli, Commands, ValidateArgs},
    error::Result,
};

fn main() {
    if let Err(err) = run() {
        error!("{err}");
        eprintln!("error: {err}");
        process::exit(1);
    }
}

/// Parse CLI arguments, install logging, and dispatch to the chosen subcommand.
fn run() -> Result<()> {
    let Cli { log, command } = Cli::parse();
    let spec = logging::init(&log);
    info!(filter = %spec, "logging configured");

    match command {
        Commands::Validate(args) => validate(&args),
        Commands::Simulate(args) => simulate::run(&args),
    }
}

/// Load and statically validate a configuration, reporting a short summary.
fn validate(args: &ValidateArgs) -> Result<()> {
    let config = form_config::load_from_path(&args.config)?;
    let pages = config.pages().count();
    println!(
        "{}: ok ({} root field(s), {})",
        args.config.display(),
        config.fields.len(),
        if pages > 0 {
            format!("{pages} page(s)")
        } else {
            "single page".to_string()
        }
    );
    Ok(())
}
