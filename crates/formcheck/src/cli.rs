//! Command-line interface definitions for formcheck.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use logging::LogArgs;

/// Command-line interface for the `formcheck` binary.
#[derive(Parser, Debug)]
#[command(
    name = "formcheck",
    about = "Check form configurations and replay edits against them",
    version
)]
pub struct Cli {
    /// Logging controls shared across form tools.
    #[command(flatten)]
    pub log: LogArgs,

    /// What to do.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse and statically validate a configuration; exits non-zero on mistakes.
    Validate(ValidateArgs),
    /// Build a form, apply writes and events in order, and print the result as JSON.
    Simulate(SimulateArgs),
}

/// Arguments for the `validate` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Configuration file (`.json` or `.ron`).
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

/// Arguments for the `simulate` subcommand.
#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Configuration file (`.json` or `.ron`).
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Write a JSON value at a dotted path before events run, e.g. `contacts.0.name="Ada"`.
    #[arg(long = "set", value_name = "PATH=JSON")]
    pub sets: Vec<String>,

    /// Dispatch an event, e.g. `next-page` or `remove-array-item:contacts:1`. Repeatable.
    #[arg(long = "event", value_name = "TYPE[:ARRAY[:ARGS]]")]
    pub events: Vec<String>,

    /// Submit after the events; a refused submit is reported, not fatal.
    #[arg(long)]
    pub submit: bool,

    /// Refuse configurations with authoring mistakes.
    #[arg(long)]
    pub strict: bool,

    /// Mount every page up front.
    #[arg(long)]
    pub mount_all: bool,
}
