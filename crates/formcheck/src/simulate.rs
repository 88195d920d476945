//! Replay writes and events against a form and report the outcome.

use std::fs;

use form_config::{Format, parse_from_str};
use form_engine::{
    Error as EngineError, FieldError, FormEngine, FormOptions, MountState, PageMounting,
};
use form_pages::PageOrchestratorState;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    cli::SimulateArgs,
    error::{Error, Result},
    parse::{parse_assignment, parse_event},
};

/// What `simulate` prints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    /// Final form value.
    value: Value,
    /// Whole-form validity.
    valid: bool,
    /// Failing validators on visible fields.
    errors: Vec<FieldError>,
    /// Page state of a paged form.
    #[serde(skip_serializing_if = "Option::is_none")]
    page: Option<PageOrchestratorState>,
    /// Mount state per page.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    mounts: Vec<MountState>,
    /// Static configuration findings.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    /// Outcome of `--submit`, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    submitted: Option<bool>,
}

/// Run the `simulate` subcommand.
pub fn run(args: &SimulateArgs) -> Result<()> {
    let report = simulate(args)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Build the form, apply `--set` then `--event` arguments, and collect the report.
fn simulate(args: &SimulateArgs) -> Result<Report> {
    let format = Format::from_path(&args.config).unwrap_or(Format::Json);
    let source = fs::read_to_string(&args.config)?;
    let config = parse_from_str(&source, format)?;

    let mut options = FormOptions::new();
    if args.strict {
        options = options.strict();
    }
    if args.mount_all {
        options = options.with_page_mounting(PageMounting::All);
    }
    let engine = FormEngine::new(config, options)?;

    for arg in &args.sets {
        let (path, value) = parse_assignment(arg)?;
        debug!(path = %path, "set");
        engine.set_value(&path, value)?;
    }
    for arg in &args.events {
        let event = parse_event(arg)?;
        let delivered = engine.dispatch(event);
        debug!(event = %arg, delivered, "dispatched");
    }
    let submitted = args.submit.then(|| match engine.submit() {
        Ok(_) => true,
        Err(EngineError::Invalid(errors)) => {
            warn!(errors = errors.len(), "submit refused");
            false
        }
        Err(e) => {
            warn!(error = %e, "submit failed");
            false
        }
    });

    Ok(Report {
        value: engine.value(),
        valid: engine.is_valid(),
        errors: engine.validation_errors(),
        page: engine.page_state(),
        mounts: engine.page_mount_states(),
        warnings: engine.config_warnings().to_vec(),
        submitted,
    })
}
