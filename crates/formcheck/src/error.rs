//! Error handling for the formcheck crate.

use std::{io, result};

use thiserror::Error;

/// Convenient result type for formcheck operations.
pub type Result<T> = result::Result<T, Error>;

/// Errors that can occur while checking or simulating a form.
#[derive(Debug, Error)]
pub enum Error {
    /// Wrapper for standard I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Loading, parsing or validating the configuration failed.
    #[error("{}", .0.pretty())]
    Config(#[from] form_config::Error),
    /// The engine refused the configuration or an operation.
    #[error("Form engine error: {0}")]
    Engine(#[from] form_engine::Error),
    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// A `--event` argument could not be understood.
    #[error("Bad event '{spec}': {reason}")]
    EventSpec {
        /// The argument as given.
        spec: String,
        /// What was wrong with it.
        reason: String,
    },
    /// A `--set` argument could not be understood.
    #[error("Bad assignment '{0}'; expected PATH=JSON")]
    Assignment(String),
}

impl Error {
    /// Helper to build an event parse error.
    pub fn event<S: Into<String>, R: Into<String>>(spec: S, reason: R) -> Self {
        Self::EventSpec {
            spec: spec.into(),
            reason: reason.into(),
        }
    }
}
