use std::result::Result as StdResult;

use form_pages::NavigationError;
use thiserror::Error;

use crate::FieldError;

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Errors surfaced by [`crate::FormEngine`] operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration failed to load or validate.
    #[error(transparent)]
    Config(#[from] form_config::Error),

    /// No array field is registered under this key or path.
    #[error("Unknown array '{0}'")]
    UnknownArray(String),

    /// An array operation addressed a position that does not exist.
    #[error("Index {index} is out of range for array '{key}' with {len} items")]
    IndexOutOfRange {
        /// Array path.
        key: String,
        /// Requested position.
        index: usize,
        /// Item count at the time of the request.
        len: usize,
    },

    /// A navigation request was refused.
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    /// Page navigation on a form without pages.
    #[error("The form is not paged")]
    NotPaged,

    /// A write addressed a path that crosses a scalar or skips array positions.
    #[error("Cannot write to path '{0}'")]
    InvalidPath(String),

    /// Submission was refused because fields failed validation.
    #[error("Form is invalid: {} field error(s)", .0.len())]
    Invalid(Vec<FieldError>),
}
