use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a navigation request was refused.
///
/// These are expected interaction outcomes, returned rather than raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    /// `next` on the last page.
    #[error("Already on the last page")]
    AlreadyOnLastPage,
    /// `previous` on the first page.
    #[error("Already on the first page")]
    AlreadyOnFirstPage,
    /// Navigation is switched off.
    #[error("Navigation is currently disabled")]
    NavigationDisabled,
    /// Target outside `0..total`.
    #[error("Invalid page index {index}. Valid range is 0 to {last}")]
    InvalidPageIndex {
        /// Requested index.
        index: usize,
        /// Highest valid index.
        last: usize,
    },
    /// The form has no pages at all.
    #[error("The form has no pages")]
    NoPages,
}

/// Serialisable outcome of a navigation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationResult {
    /// True when the request was accepted (including no-op requests).
    pub success: bool,
    /// Refusal message when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Any navigation outcome whose refusal renders as a message, including the
/// wrappers of callers that add their own refusals.
impl<E: fmt::Display> From<Result<(), E>> for NavigationResult {
    fn from(r: Result<(), E>) -> Self {
        match r {
            Ok(()) => Self {
                success: true,
                error: None,
            },
            Err(e) => Self {
                success: false,
                error: Some(e.to_string()),
            },
        }
    }
}
