use std::result;

use thiserror::Error;

/// Errors raised while evaluating a condition or derivation expression.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    /// A `custom` condition or validator names a function nobody registered.
    #[error("unknown custom function '{0}'")]
    UnknownFunction(String),

    /// A `matches` operand or pattern validator is not a valid regular expression.
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern {
        /// Pattern source.
        pattern: String,
        /// Compiler message.
        message: String,
    },

    /// A free-form expression failed to compile or run.
    #[error("expression `{expression}` failed: {message}")]
    Script {
        /// Expression source.
        expression: String,
        /// Engine message.
        message: String,
    },

    /// Form data could not be moved into or out of the expression engine.
    #[error("value conversion failed: {0}")]
    Conversion(String),
}

/// Result alias for evaluation.
pub type Result<T> = result::Result<T, EvalError>;
