//! Parse and load form configurations from JSON or RON.

use std::{ffi::OsStr, fs, path::Path};

use tracing::debug;

use crate::{Error, FormConfig, error::excerpt_at};

/// Source formats accepted by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// JSON documents, the canonical interchange format.
    Json,
    /// RON documents, convenient for hand-written fixtures.
    Ron,
}

impl Format {
    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(OsStr::to_str) {
            Some("json") => Some(Self::Json),
            Some("ron") => Some(Self::Ron),
            _ => None,
        }
    }
}

/// Parse `source` without running static validation.
pub fn parse_from_str(source: &str, format: Format) -> Result<FormConfig, Error> {
    match format {
        Format::Json => serde_json::from_str(source).map_err(|e| {
            let (line, col) = (e.line().max(1), e.column().max(1));
            Error::Parse {
                path: None,
                line,
                col,
                message: e.to_string(),
                excerpt: excerpt_at(source, line, col),
            }
        }),
        Format::Ron => ron::from_str(source).map_err(|e| {
            let (line, col) = (e.span.start.line.max(1), e.span.start.col.max(1));
            Error::Parse {
                path: None,
                line,
                col,
                message: e.code.to_string(),
                excerpt: excerpt_at(source, line, col),
            }
        }),
    }
}

/// Parse and statically validate `source`.
pub fn load_from_str(source: &str, format: Format) -> Result<FormConfig, Error> {
    parse_from_str(source, format)?.validated()
}

/// Load and validate a configuration file; the format follows the extension.
pub fn load_from_path(path: &Path) -> Result<FormConfig, Error> {
    let Some(format) = Format::from_path(path) else {
        return Err(Error::Read {
            path: Some(path.to_path_buf()),
            message: "Unsupported config format (expected a .json or .ron file)".to_string(),
        });
    };
    let source = fs::read_to_string(path).map_err(|e| Error::Read {
        path: Some(path.to_path_buf()),
        message: e.to_string(),
    })?;
    debug!(path = %path.display(), ?format, bytes = source.len(), "loading form config");
    load_from_str(&source, format).map_err(|e| e.with_path(path))
}
