//! Hard failures of the codemod. Recoverable per-call and per-scope problems
//! are reported as [`Diagnostic`]s instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostics::Diagnostic;

#[derive(Error, Debug)]
pub enum CodemodError {
    #[error("{0}")]
    Parse(Diagnostic),

    #[error("failed to print rewritten module: {0}")]
    Emit(#[source] std::io::Error),

    #[error("rewritten module is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl CodemodError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The diagnostic carried by a parse failure, if any.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Self::Parse(d) => Some(d),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CodemodError>;
