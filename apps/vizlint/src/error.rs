//! Process-level failures.
//!
//! These stop a run before a report can be produced and map to exit code 2.
//! Problems found *in* pages or data files are findings, never errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LintError {
    #[error("pages directory not found: {path}")]
    PagesDirNotFound { path: PathBuf },

    #[error("data directory not found: {path}")]
    DataDirNotFound { path: PathBuf },

    #[error("failed to read page {path}: {source}")]
    PageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file exists but cannot be read or deserialized.
    #[error("invalid config {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// A pattern assembled from configured rule tables failed to compile.
    #[error("invalid pattern for {rule}: {source}")]
    Pattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid page glob {pattern}: {message}")]
    Glob { pattern: String, message: String },
}

pub type Result<T> = std::result::Result<T, LintError>;
