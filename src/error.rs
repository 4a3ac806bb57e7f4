//! Error types for the simscan library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for clone detection operations.
///
/// Per-file problems (unsupported language, unreadable file) are handled
/// by skipping the file rather than failing the analysis, so the only
/// fallible surface is file discovery: a root that does not exist, or a
/// walk the `ignore` crate cannot set up.
#[derive(Error, Debug)]
pub enum SimscanError {
    #[error("path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("file walk error: {0}")]
    Walk(#[from] ignore::Error),
}

pub type Result<T> = std::result::Result<T, SimscanError>;
