//! Error types for import preparation.

use std::path::PathBuf;
use thiserror::Error;

use crate::placer::PlacerError;

#[derive(Debug, Error)]
pub enum ImportError {
    /// No configured pattern matched the file stem.
    #[error("No naming pattern matched: {stem}")]
    NoPatternMatched { stem: String },

    /// The file has no extension to file it under.
    #[error("File has no extension: {path}")]
    MissingExtension { path: PathBuf },

    /// A configured pattern could not be compiled.
    #[error("Invalid naming pattern {name}: {reason}")]
    InvalidPattern { name: String, reason: String },

    /// Destination could not be resolved under the content root.
    #[error("Placement error: {0}")]
    Placement(#[from] PlacerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
