//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during conversion.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// Converter program not found.
    #[error("Converter not found: {program}")]
    ProgramNotFound { program: PathBuf },

    /// Converter could not be started.
    #[error("Failed to start converter {program}")]
    SpawnFailed {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Converter exited unsuccessfully.
    #[error("Conversion failed ({}): {stderr}", exit_description(.status))]
    ConversionFailed { status: Option<i32>, stderr: String },

    /// Cache directory could not be created.
    #[error("Failed to create cache directory: {path}")]
    CacheDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error during conversion.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_description(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl ConverterError {
    /// Creates a new conversion failed error from captured stderr.
    pub fn conversion_failed(status: Option<i32>, stderr: &[u8]) -> Self {
        Self::ConversionFailed {
            status,
            stderr: String::from_utf8_lossy(stderr).trim().to_string(),
        }
    }
}
