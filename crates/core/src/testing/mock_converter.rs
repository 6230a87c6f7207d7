//! Mock converter for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::converter::{Converter, ConverterError};

/// A recorded conversion job for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedConversion {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Whether the conversion succeeded.
    pub success: bool,
}

/// Mock implementation of the Converter trait.
///
/// Successful conversions write a small placeholder file at the output path
/// so callers that rename or read the result keep working. The input is not
/// read.
#[derive(Debug, Clone, Default)]
pub struct MockConverter {
    conversions: Arc<Mutex<Vec<RecordedConversion>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<Mutex<Option<ConverterError>>>,
}

impl MockConverter {
    /// Create a new mock converter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded conversions, failed ones included.
    pub fn recorded_jobs(&self) -> Vec<RecordedConversion> {
        self.conversions.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Configure the next operation to fail with the given error.
    pub fn fail_next(&self, error: ConverterError) {
        *self.next_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(error);
    }

    fn take_error(&self) -> Option<ConverterError> {
        self.next_error.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    fn record(&self, input: &Path, output: &Path, success: bool) {
        self.conversions.lock().unwrap_or_else(PoisonError::into_inner).push(RecordedConversion {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            success,
        });
    }
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<(), ConverterError> {
        if let Some(err) = self.take_error() {
            self.record(input, output, false);
            return Err(err);
        }

        tokio::fs::write(output, format!("converted from {}", input.display())).await?;
        self.record(input, output, true);
        Ok(())
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        match self.take_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
