//! Converter backed by an external program.

use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::debug;

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::traits::Converter;

/// Runs `<program> <input> <output>` and waits for it to exit.
///
/// There is no timeout; a hung converter blocks the caller.
pub struct ExternalConverter {
    config: ConverterConfig,
}

impl ExternalConverter {
    /// Creates a new converter with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Creates a converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    fn spawn_error(&self, e: io::Error) -> ConverterError {
        if e.kind() == io::ErrorKind::NotFound {
            ConverterError::ProgramNotFound {
                program: self.config.program.clone(),
            }
        } else {
            ConverterError::SpawnFailed {
                program: self.config.program.clone(),
                source: e,
            }
        }
    }
}

#[async_trait]
impl Converter for ExternalConverter {
    fn name(&self) -> &str {
        "external"
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<(), ConverterError> {
        if !input.exists() {
            return Err(ConverterError::InputNotFound {
                path: input.to_path_buf(),
            });
        }

        let start = Instant::now();
        let result = Command::new(&self.config.program)
            .arg(input)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !result.status.success() {
            return Err(ConverterError::conversion_failed(
                result.status.code(),
                &result.stderr,
            ));
        }

        debug!(
            "Converted {} to {} in {} ms",
            input.display(),
            output.display(),
            start.elapsed().as_millis()
        );
        Ok(())
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        // Only checks that the program can be started.
        Command::new(&self.config.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| self.spawn_error(e))?;
        Ok(())
    }
}
