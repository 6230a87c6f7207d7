//! Configuration for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the external converter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Program invoked as `<program> <input> <output>`.
    #[serde(default = "default_program")]
    pub program: PathBuf,

    /// Extension of converted files, without the dot.
    #[serde(default = "default_target_extension")]
    pub target_extension: String,
}

fn default_program() -> PathBuf {
    PathBuf::from("ebook-convert")
}

fn default_target_extension() -> String {
    "epub".to_string()
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            target_extension: default_target_extension(),
        }
    }
}

impl ConverterConfig {
    /// Creates a config for a custom converter program.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Sets the target extension.
    pub fn with_target_extension(mut self, extension: impl Into<String>) -> Self {
        self.target_extension = extension.into();
        self
    }
}
