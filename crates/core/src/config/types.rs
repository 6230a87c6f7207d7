use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::converter::ConverterConfig;
use crate::placer::PlacerConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub library: LibraryConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub placer: PlacerConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
}

/// Where the catalog and the book files live
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryConfig {
    /// SQLite database file.
    pub path: PathBuf,
    /// Content root that book paths are relative to.
    pub root: PathBuf,
    /// Turn off synchronous writes. A power loss may lose the last commits.
    #[serde(default = "default_fast_writes")]
    pub fast_writes: bool,
}

fn default_fast_writes() -> bool {
    true
}

/// Import configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImportConfig {
    /// Move inbound files instead of copying them.
    #[serde(default)]
    pub move_files: bool,
    #[serde(default = "default_output_template")]
    pub output_template: String,
    /// Provenance note stored on every imported book.
    #[serde(default)]
    pub source: Option<String>,
    /// Filename patterns, tried in order.
    #[serde(default = "default_patterns")]
    pub patterns: Vec<PatternConfig>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            move_files: false,
            output_template: default_output_template(),
            source: None,
            patterns: default_patterns(),
        }
    }
}

fn default_output_template() -> String {
    "{author}/{title}.{ext}".to_string()
}

fn default_patterns() -> Vec<PatternConfig> {
    vec![PatternConfig {
        name: "author-title".to_string(),
        pattern: r"^(?P<author>.+?) - (?P<title>.+)$".to_string(),
    }]
}

/// A named regular expression matched against the file stem
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PatternConfig {
    pub name: String,
    pub pattern: String,
}
