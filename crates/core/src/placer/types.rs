//! Types for the placer module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Whether the inbound file is moved or copied into the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlacementMode {
    /// Leave the source in place and write a copy.
    #[default]
    Copy,
    /// Rename when possible, otherwise copy and delete the source.
    Move,
}

impl PlacementMode {
    pub fn from_move_flag(move_files: bool) -> Self {
        if move_files {
            Self::Move
        } else {
            Self::Copy
        }
    }
}

/// How a file ended up at its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementOutcome {
    /// Renamed within the same filesystem.
    Renamed,
    /// Copied, source untouched.
    Copied,
    /// Move fell back to copy; `source_removed` is false when the stale source could not be deleted.
    MovedByCopy { source_removed: bool },
}

/// Information about a placed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedFile {
    /// Where the file came from.
    pub source: PathBuf,
    /// Absolute destination path.
    pub destination: PathBuf,
    /// File size in bytes.
    pub size_bytes: u64,
    pub outcome: PlacementOutcome,
}
