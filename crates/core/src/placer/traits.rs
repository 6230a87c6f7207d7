//! Trait definitions for the placer module.

use std::path::{Path, PathBuf};

use super::error::PlacerError;
use super::types::{PlacedFile, PlacementMode};

/// A placer that puts files at root-relative destinations.
///
/// Placement runs inside the catalog's import transaction, so implementations
/// are synchronous and must finish (or fail) before the commit.
pub trait Placer: Send + Sync {
    /// Returns the name of this placer implementation.
    fn name(&self) -> &str;

    /// The content root every relative destination is resolved against.
    fn root(&self) -> &Path;

    /// Resolves a root-relative path to an absolute one.
    fn resolve(&self, relative: &Path) -> PathBuf {
        self.root().join(relative)
    }

    /// Moves or copies `source` to `destination` (relative to the root),
    /// creating missing parent directories.
    fn place(
        &self,
        source: &Path,
        destination: &Path,
        mode: PlacementMode,
    ) -> Result<PlacedFile, PlacerError>;
}
