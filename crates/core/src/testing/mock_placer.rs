//! Mock placer for testing.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::placer::{PlacedFile, PlacementMode, PlacementOutcome, Placer, PlacerError};

/// A recorded placement for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedPlacement {
    pub source: PathBuf,
    /// Destination exactly as passed, relative to the root.
    pub destination: PathBuf,
    pub mode: PlacementMode,
    /// Whether the placement succeeded.
    pub success: bool,
}

/// Mock implementation of the Placer trait.
///
/// Never touches the filesystem. Clones share state, so a test can keep one
/// handle for assertions while the catalog owns another.
///
/// # Example
///
/// ```rust,ignore
/// use bookshelf_core::testing::MockPlacer;
///
/// let placer = MockPlacer::new("/library");
/// let library = SqliteLibrary::in_memory(Arc::new(placer.clone()))?;
///
/// library.import(book, PlacementMode::Copy)?;
///
/// let placements = placer.recorded_placements();
/// assert_eq!(placements.len(), 1);
/// assert!(placements[0].success);
/// ```
#[derive(Debug, Clone)]
pub struct MockPlacer {
    root: PathBuf,
    placements: Arc<Mutex<Vec<RecordedPlacement>>>,
    /// If set, the next placement will fail with this error.
    next_error: Arc<Mutex<Option<PlacerError>>>,
}

impl MockPlacer {
    /// Create a new mock placer reporting `root` as its content root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            placements: Arc::new(Mutex::new(Vec::new())),
            next_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Get all recorded placements, failed ones included.
    pub fn recorded_placements(&self) -> Vec<RecordedPlacement> {
        self.placements.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Configure the next placement to fail with the given error.
    pub fn fail_next(&self, error: PlacerError) {
        *self.next_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(error);
    }

    fn record(&self, source: &Path, destination: &Path, mode: PlacementMode, success: bool) {
        self.placements.lock().unwrap_or_else(PoisonError::into_inner).push(RecordedPlacement {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            mode,
            success,
        });
    }
}

impl Placer for MockPlacer {
    fn name(&self) -> &str {
        "mock"
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn place(
        &self,
        source: &Path,
        destination: &Path,
        mode: PlacementMode,
    ) -> Result<PlacedFile, PlacerError> {
        let pending = self.next_error.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(err) = pending {
            self.record(source, destination, mode, false);
            return Err(err);
        }

        self.record(source, destination, mode, true);
        Ok(PlacedFile {
            source: source.to_path_buf(),
            destination: self.resolve(destination),
            size_bytes: 0,
            outcome: PlacementOutcome::Copied,
        })
    }
}
