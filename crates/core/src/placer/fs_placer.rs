//! File system placer implementation.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};

use super::config::PlacerConfig;
use super::error::PlacerError;
use super::traits::Placer;
use super::types::{PlacedFile, PlacementMode, PlacementOutcome};

/// File system based placer implementation.
pub struct FsPlacer {
    root: PathBuf,
    config: PlacerConfig,
    /// Deletes the source after a copy-based move.
    remove_source: fn(&Path) -> io::Result<()>,
}

impl FsPlacer {
    /// Creates a new file system placer rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, config: PlacerConfig) -> Self {
        Self {
            root: root.into(),
            config,
            remove_source: |path| fs::remove_file(path),
        }
    }

    /// Creates a placer with default configuration.
    pub fn with_defaults(root: impl Into<PathBuf>) -> Self {
        Self::new(root, PlacerConfig::default())
    }

    /// Joins a relative destination onto the root, refusing paths that could leave it.
    fn destination_for(&self, relative: &Path) -> Result<PathBuf, PlacerError> {
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes || relative.as_os_str().is_empty() {
            return Err(PlacerError::OutsideRoot {
                path: relative.to_path_buf(),
            });
        }
        Ok(self.root.join(relative))
    }

    /// Attempts to move a file atomically (rename).
    ///
    /// Any rename failure, cross-device or otherwise, reports `false` so the
    /// caller falls back to copying.
    fn try_atomic_move(source: &Path, destination: &Path) -> bool {
        match fs::rename(source, destination) {
            Ok(()) => true,
            Err(e) => {
                debug!(
                    "Rename {} -> {} failed, falling back to copy: {}",
                    source.display(),
                    destination.display(),
                    e
                );
                false
            }
        }
    }

    /// Copies a file and stamps the copy with the source's modification time.
    fn copy_file(&self, source: &Path, destination: &Path) -> Result<u64, PlacerError> {
        let copy_failed =
            |e: io::Error| PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e);

        let source_file = File::open(source).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                PlacerError::SourceNotFound {
                    path: source.to_path_buf(),
                }
            } else {
                PlacerError::Io(e)
            }
        })?;
        let modified = source_file.metadata()?.modified()?;

        let dest_file = File::create(destination).map_err(copy_failed)?;

        let mut reader = BufReader::with_capacity(self.config.buffer_size, source_file);
        let mut writer = BufWriter::with_capacity(self.config.buffer_size, dest_file);

        let written = io::copy(&mut reader, &mut writer)
            .and_then(|n| writer.into_inner().map_err(|e| e.into_error()).map(|f| (n, f)))
            .and_then(|(n, f)| f.set_modified(modified).map(|()| n));

        match written {
            Ok(n) => Ok(n),
            Err(e) => {
                // Don't leave a truncated file behind at the destination.
                let _ = fs::remove_file(destination);
                Err(copy_failed(e))
            }
        }
    }

    /// Creates parent directories for a path.
    fn ensure_parent_dirs(path: &Path) -> Result<(), PlacerError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| PlacerError::DirectoryCreationFailed {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }
        Ok(())
    }
}

impl Placer for FsPlacer {
    fn name(&self) -> &str {
        "fs"
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
        if !source.exists() {
            return Err(PlacerError::SourceNotFound {
                path: source.to_path_buf(),
            });
        }

        let destination = self.destination_for(destination)?;
        if destination.exists() && !self.config.overwrite {
            return Err(PlacerError::DestinationExists { path: destination });
        }

        Self::ensure_parent_dirs(&destination)?;

        let (size_bytes, outcome) = match mode {
            PlacementMode::Copy => {
                let size = self.copy_file(source, &destination)?;
                info!("Copied {} to {}", source.display(), destination.display());
                (size, PlacementOutcome::Copied)
            }
            PlacementMode::Move
                if self.config.prefer_atomic_moves
                    && Self::try_atomic_move(source, &destination) =>
            {
                let size = fs::metadata(&destination)?.len();
                info!("Moved {} to {}", source.display(), destination.display());
                (size, PlacementOutcome::Renamed)
            }
            PlacementMode::Move => {
                let size = self.copy_file(source, &destination)?;
                // The copy is authoritative from here on; a stale source is only logged.
                let source_removed = match (self.remove_source)(source) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Error removing {}: {}", source.display(), e);
                        false
                    }
                };
                info!(
                    "Moved {} to {} (copy/delete)",
                    source.display(),
                    destination.display()
                );
                (size, PlacementOutcome::MovedByCopy { source_removed })
            }
        };

        Ok(PlacedFile {
            source: source.to_path_buf(),
            destination,
            size_bytes,
            outcome,
        })
    }
}

/// Finds a free name for `path` by appending ` (N)` before the extension.
///
/// Probing is advisory: another process can claim the returned name before
/// the caller writes to it.
pub fn unique_name(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut n = 1u32;
    loop {
        let candidate = path.with_file_name(format!("{} ({}){}", stem, n, ext));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn write_with_mtime(path: &Path, content: &str, mtime: SystemTime) {
        fs::write(path, content).unwrap();
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(mtime).unwrap();
    }

    #[test]
    fn test_copy_creates_parents_and_keeps_source() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("inbox.epub");
        fs::write(&source, "book bytes").unwrap();

        let placer = FsPlacer::with_defaults(temp.path().join("library"));
        let placed = placer
            .place(&source, Path::new("Frank Herbert/Dune.epub"), PlacementMode::Copy)
            .unwrap();

        assert_eq!(
            placed.destination,
            temp.path().join("library/Frank Herbert/Dune.epub")
        );
        assert_eq!(placed.size_bytes, 10);
        assert_eq!(placed.outcome, PlacementOutcome::Copied);
        assert!(source.exists());
        assert_eq!(fs::read_to_string(&placed.destination).unwrap(), "book bytes");
    }

    #[test]
    fn test_copy_preserves_mtime() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("old.epub");
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_500_000_000);
        write_with_mtime(&source, "old", mtime);

        let placer = FsPlacer::with_defaults(temp.path().join("library"));
        let placed = placer
            .place(&source, Path::new("old.epub"), PlacementMode::Copy)
            .unwrap();

        let copied = fs::metadata(&placed.destination).unwrap().modified().unwrap();
        assert_eq!(copied, mtime);
    }

    #[test]
    fn test_move_renames() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("inbox.epub");
        fs::write(&source, "content").unwrap();

        let placer = FsPlacer::with_defaults(temp.path().join("library"));
        let placed = placer
            .place(&source, Path::new("a/b.epub"), PlacementMode::Move)
            .unwrap();

        assert_eq!(placed.outcome, PlacementOutcome::Renamed);
        assert!(!source.exists());
        assert!(placed.destination.exists());
    }

    #[test]
    fn test_move_by_copy_removes_source() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("inbox.epub");
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_400_000_000);
        write_with_mtime(&source, "content", mtime);

        let placer = FsPlacer::new(
            temp.path().join("library"),
            PlacerConfig::default().with_atomic_moves(false),
        );
        let placed = placer
            .place(&source, Path::new("b.epub"), PlacementMode::Move)
            .unwrap();

        assert_eq!(
            placed.outcome,
            PlacementOutcome::MovedByCopy {
                source_removed: true
            }
        );
        assert!(!source.exists());
        assert_eq!(
            fs::metadata(&placed.destination).unwrap().modified().unwrap(),
            mtime
        );
    }

    #[test]
    fn test_move_by_copy_survives_failed_removal() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("inbox.epub");
        fs::write(&source, "content").unwrap();

        let mut placer = FsPlacer::new(
            temp.path().join("library"),
            PlacerConfig::default().with_atomic_moves(false),
        );
        placer.remove_source =
            |_| Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only inbox"));

        let placed = placer
            .place(&source, Path::new("b.epub"), PlacementMode::Move)
            .unwrap();

        assert_eq!(
            placed.outcome,
            PlacementOutcome::MovedByCopy {
                source_removed: false
            }
        );
        assert!(source.exists());
        assert_eq!(fs::read_to_string(&placed.destination).unwrap(), "content");
        assert_eq!(placed.size_bytes, 7);
    }

    #[test]
    fn test_destination_exists_error() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source.epub");
        fs::write(&source, "new").unwrap();
        fs::create_dir_all(temp.path().join("library")).unwrap();
        fs::write(temp.path().join("library/taken.epub"), "existing").unwrap();

        let placer = FsPlacer::with_defaults(temp.path().join("library"));
        let result = placer.place(&source, Path::new("taken.epub"), PlacementMode::Move);

        assert!(matches!(result, Err(PlacerError::DestinationExists { .. })));
        assert!(source.exists());
        assert_eq!(
            fs::read_to_string(temp.path().join("library/taken.epub")).unwrap(),
            "existing"
        );
    }

    #[test]
    fn test_overwrite_allowed() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source.epub");
        fs::write(&source, "new").unwrap();
        fs::write(temp.path().join("taken.epub"), "old").unwrap();

        let placer = FsPlacer::new(temp.path(), PlacerConfig::default().with_overwrite(true));
        placer
            .place(&source, Path::new("taken.epub"), PlacementMode::Copy)
            .unwrap();

        assert_eq!(
            fs::read_to_string(temp.path().join("taken.epub")).unwrap(),
            "new"
        );
    }

    #[test]
    fn test_missing_source() {
        let temp = TempDir::new().unwrap();
        let placer = FsPlacer::with_defaults(temp.path());
        let result = placer.place(
            &temp.path().join("nope.epub"),
            Path::new("nope.epub"),
            PlacementMode::Copy,
        );
        assert!(matches!(result, Err(PlacerError::SourceNotFound { .. })));
    }

    #[test]
    fn test_rejects_escaping_destination() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source.epub");
        fs::write(&source, "x").unwrap();

        let placer = FsPlacer::with_defaults(temp.path().join("library"));
        for bad in ["../outside.epub", "/etc/outside.epub", ""] {
            let result = placer.place(&source, Path::new(bad), PlacementMode::Copy);
            assert!(
                matches!(result, Err(PlacerError::OutsideRoot { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_unique_name_free_path_unchanged() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("foo.epub");
        assert_eq!(unique_name(&path), path);
    }

    #[test]
    fn test_unique_name_increments() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("foo.epub");
        fs::write(&path, "").unwrap();
        assert_eq!(unique_name(&path), temp.path().join("foo (1).epub"));

        fs::write(temp.path().join("foo (1).epub"), "").unwrap();
        assert_eq!(unique_name(&path), temp.path().join("foo (2).epub"));
    }

    #[test]
    fn test_unique_name_without_extension() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("README");
        fs::write(&path, "").unwrap();
        assert_eq!(unique_name(&path), temp.path().join("README (1)"));
    }
}
