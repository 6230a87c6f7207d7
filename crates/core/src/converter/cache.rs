//! Cache of converted books, keyed by content hash and target extension.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::error::ConverterError;
use super::traits::Converter;
use crate::catalog::Book;

/// Directory name for converted files, next to the library database.
pub const CACHE_DIR_NAME: &str = "cache";

/// Converts books on demand and keeps the results as `<hash>.<ext>`.
pub struct ConversionCache<C: Converter> {
    dir: PathBuf,
    target_extension: String,
    converter: C,
}

impl<C: Converter> ConversionCache<C> {
    pub fn new(dir: impl Into<PathBuf>, target_extension: impl Into<String>, converter: C) -> Self {
        Self {
            dir: dir.into(),
            target_extension: target_extension.into(),
            converter,
        }
    }

    /// A cache in the `cache/` directory beside the library database file.
    pub fn for_library(
        library_path: &Path,
        target_extension: impl Into<String>,
        converter: C,
    ) -> Self {
        let parent = library_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::new(parent.join(CACHE_DIR_NAME), target_extension, converter)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the converted copy of `book` lives once cached.
    pub fn cached_path(&self, book: &Book) -> PathBuf {
        self.dir
            .join(format!("{}.{}", book.hash, self.target_extension))
    }

    /// Returns the cached conversion of `book`, running the converter on a miss.
    ///
    /// The converter writes to a temporary name that is renamed into place on
    /// success, so a failed run never occupies the cache key. Leftovers from a
    /// failed run are not cleaned up.
    pub async fn convert_to_cache(
        &self,
        book: &Book,
        books_root: &Path,
    ) -> Result<PathBuf, ConverterError> {
        let cached = self.cached_path(book);
        if cached.exists() {
            debug!("Reusing cached conversion {}", cached.display());
            return Ok(cached);
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ConverterError::CacheDirectoryFailed {
                path: self.dir.clone(),
                source: e,
            })?;

        let source = books_root.join(book.relative_path());
        let partial = self
            .dir
            .join(format!("{}.partial.{}", book.hash, self.target_extension));

        info!(
            "Converting book {} ({}) with {}",
            book.id,
            source.display(),
            self.converter.name()
        );
        if let Err(e) = self.converter.convert(&source, &partial).await {
            warn!("Conversion of book {} failed: {}", book.id, e);
            return Err(e);
        }

        tokio::fs::rename(&partial, &cached).await?;
        info!("Cached conversion of book {} at {}", book.id, cached.display());
        Ok(cached)
    }
}
