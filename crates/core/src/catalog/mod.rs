//! Book catalog - the persistent set of books plus their full-text index.
//!
//! Every mutating operation runs in one database transaction. Import also
//! places the book file under the content root before committing, so a
//! record is never committed for a file that failed to land.

mod sqlite;
mod types;

pub use sqlite::SqliteLibrary;
pub use types::*;

use crate::placer::PlacementMode;

/// Trait for book catalog storage.
pub trait BookCatalog: Send + Sync {
    /// Import a book and place its file.
    ///
    /// Fails with [`CatalogError::Duplicate`] without touching the filesystem
    /// when a book with the same content hash is already cataloged.
    fn import(&self, book: NewBook, mode: PlacementMode) -> Result<Book, CatalogError>;

    /// Full-text search. Terms may be restricted with `field:term`, where field is
    /// one of author, series, title, extension, tags, filename, source.
    ///
    /// Results come back in relevance order.
    fn search(&self, query: &str) -> Result<Vec<Book>, CatalogError>;

    /// Fetch books by id, in the order requested. Unknown ids are skipped.
    fn get_books_by_id(&self, ids: &[i64]) -> Result<Vec<Book>, CatalogError>;

    /// Persist edits to an existing book and re-index it.
    ///
    /// With `allow_merge_prompt`, a different book with the same author, title
    /// and series is reported as [`CatalogError::Duplicate`] so the caller can
    /// offer a merge.
    fn update(&self, book: &Book, allow_merge_prompt: bool) -> Result<(), CatalogError>;

    /// Merge books into the first id. Merged ids keep resolving to the survivor.
    fn merge_books(&self, ids: &[i64]) -> Result<(), CatalogError>;

    /// Books whose file is not present under the content root.
    fn missing_files(&self) -> Result<Vec<Book>, CatalogError>;
}
