//! Testing utilities and mock implementations.
//!
//! The mocks stand in for the pieces that touch the outside world (the
//! filesystem and the converter program), so the catalog and its callers can
//! be exercised against an in-memory database.
//!
//! # Example
//!
//! ```rust,ignore
//! use bookshelf_core::testing::{fixtures, MockPlacer};
//!
//! let placer = MockPlacer::new("/library");
//! let library = SqliteLibrary::in_memory(Arc::new(placer.clone()))?;
//! let book = library.import(fixtures::new_book("h1", "Frank Herbert", "Dune"), PlacementMode::Copy)?;
//! ```

mod mock_converter;
mod mock_placer;

pub use mock_converter::{MockConverter, RecordedConversion};
pub use mock_placer::{MockPlacer, RecordedPlacement};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{DateTime, Utc};

    use crate::catalog::{Book, NewBook};

    fn timestamp(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap_or_default()
    }

    /// A new book filed as `<author>/<title>.epub`.
    pub fn new_book(hash: &str, author: &str, title: &str) -> NewBook {
        NewBook {
            author: author.to_string(),
            series: None,
            title: title.to_string(),
            extension: "epub".to_string(),
            tags: vec![],
            original_filename: format!("/inbox/{} - {}.epub", author, title),
            current_filename: format!("{}/{}.epub", author, title),
            file_size: 1024,
            file_mtime: timestamp(1_577_836_800),
            hash: hash.to_string(),
            naming_template: "author-title".to_string(),
            template_override: None,
            source: None,
        }
    }

    /// A stored book, as if loaded from the catalog.
    pub fn book(id: i64, hash: &str, author: &str, title: &str, extension: &str) -> Book {
        let now = timestamp(1_622_548_800);
        Book {
            id,
            created_on: now,
            updated_on: now,
            author: author.to_string(),
            series: None,
            title: title.to_string(),
            extension: extension.to_string(),
            tags: vec![],
            original_filename: format!("/inbox/{} - {}.{}", author, title, extension),
            current_filename: format!("{}/{}.{}", author, title, extension),
            file_size: 1024,
            file_mtime: now,
            hash: hash.to_string(),
            naming_template: "author-title".to_string(),
            template_override: None,
            source: None,
        }
    }
}
