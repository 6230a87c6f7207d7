//! Types for the book catalog.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::placer::PlacerError;

/// Separator used when persisting a tag list in a single column.
pub const TAG_DELIMITER: char = '/';

/// Separator between names in the `author` field.
pub const AUTHOR_SEPARATOR: &str = " & ";

/// A book as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Surrogate key, assigned on import.
    pub id: i64,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    /// One or more authors joined with `" & "`.
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    pub title: String,
    /// Lower-case file extension without the dot.
    pub extension: String,
    pub tags: Vec<String>,
    /// Path the file was imported from.
    pub original_filename: String,
    /// Path relative to the content root.
    pub current_filename: String,
    pub file_size: u64,
    pub file_mtime: DateTime<Utc>,
    /// SHA-256 of the file contents (lowercase hex). Unique across the catalog.
    pub hash: String,
    /// Name of the naming pattern that produced `current_filename`.
    pub naming_template: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_override: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Book {
    /// The individual authors.
    pub fn authors(&self) -> Vec<String> {
        split_authors(&self.author)
    }

    /// Replaces the author list.
    pub fn set_authors<S: AsRef<str>>(&mut self, authors: &[S]) {
        self.author = join_authors(authors);
    }

    /// Path relative to the content root, as a `PathBuf`.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(&self.current_filename)
    }

    pub(crate) fn validate(&self) -> Result<(), CatalogError> {
        validate_fields(&self.author, &self.title, &self.extension, &self.tags)
    }
}

/// A book that has not been imported yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBook {
    pub author: String,
    pub series: Option<String>,
    pub title: String,
    pub extension: String,
    pub tags: Vec<String>,
    pub original_filename: String,
    pub current_filename: String,
    pub file_size: u64,
    pub file_mtime: DateTime<Utc>,
    pub hash: String,
    pub naming_template: String,
    pub template_override: Option<String>,
    pub source: Option<String>,
}

impl NewBook {
    /// Checks required fields and tag validity.
    pub fn validate(&self) -> Result<(), CatalogError> {
        validate_fields(&self.author, &self.title, &self.extension, &self.tags)?;
        if self.hash.trim().is_empty() {
            return Err(CatalogError::InvalidBook("hash is empty".to_string()));
        }
        if self.current_filename.trim().is_empty() {
            return Err(CatalogError::InvalidBook(
                "current filename is empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_fields(
    author: &str,
    title: &str,
    extension: &str,
    tags: &[String],
) -> Result<(), CatalogError> {
    if author.trim().is_empty() {
        return Err(CatalogError::InvalidBook("author is empty".to_string()));
    }
    if title.trim().is_empty() {
        return Err(CatalogError::InvalidBook("title is empty".to_string()));
    }
    if extension.trim().is_empty() {
        return Err(CatalogError::InvalidBook("extension is empty".to_string()));
    }
    for tag in tags {
        if tag.is_empty() {
            return Err(CatalogError::InvalidBook("empty tag".to_string()));
        }
        if tag.contains(TAG_DELIMITER) {
            return Err(CatalogError::InvalidBook(format!(
                "tag {:?} contains '{}'",
                tag, TAG_DELIMITER
            )));
        }
    }
    Ok(())
}

/// Serializes tags into their single-column form.
pub fn encode_tags<S: AsRef<str>>(tags: &[S]) -> String {
    let mut encoded = String::new();
    for (i, tag) in tags.iter().enumerate() {
        if i > 0 {
            encoded.push(TAG_DELIMITER);
        }
        encoded.push_str(tag.as_ref());
    }
    encoded
}

/// Parses the single-column tag form. An empty string is an empty list.
pub fn decode_tags(encoded: &str) -> Vec<String> {
    if encoded.is_empty() {
        return Vec::new();
    }
    encoded.split(TAG_DELIMITER).map(str::to_string).collect()
}

/// Splits an author field on `" & "`, trimming each name.
pub fn split_authors(author: &str) -> Vec<String> {
    author
        .split(AUTHOR_SEPARATOR)
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_authors<S: AsRef<str>>(authors: &[S]) -> String {
    authors
        .iter()
        .map(|a| a.as_ref().trim())
        .filter(|a| !a.is_empty())
        .collect::<Vec<_>>()
        .join(AUTHOR_SEPARATOR)
}

/// Errors for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("A duplicate book already exists with id {existing_id}")]
    Duplicate { existing_id: i64 },

    #[error("Book not found: {0}")]
    NotFound(i64),

    #[error("Invalid book: {0}")]
    InvalidBook(String),

    #[error("Library already initialized: {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Library not initialized: {0}")]
    NotInitialized(PathBuf),

    #[error("Database error while {context}: {source}")]
    Database {
        context: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Moving or copying book: {0}")]
    Placement(#[from] PlacerError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CatalogError {
    /// Builds a `map_err` adapter that tags a database error with the failing step.
    pub(crate) fn db(context: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::Database { context, source }
    }

    /// The conflicting id when this is a duplicate error.
    pub fn duplicate_id(&self) -> Option<i64> {
        match self {
            Self::Duplicate { existing_id } => Some(*existing_id),
            _ => None,
        }
    }
}
