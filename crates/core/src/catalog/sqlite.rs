//! SQLite-backed book catalog implementation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension};
use tracing::{debug, info, warn};

use super::types::{decode_tags, encode_tags, Book, CatalogError, NewBook};
use super::BookCatalog;
use crate::placer::{PlacementMode, Placer};

const SCHEMA: &str = r#"
    -- One row per cataloged file; hash is the dedup key
    CREATE TABLE books (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        created_on TEXT NOT NULL,
        updated_on TEXT NOT NULL,
        author TEXT NOT NULL,
        series TEXT,
        title TEXT NOT NULL,
        extension TEXT NOT NULL,
        tags TEXT NOT NULL DEFAULT '',
        original_filename TEXT NOT NULL,
        filename TEXT NOT NULL,
        file_size INTEGER NOT NULL,
        file_mtime TEXT NOT NULL,
        hash TEXT NOT NULL UNIQUE,
        naming_template TEXT NOT NULL,
        template_override TEXT,
        source TEXT
    );

    -- Full-text shadow index, rowid = books.id
    CREATE VIRTUAL TABLE books_fts USING fts5(
        author, series, title, extension, tags, filename, source
    );

    -- Books merged into another one
    CREATE TABLE book_aliases (
        id INTEGER PRIMARY KEY,
        hash TEXT NOT NULL UNIQUE,
        filename TEXT NOT NULL,
        surviving_id INTEGER NOT NULL,
        merged_on TEXT NOT NULL
    );

    CREATE INDEX idx_book_aliases_surviving ON book_aliases(surviving_id);
"#;

/// Columns of `books_fts` that a `field:` prefix may name.
const SEARCH_FIELDS: &[&str] = &[
    "author",
    "series",
    "title",
    "extension",
    "tags",
    "filename",
    "source",
];

const BOOK_COLUMNS: &str = "id, created_on, updated_on, author, series, title, extension, tags, \
     original_filename, filename, file_size, file_mtime, hash, naming_template, \
     template_override, source";

/// SQLite-backed book catalog.
pub struct SqliteLibrary {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
    placer: Arc<dyn Placer>,
}

impl SqliteLibrary {
    /// Initialize a new library in `path`.
    ///
    /// This sets up the schema for the first time; a file that already holds a
    /// library is rejected. Use [`SqliteLibrary::open`] afterwards.
    pub fn create(path: &Path) -> Result<(), CatalogError> {
        info!("Creating library in {}", path.display());
        let conn = Connection::open(path).map_err(CatalogError::db("opening library file"))?;
        if Self::has_schema(&conn)? {
            return Err(CatalogError::AlreadyInitialized(path.to_path_buf()));
        }
        conn.execute_batch(SCHEMA)
            .map_err(CatalogError::db("creating schema"))?;
        info!("Library created in {}", path.display());
        Ok(())
    }

    /// Open an existing library.
    pub fn open(path: &Path, placer: Arc<dyn Placer>) -> Result<Self, CatalogError> {
        let conn = Connection::open(path).map_err(CatalogError::db("opening library file"))?;
        if !Self::has_schema(&conn)? {
            return Err(CatalogError::NotInitialized(path.to_path_buf()));
        }
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
            placer,
        })
    }

    /// Create an in-memory library (useful for testing).
    pub fn in_memory(placer: Arc<dyn Placer>) -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory().map_err(CatalogError::db("opening library"))?;
        conn.execute_batch(SCHEMA)
            .map_err(CatalogError::db("creating schema"))?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
            placer,
        })
    }

    /// Turn off synchronous writes for this connection.
    ///
    /// Imports get much faster, but data written shortly before a power loss
    /// or OS crash can be lost.
    pub fn with_fast_writes(self) -> Result<Self, CatalogError> {
        self.lock()?
            .execute_batch("PRAGMA synchronous = OFF")
            .map_err(CatalogError::db("setting synchronous mode"))?;
        Ok(self)
    }

    /// The database file, if this library is file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The content root books are placed under.
    pub fn books_root(&self) -> &Path {
        self.placer.root()
    }

    fn has_schema(conn: &Connection) -> Result<bool, CatalogError> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'books'")
            .and_then(|mut stmt| stmt.exists([]))
            .map_err(CatalogError::db("inspecting schema"))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CatalogError> {
        self.conn
            .lock()
            .map_err(|_| CatalogError::Internal("library connection lock poisoned".to_string()))
    }

    /// Id of a live book or merged alias with this hash, other than `excluding`.
    fn find_by_hash(
        conn: &Connection,
        hash: &str,
        excluding: Option<i64>,
    ) -> rusqlite::Result<Option<i64>> {
        conn.query_row(
            "SELECT id FROM books WHERE hash = ?1 AND id != ?2
             UNION ALL
             SELECT surviving_id FROM book_aliases WHERE hash = ?1 AND surviving_id != ?2
             LIMIT 1",
            params![hash, excluding.unwrap_or(0)],
            |row| row.get(0),
        )
        .optional()
    }

    /// Id of another book with the same author, title and series.
    fn find_by_identity(conn: &Connection, book: &Book) -> rusqlite::Result<Option<i64>> {
        conn.query_row(
            "SELECT id FROM books
             WHERE author = ?1 COLLATE NOCASE
               AND title = ?2 COLLATE NOCASE
               AND COALESCE(series, '') = COALESCE(?3, '') COLLATE NOCASE
               AND id != ?4
             ORDER BY id
             LIMIT 1",
            params![book.author, book.title, book.series, book.id],
            |row| row.get(0),
        )
        .optional()
    }

    /// Copies the committed searchable fields of a book into the index.
    fn index_book(conn: &Connection, id: i64) -> rusqlite::Result<()> {
        conn.execute(
            "INSERT INTO books_fts (rowid, author, series, title, extension, tags, filename, source)
             SELECT id, author, series, title, extension, tags, filename, source
             FROM books WHERE id = ?",
            params![id],
        )?;
        Ok(())
    }

    fn unindex_book(conn: &Connection, id: i64) -> rusqlite::Result<()> {
        conn.execute("DELETE FROM books_fts WHERE rowid = ?", params![id])?;
        Ok(())
    }

    /// Follows a merge alias to the surviving id.
    fn resolve_alias(conn: &Connection, id: i64) -> rusqlite::Result<i64> {
        let surviving = conn
            .query_row(
                "SELECT surviving_id FROM book_aliases WHERE id = ?",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(surviving.unwrap_or(id))
    }

    /// Loads books in one query, returned in the order of `ids`.
    fn load_books(conn: &Connection, ids: &[i64]) -> rusqlite::Result<Vec<Book>> {
        let mut unique = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(id) {
                unique.push(*id);
            }
        }
        if unique.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; unique.len()].join(",");
        let sql = format!(
            "SELECT {} FROM books WHERE id IN ({})",
            BOOK_COLUMNS, placeholders
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(unique.iter()), Self::row_to_book)?;

        let mut by_id = HashMap::with_capacity(unique.len());
        for row in rows {
            let book = row?;
            by_id.insert(book.id, book);
        }

        Ok(unique.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    fn load_all(conn: &Connection) -> rusqlite::Result<Vec<Book>> {
        let sql = format!("SELECT {} FROM books ORDER BY id", BOOK_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::row_to_book)?;
        let books = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(books)
    }

    fn row_to_book(row: &rusqlite::Row) -> rusqlite::Result<Book> {
        let tags: String = row.get(7)?;
        let file_size: i64 = row.get(10)?;

        Ok(Book {
            id: row.get(0)?,
            created_on: parse_timestamp(row, 1)?,
            updated_on: parse_timestamp(row, 2)?,
            author: row.get(3)?,
            series: row.get(4)?,
            title: row.get(5)?,
            extension: row.get(6)?,
            tags: decode_tags(&tags),
            original_filename: row.get(8)?,
            current_filename: row.get(9)?,
            file_size: file_size.max(0) as u64,
            file_mtime: parse_timestamp(row, 11)?,
            hash: row.get(12)?,
            naming_template: row.get(13)?,
            template_override: row.get(14)?,
            source: row.get(15)?,
        })
    }
}

fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Rewrites a user query into an FTS5 expression.
///
/// Each whitespace-separated term becomes a quoted phrase, so punctuation in
/// titles and tags is tokenized instead of parsed as query syntax. A known
/// `field:` prefix becomes a column filter and a trailing `*` a prefix match.
/// Terms are joined with spaces, which FTS5 reads as AND. Returns `None` when
/// no term has anything left to match.
fn fts_query(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .filter_map(|term| {
            let (field, value) = match term.split_once(':') {
                Some((field, value)) => {
                    let field = field.to_lowercase();
                    if SEARCH_FIELDS.contains(&field.as_str()) {
                        (Some(field), value)
                    } else {
                        (None, term)
                    }
                }
                None => (None, term),
            };
            let (value, prefix) = match value.strip_suffix('*') {
                Some(stem) => (stem, true),
                None => (value, false),
            };
            if !value.chars().any(char::is_alphanumeric) {
                return None;
            }

            let mut phrase = format!("\"{}\"", value.replace('"', "\"\""));
            if prefix {
                phrase.push_str(" *");
            }
            Some(match field {
                Some(field) => format!("{} : {}", field, phrase),
                None => phrase,
            })
        })
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

impl BookCatalog for SqliteLibrary {
    fn import(&self, book: NewBook, mode: PlacementMode) -> Result<Book, CatalogError> {
        book.validate()?;

        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(CatalogError::db("starting import"))?;

        if let Some(existing_id) = Self::find_by_hash(&tx, &book.hash, None)
            .map_err(CatalogError::db("searching for duplicate book by hash"))?
        {
            debug!(
                "Skipping import of {}: hash {} already cataloged as {}",
                book.original_filename, book.hash, existing_id
            );
            return Err(CatalogError::Duplicate { existing_id });
        }

        let now = Utc::now();
        let now_str = now.to_rfc3339();
        let inserted = tx.execute(
            "INSERT INTO books (created_on, updated_on, author, series, title, extension, tags,
                                original_filename, filename, file_size, file_mtime, hash,
                                naming_template, template_override, source)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                &now_str,
                &now_str,
                &book.author,
                &book.series,
                &book.title,
                &book.extension,
                encode_tags(&book.tags),
                &book.original_filename,
                &book.current_filename,
                book.file_size as i64,
                book.file_mtime.to_rfc3339(),
                &book.hash,
                &book.naming_template,
                &book.template_override,
                &book.source,
            ],
        );
        if let Err(e) = inserted {
            // Another writer may have committed the same hash since the check above.
            if is_unique_violation(&e) {
                if let Ok(Some(existing_id)) = Self::find_by_hash(&tx, &book.hash, None) {
                    return Err(CatalogError::Duplicate { existing_id });
                }
            }
            return Err(CatalogError::db("inserting book")(e));
        }
        let id = tx.last_insert_rowid();

        Self::index_book(&tx, id).map_err(CatalogError::db("indexing book for search"))?;

        // Last fallible step before commit; dropping `tx` on error rolls the rows back.
        self.placer.place(
            Path::new(&book.original_filename),
            Path::new(&book.current_filename),
            mode,
        )?;

        if let Err(e) = tx.commit() {
            warn!(
                "Import of {} failed after placing it at {}; the placed file was left in place",
                book.original_filename,
                self.placer.resolve(Path::new(&book.current_filename)).display()
            );
            return Err(CatalogError::db("committing import")(e));
        }

        info!(
            "Imported book: {}: {}, ID = {}",
            book.author, book.title, id
        );

        Ok(Book {
            id,
            created_on: now,
            updated_on: now,
            author: book.author,
            series: book.series,
            title: book.title,
            extension: book.extension,
            tags: book.tags,
            original_filename: book.original_filename,
            current_filename: book.current_filename,
            file_size: book.file_size,
            file_mtime: book.file_mtime,
            hash: book.hash,
            naming_template: book.naming_template,
            template_override: book.template_override,
            source: book.source,
        })
    }

    fn search(&self, query: &str) -> Result<Vec<Book>, CatalogError> {
        let Some(expression) = fts_query(query) else {
            return Ok(Vec::new());
        };
        debug!("Search {:?} as {}", query, expression);

        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(CatalogError::db("starting search"))?;

        let ids = {
            let mut stmt = tx
                .prepare("SELECT rowid FROM books_fts WHERE books_fts MATCH ?1 ORDER BY rank")
                .map_err(CatalogError::db("querying search index"))?;
            let rows = stmt
                .query_map(params![expression], |row| row.get::<_, i64>(0))
                .map_err(CatalogError::db("querying search index"))?;
            let ids: Vec<i64> = rows
                .collect::<rusqlite::Result<_>>()
                .map_err(CatalogError::db("retrieving search results"))?;
            ids
        };

        Self::load_books(&tx, &ids).map_err(CatalogError::db("fetching books by id"))
    }

    fn get_books_by_id(&self, ids: &[i64]) -> Result<Vec<Book>, CatalogError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(CatalogError::db("starting lookup"))?;

        let resolved = ids
            .iter()
            .map(|id| Self::resolve_alias(&tx, *id))
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(CatalogError::db("resolving merged ids"))?;

        Self::load_books(&tx, &resolved).map_err(CatalogError::db("fetching books by id"))
    }

    fn update(&self, book: &Book, allow_merge_prompt: bool) -> Result<(), CatalogError> {
        book.validate()?;

        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(CatalogError::db("starting update"))?;

        let stored_hash: String = tx
            .query_row(
                "SELECT hash FROM books WHERE id = ?",
                params![book.id],
                |row| row.get(0),
            )
            .optional()
            .map_err(CatalogError::db("loading book"))?
            .ok_or(CatalogError::NotFound(book.id))?;

        if stored_hash != book.hash {
            return Err(CatalogError::InvalidBook(
                "content hash cannot be changed".to_string(),
            ));
        }

        if let Some(existing_id) = Self::find_by_hash(&tx, &stored_hash, Some(book.id))
            .map_err(CatalogError::db("searching for duplicate book by hash"))?
        {
            return Err(CatalogError::Duplicate { existing_id });
        }

        if allow_merge_prompt {
            if let Some(existing_id) = Self::find_by_identity(&tx, book)
                .map_err(CatalogError::db("searching for duplicate book by name"))?
            {
                return Err(CatalogError::Duplicate { existing_id });
            }
        }

        tx.execute(
            "UPDATE books
             SET author = ?, series = ?, title = ?, tags = ?, source = ?,
                 template_override = ?, updated_on = ?
             WHERE id = ?",
            params![
                &book.author,
                &book.series,
                &book.title,
                encode_tags(&book.tags),
                &book.source,
                &book.template_override,
                Utc::now().to_rfc3339(),
                book.id,
            ],
        )
        .map_err(CatalogError::db("updating book"))?;

        Self::unindex_book(&tx, book.id).map_err(CatalogError::db("removing stale index entry"))?;
        Self::index_book(&tx, book.id).map_err(CatalogError::db("indexing book for search"))?;

        tx.commit().map_err(CatalogError::db("committing update"))?;
        info!("Updated book {}: {}: {}", book.id, book.author, book.title);
        Ok(())
    }

    fn merge_books(&self, ids: &[i64]) -> Result<(), CatalogError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(CatalogError::db("starting merge"))?;

        let mut resolved: Vec<i64> = Vec::with_capacity(ids.len());
        for id in ids {
            let id = Self::resolve_alias(&tx, *id)
                .map_err(CatalogError::db("resolving merged ids"))?;
            if !resolved.contains(&id) {
                resolved.push(id);
            }
        }

        let books = Self::load_books(&tx, &resolved)
            .map_err(CatalogError::db("fetching books by id"))?;
        if let Some(missing) = resolved
            .iter()
            .find(|id| !books.iter().any(|b| b.id == **id))
        {
            return Err(CatalogError::NotFound(*missing));
        }

        let Some((survivor, merged)) = books.split_first() else {
            return Ok(());
        };
        if merged.is_empty() {
            return Ok(());
        }

        let now_str = Utc::now().to_rfc3339();
        let mut tags = survivor.tags.clone();

        for book in merged {
            for tag in &book.tags {
                if !tags.contains(tag) {
                    tags.push(tag.clone());
                }
            }

            tx.execute(
                "UPDATE book_aliases SET surviving_id = ?1 WHERE surviving_id = ?2",
                params![survivor.id, book.id],
            )
            .map_err(CatalogError::db("re-pointing aliases"))?;
            tx.execute(
                "INSERT INTO book_aliases (id, hash, filename, surviving_id, merged_on)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    book.id,
                    &book.hash,
                    &book.current_filename,
                    survivor.id,
                    &now_str
                ],
            )
            .map_err(CatalogError::db("recording merge alias"))?;

            Self::unindex_book(&tx, book.id)
                .map_err(CatalogError::db("removing merged index entry"))?;
            tx.execute("DELETE FROM books WHERE id = ?", params![book.id])
                .map_err(CatalogError::db("removing merged book"))?;
        }

        tx.execute(
            "UPDATE books SET tags = ?, updated_on = ? WHERE id = ?",
            params![encode_tags(&tags), &now_str, survivor.id],
        )
        .map_err(CatalogError::db("updating surviving book"))?;
        Self::unindex_book(&tx, survivor.id)
            .map_err(CatalogError::db("removing stale index entry"))?;
        Self::index_book(&tx, survivor.id)
            .map_err(CatalogError::db("indexing book for search"))?;

        tx.commit().map_err(CatalogError::db("committing merge"))?;

        for book in merged {
            info!(
                "Merged book {} into {}; its file remains at {}",
                book.id, survivor.id, book.current_filename
            );
        }
        Ok(())
    }

    fn missing_files(&self) -> Result<Vec<Book>, CatalogError> {
        let books = {
            let conn = self.lock()?;
            Self::load_all(&conn).map_err(CatalogError::db("listing books"))?
        };

        Ok(books
            .into_iter()
            .filter(|book| !self.placer.resolve(&book.relative_path()).exists())
            .collect())
    }
}
