//! Library lifecycle integration tests.
//!
//! These tests run the catalog against a real database file and content root:
//! - Import with deduplication by content hash
//! - Rollback when placement fails
//! - Search after import and update
//! - Merges and missing-file detection
//! - Conversion through the cache

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use bookshelf_core::{
    prepare_import, testing::MockConverter, Book, BookCatalog, CatalogError, ConversionCache,
    FsPlacer, ImportConfig, NamingRules, NewBook, PlacementMode, PlacerError, SqliteLibrary,
};

/// A file-backed library with an inbox to import from.
struct TestHarness {
    library: SqliteLibrary,
    rules: NamingRules,
    temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("library.db");
        fs::create_dir_all(temp_dir.path().join("books")).unwrap();
        fs::create_dir_all(temp_dir.path().join("inbox")).unwrap();

        SqliteLibrary::create(&db_path).expect("Failed to create library");
        let placer = FsPlacer::with_defaults(temp_dir.path().join("books"));
        let library = SqliteLibrary::open(&db_path, Arc::new(placer))
            .and_then(SqliteLibrary::with_fast_writes)
            .expect("Failed to open library");
        let rules = NamingRules::from_config(&ImportConfig::default()).unwrap();

        Self {
            library,
            rules,
            temp_dir,
        }
    }

    fn root(&self) -> PathBuf {
        self.temp_dir.path().join("books")
    }

    fn inbox_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join("inbox").join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn prepare(&self, path: &Path) -> NewBook {
        prepare_import(path, &self.rules, &self.root(), None).unwrap()
    }

    fn import(&self, name: &str, content: &str, mode: PlacementMode) -> Result<Book, CatalogError> {
        let path = self.inbox_file(name, content);
        self.library.import(self.prepare(&path), mode)
    }

    /// Every file under the temp dir except the database and its journal.
    fn snapshot(&self) -> BTreeMap<PathBuf, Vec<u8>> {
        let mut files = BTreeMap::new();
        collect_files(self.temp_dir.path(), self.temp_dir.path(), &mut files);
        files.retain(|path, _| !path.to_string_lossy().starts_with("library.db"));
        files
    }
}

fn collect_files(base: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect_files(base, &path, out);
        } else {
            let relative = path.strip_prefix(base).unwrap().to_path_buf();
            out.insert(relative, fs::read(&path).unwrap());
        }
    }
}

fn ids(books: &[Book]) -> Vec<i64> {
    books.iter().map(|b| b.id).collect()
}

#[test]
fn test_duplicate_import_leaves_filesystem_unchanged() {
    let harness = TestHarness::new();
    let dune = harness
        .import("Frank Herbert - Dune.epub", "spice", PlacementMode::Copy)
        .unwrap();
    assert_eq!(dune.id, 1);
    assert!(harness.root().join("Frank Herbert/Dune.epub").exists());

    let dup = harness.inbox_file("Frank Herbert - Dune (dup).epub", "spice");
    let before = harness.snapshot();
    let result = harness
        .library
        .import(harness.prepare(&dup), PlacementMode::Move);

    assert!(matches!(result, Err(CatalogError::Duplicate { existing_id: 1 })));
    assert_eq!(harness.snapshot(), before);
    assert_eq!(ids(&harness.library.search("title:Dune").unwrap()), vec![1]);
}

#[test]
fn test_failed_placement_is_not_visible() {
    let harness = TestHarness::new();
    let path = harness.inbox_file("Frank Herbert - Dune.epub", "spice");
    let mut book = harness.prepare(&path);

    // Claim the destination after the name was chosen.
    fs::create_dir_all(harness.root().join("Frank Herbert")).unwrap();
    fs::write(harness.root().join(&book.current_filename), "someone else").unwrap();

    let result = harness.library.import(book.clone(), PlacementMode::Copy);
    assert!(matches!(
        result,
        Err(CatalogError::Placement(PlacerError::DestinationExists { .. }))
    ));
    assert!(harness.library.search("title:Dune").unwrap().is_empty());
    assert!(harness.library.get_books_by_id(&[1]).unwrap().is_empty());

    // A retry under a free name goes through.
    book.current_filename = "Frank Herbert/Dune (1).epub".to_string();
    let imported = harness.library.import(book, PlacementMode::Copy).unwrap();
    assert_eq!(ids(&harness.library.search("title:Dune").unwrap()), vec![imported.id]);
    assert_eq!(
        fs::read_to_string(harness.root().join("Frank Herbert/Dune (1).epub")).unwrap(),
        "spice"
    );
}

#[test]
fn test_update_then_search() {
    let harness = TestHarness::new();
    let mut dune = harness
        .import("Frank Herbert - Dune.epub", "spice", PlacementMode::Copy)
        .unwrap();

    dune.title = "Dune (Revised)".to_string();
    dune.tags = vec!["scifi".to_string()];
    harness.library.update(&dune, false).unwrap();

    assert_eq!(ids(&harness.library.search("title:Revised").unwrap()), vec![dune.id]);
    assert_eq!(ids(&harness.library.search("tags:scifi").unwrap()), vec![dune.id]);

    let stored = &harness.library.get_books_by_id(&[dune.id]).unwrap()[0];
    assert_eq!(stored.title, "Dune (Revised)");
    assert_eq!(stored.current_filename, "Frank Herbert/Dune.epub");
    assert!(stored.updated_on >= stored.created_on);
}

#[test]
fn test_lookup_is_idempotent() {
    let harness = TestHarness::new();
    harness
        .import("Frank Herbert - Dune.epub", "spice", PlacementMode::Copy)
        .unwrap();
    harness
        .import("Isaac Asimov - Foundation.epub", "psychohistory", PlacementMode::Copy)
        .unwrap();

    let first = harness.library.get_books_by_id(&[2, 1, 99]).unwrap();
    let second = harness.library.get_books_by_id(&[2, 1, 99]).unwrap();
    assert_eq!(ids(&first), vec![2, 1]);
    assert_eq!(first, second);
    assert!(harness.library.get_books_by_id(&[]).unwrap().is_empty());
}

#[test]
fn test_move_import_and_missing_files() {
    let harness = TestHarness::new();
    let source = harness.inbox_file("Frank Herbert - Dune.epub", "spice");
    let dune = harness
        .library
        .import(harness.prepare(&source), PlacementMode::Move)
        .unwrap();

    assert!(!source.exists());
    let placed = harness.root().join(&dune.current_filename);
    assert!(placed.exists());
    assert!(harness.library.missing_files().unwrap().is_empty());

    fs::remove_file(&placed).unwrap();
    assert_eq!(ids(&harness.library.missing_files().unwrap()), vec![dune.id]);
}

#[test]
fn test_merge_keeps_deduplicating() {
    let harness = TestHarness::new();
    let dune = harness
        .import("Frank Herbert - Dune.epub", "spice", PlacementMode::Copy)
        .unwrap();
    let scan = harness
        .import("Frank Herbert - Dune Scan.pdf", "scanned spice", PlacementMode::Copy)
        .unwrap();

    harness.library.merge_books(&[dune.id, scan.id]).unwrap();

    assert_eq!(ids(&harness.library.get_books_by_id(&[scan.id]).unwrap()), vec![dune.id]);
    assert!(harness.library.search("pdf").unwrap().is_empty());
    // The merged file stays on disk.
    assert!(harness.root().join(&scan.current_filename).exists());

    let again = harness.import("Frank Herbert - Dune Scan.pdf", "scanned spice", PlacementMode::Copy);
    assert!(matches!(
        again,
        Err(CatalogError::Duplicate { existing_id }) if existing_id == dune.id
    ));
}

#[test]
fn test_reopen_keeps_books() {
    let harness = TestHarness::new();
    harness
        .import("Frank Herbert - Dune.epub", "spice", PlacementMode::Copy)
        .unwrap();

    let db_path = harness.temp_dir.path().join("library.db");
    let reopened =
        SqliteLibrary::open(&db_path, Arc::new(FsPlacer::with_defaults(harness.root()))).unwrap();
    assert_eq!(ids(&reopened.search("author:herbert").unwrap()), vec![1]);
    assert!(matches!(
        SqliteLibrary::create(&db_path),
        Err(CatalogError::AlreadyInitialized(_))
    ));
}

#[tokio::test]
async fn test_convert_into_library_cache() {
    let harness = TestHarness::new();
    let dune = harness
        .import("Frank Herbert - Dune.mobi", "spice", PlacementMode::Copy)
        .unwrap();

    let converter = MockConverter::new();
    let cache = ConversionCache::for_library(
        harness.library.path().unwrap(),
        "epub",
        converter.clone(),
    );

    let converted = cache
        .convert_to_cache(&dune, harness.library.books_root())
        .await
        .unwrap();
    assert_eq!(
        converted,
        harness.temp_dir.path().join("cache").join(format!("{}.epub", dune.hash))
    );
    assert!(converted.exists());
    assert_eq!(
        converter.recorded_jobs()[0].input,
        harness.root().join("Frank Herbert/Dune.mobi")
    );
}
