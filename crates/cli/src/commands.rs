use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use bookshelf_core::{
    prepare_import, Book, BookCatalog, CatalogError, Config, ConversionCache, EditorSession,
    ExternalConverter, FsPlacer, NamingRules, PlacementMode, SqliteLibrary,
};

fn open_library(config: &Config) -> Result<SqliteLibrary> {
    let placer = FsPlacer::new(&config.library.root, config.placer.clone());
    let library = SqliteLibrary::open(&config.library.path, Arc::new(placer))
        .with_context(|| format!("Failed to open library {:?}", config.library.path))?;
    if config.library.fast_writes {
        return Ok(library.with_fast_writes()?);
    }
    Ok(library)
}

fn book_by_id(library: &SqliteLibrary, id: i64) -> Result<Book> {
    match library.get_books_by_id(&[id])?.into_iter().next() {
        Some(book) => Ok(book),
        None => bail!("Book {} not found", id),
    }
}

pub fn init(config: &Config) -> Result<()> {
    if let Some(parent) = config.library.path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
    }
    fs::create_dir_all(&config.library.root)
        .with_context(|| format!("Failed to create {:?}", config.library.root))?;

    SqliteLibrary::create(&config.library.path)?;
    println!("Created library {}", config.library.path.display());
    Ok(())
}

pub fn import(
    config: &Config,
    files: &[PathBuf],
    move_files: bool,
    source: Option<String>,
) -> Result<()> {
    let library = open_library(config)?;
    let rules = NamingRules::from_config(&config.import)?;
    let mode = PlacementMode::from_move_flag(move_files);
    let source = source.or_else(|| config.import.source.clone());

    let mut failed = 0usize;
    for file in files {
        let book = match prepare_import(file, &rules, library.books_root(), source.as_deref()) {
            Ok(book) => book,
            Err(e) => {
                eprintln!("{}: {}", file.display(), e);
                failed += 1;
                continue;
            }
        };

        match library.import(book, mode) {
            Ok(book) => println!(
                "{}: imported as {} - {} (id {})",
                file.display(),
                book.author,
                book.title,
                book.id
            ),
            Err(CatalogError::Duplicate { existing_id }) => {
                // Not a failure: the library already has this file.
                println!("{}: already in library as id {}", file.display(), existing_id);
            }
            Err(e) => {
                eprintln!("{}: {}", file.display(), e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} files failed to import", failed, files.len());
    }
    Ok(())
}

pub fn search(config: &Config, query: &str, json: bool) -> Result<()> {
    let library = open_library(config)?;
    let books = library.search(query)?;
    info!("{} results for {:?}", books.len(), query);

    if json {
        println!("{}", serde_json::to_string_pretty(&books)?);
        return Ok(());
    }
    for book in &books {
        println!("{}", summary_line(book));
    }
    Ok(())
}

pub fn show(config: &Config, ids: &[i64], json: bool) -> Result<()> {
    let library = open_library(config)?;
    let books = library.get_books_by_id(ids)?;
    if books.len() < ids.len() {
        warn!("{} of {} ids were not found", ids.len() - books.len(), ids.len());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&books)?);
        return Ok(());
    }
    for book in &books {
        print_book(book);
        println!();
    }
    Ok(())
}

pub fn edit(config: &Config, id: i64) -> Result<()> {
    let library = open_library(config)?;
    let mut session = EditorSession::open(&library, id)?;
    session
        .run(io::stdin().lock(), io::stdout().lock())
        .context("Editor I/O failed")
}

pub async fn convert(config: &Config, id: i64) -> Result<()> {
    let library = open_library(config)?;
    let book = book_by_id(&library, id)?;

    let cache = ConversionCache::for_library(
        &config.library.path,
        config.converter.target_extension.clone(),
        ExternalConverter::new(config.converter.clone()),
    );
    let path = cache
        .convert_to_cache(&book, library.books_root())
        .await
        .with_context(|| format!("Failed to convert book {}", id))?;
    println!("{}", path.display());
    Ok(())
}

pub fn check(config: &Config) -> Result<()> {
    let library = open_library(config)?;
    let missing = library.missing_files()?;
    if missing.is_empty() {
        println!("No missing files.");
        return Ok(());
    }

    for book in &missing {
        println!("{}\t{}", book.id, book.current_filename);
    }
    bail!("{} books have missing files", missing.len())
}

fn summary_line(book: &Book) -> String {
    let series = book
        .series
        .as_deref()
        .map(|s| format!(" [{}]", s))
        .unwrap_or_default();
    format!(
        "{}\t{} - {}{}\t{}",
        book.id, book.author, book.title, series, book.current_filename
    )
}

fn print_book(book: &Book) {
    println!("Id: {}", book.id);
    println!("Title: {}", book.title);
    println!("Authors: {}", book.author);
    if let Some(series) = &book.series {
        println!("Series: {}", series);
    }
    if !book.tags.is_empty() {
        println!("Tags: {}", book.tags.join(", "));
    }
    println!("File: {}", book.current_filename);
    println!("Size: {} bytes", book.file_size);
    println!("Hash: {}", book.hash);
    if let Some(source) = &book.source {
        println!("Source: {}", source);
    }
    println!("Added: {}", book.created_on.to_rfc3339());
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_core::testing::fixtures;

    #[test]
    fn test_summary_line() {
        let mut book = fixtures::book(7, "h", "Frank Herbert", "Dune", "epub");
        assert_eq!(
            summary_line(&book),
            "7\tFrank Herbert - Dune\tFrank Herbert/Dune.epub"
        );

        book.series = Some("Dune Chronicles".to_string());
        assert_eq!(
            summary_line(&book),
            "7\tFrank Herbert - Dune [Dune Chronicles]\tFrank Herbert/Dune.epub"
        );
    }
}
