//! Line-oriented editor for a single book.
//!
//! Edits stay in memory until `save`. When saving would create a second
//! record for the same book, the editor reports the existing id and only
//! merges when asked with `save -m`.

use std::io::{self, BufRead, Write};
use tracing::{debug, info};

use crate::catalog::{split_authors, Book, BookCatalog, CatalogError};

type Handler = fn(&mut EditorSession<'_>, &str, &mut dyn Write) -> io::Result<()>;

const COMMANDS: &[(&str, Handler)] = &[
    ("a", cmd_authors),
    ("authors", cmd_authors),
    ("show", cmd_show),
    ("title", cmd_title),
    ("series", cmd_series),
    ("save", cmd_save),
];

/// An editing session over one book.
pub struct EditorSession<'a> {
    catalog: &'a dyn BookCatalog,
    book: Book,
}

impl<'a> EditorSession<'a> {
    pub fn new(catalog: &'a dyn BookCatalog, book: Book) -> Self {
        Self { catalog, book }
    }

    /// Loads `id` from the catalog. Merged ids open their surviving book.
    pub fn open(catalog: &'a dyn BookCatalog, id: i64) -> Result<Self, CatalogError> {
        let book = catalog
            .get_books_by_id(&[id])?
            .into_iter()
            .next()
            .ok_or(CatalogError::NotFound(id))?;
        Ok(Self::new(catalog, book))
    }

    /// The book as currently edited, saved or not.
    pub fn book(&self) -> &Book {
        &self.book
    }

    /// Shows the book, then reads commands until end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut output: W) -> io::Result<()> {
        cmd_show(self, "", &mut output)?;

        let mut line = String::new();
        loop {
            write!(output, "> ")?;
            output.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                return Ok(());
            }
            self.execute(line.trim_end_matches(['\r', '\n']), &mut output)?;
        }
    }

    /// Runs one command line. Blank lines are ignored.
    pub fn execute(&mut self, line: &str, output: &mut dyn Write) -> io::Result<()> {
        if line.trim().is_empty() {
            return Ok(());
        }

        let (name, args) = match line.split_once(' ') {
            Some((name, args)) => (name, args.trim()),
            None => (line, ""),
        };
        match COMMANDS.iter().find(|(command, _)| *command == name) {
            Some((_, handler)) => handler(self, args, output),
            None => writeln!(output, "Unknown command."),
        }
    }
}

fn cmd_show(
    session: &mut EditorSession<'_>,
    _args: &str,
    output: &mut dyn Write,
) -> io::Result<()> {
    writeln!(output, "Title: {}", session.book.title)?;
    writeln!(output, "Authors: {}", session.book.author)?;
    writeln!(output, "Series: {}", session.book.series.as_deref().unwrap_or(""))
}

fn cmd_authors(
    session: &mut EditorSession<'_>,
    args: &str,
    output: &mut dyn Write,
) -> io::Result<()> {
    let authors = split_authors(args);
    if authors.is_empty() {
        return writeln!(output, "Usage: authors <author> [& <author>...]");
    }
    session.book.set_authors(&authors);
    Ok(())
}

fn cmd_title(
    session: &mut EditorSession<'_>,
    args: &str,
    output: &mut dyn Write,
) -> io::Result<()> {
    if args.is_empty() {
        return writeln!(output, "Usage: title <title>");
    }
    session.book.title = args.to_string();
    Ok(())
}

fn cmd_series(
    session: &mut EditorSession<'_>,
    args: &str,
    output: &mut dyn Write,
) -> io::Result<()> {
    if args.is_empty() {
        return writeln!(output, "Usage: series <series>");
    }
    session.book.series = Some(args.to_string());
    Ok(())
}

fn cmd_save(
    session: &mut EditorSession<'_>,
    args: &str,
    output: &mut dyn Write,
) -> io::Result<()> {
    let merge = args == "-m";
    match session.catalog.update(&session.book, true) {
        Ok(()) => {
            debug!("Saved book {}", session.book.id);
            writeln!(output, "Saved.")
        }
        Err(CatalogError::Duplicate { existing_id }) if merge => {
            merge_into(session, existing_id, output)
        }
        Err(CatalogError::Duplicate { existing_id }) => writeln!(
            output,
            "A duplicate book already exists, id: {}. To merge, type save -m.",
            existing_id
        ),
        Err(e) => writeln!(output, "Error while updating book: {}", e),
    }
}

fn merge_into(
    session: &mut EditorSession<'_>,
    existing_id: i64,
    output: &mut dyn Write,
) -> io::Result<()> {
    if let Err(e) = session.catalog.merge_books(&[existing_id, session.book.id]) {
        return writeln!(output, "Error merging books: {}", e);
    }
    info!("Merged book {} into {}", session.book.id, existing_id);

    match session.catalog.get_books_by_id(&[existing_id]) {
        Ok(books) => {
            if let Some(survivor) = books.into_iter().next() {
                session.book = survivor;
            }
        }
        Err(e) => writeln!(output, "Error reloading book {}: {}", existing_id, e)?,
    }
    writeln!(output, "Merged into {}", existing_id)
}
