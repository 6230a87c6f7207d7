use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;
use tracing::debug;

use super::{hash_file, ImportError, NamingRules};
use crate::catalog::NewBook;
use crate::placer::{unique_name, PlacerError};

/// Builds the catalog record for `path` without touching the library.
///
/// The destination is made collision-free against what is on disk under
/// `root` right now; the catalog's placement step is what claims it.
pub fn prepare_import(
    path: &Path,
    rules: &NamingRules,
    root: &Path,
    source: Option<&str>,
) -> Result<NewBook, ImportError> {
    let metadata = fs::metadata(path)?;

    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ImportError::MissingExtension {
            path: path.to_path_buf(),
        })?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let parsed = rules
        .parse(&stem)
        .ok_or_else(|| ImportError::NoPatternMatched { stem: stem.clone() })?;

    let relative = rules.render(
        &parsed.author,
        parsed.series.as_deref(),
        &parsed.title,
        &extension,
    );
    let destination = unique_name(&root.join(&relative));
    let relative = destination
        .strip_prefix(root)
        .map_err(|_| PlacerError::OutsideRoot {
            path: destination.clone(),
        })?
        .to_path_buf();

    let hash = hash_file(path)?;
    let file_mtime: DateTime<Utc> = metadata.modified()?.into();
    let original = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    debug!(
        "Prepared {} as {} (pattern {})",
        path.display(),
        relative.display(),
        parsed.pattern
    );

    Ok(NewBook {
        author: parsed.author,
        series: parsed.series,
        title: parsed.title,
        extension,
        tags: parsed.tags,
        original_filename: original.to_string_lossy().into_owned(),
        current_filename: relative.to_string_lossy().into_owned(),
        file_size: metadata.len(),
        file_mtime,
        hash,
        naming_template: parsed.pattern,
        template_override: None,
        source: source.map(str::to_string),
    })
}
