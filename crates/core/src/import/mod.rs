//! Turning an inbound file into a [`NewBook`](crate::catalog::NewBook).
//!
//! Metadata comes from the file name: the configured patterns are tried in
//! order against the file stem, and the output template decides where the
//! book is filed under the content root.

mod error;
mod file;
mod hash;
mod naming;

pub use error::ImportError;
pub use file::prepare_import;
pub use hash::hash_file;
pub use naming::{NamingRules, ParsedName};
