//! Converter module for producing other ebook formats.
//!
//! Conversion is delegated to an external program that takes exactly two
//! positional arguments, the input path and the output path, and signals
//! success with a zero exit code (Calibre's `ebook-convert` by default).
//! Results are cached next to the library database, keyed by content hash
//! and target extension.
//!
//! # Example
//!
//! ```ignore
//! use bookshelf_core::converter::{ConversionCache, ConverterConfig, ExternalConverter};
//!
//! let config = ConverterConfig::default();
//! let cache = ConversionCache::for_library(
//!     Path::new("/srv/books/library.db"),
//!     &config.target_extension,
//!     ExternalConverter::new(config.clone()),
//! );
//!
//! let epub = cache.convert_to_cache(&book, Path::new("/srv/books/files")).await?;
//! println!("Converted copy at {}", epub.display());
//! ```

mod cache;
mod config;
mod error;
mod external;
mod traits;

pub use cache::ConversionCache;
pub use config::ConverterConfig;
pub use error::ConverterError;
pub use external::ExternalConverter;
pub use traits::Converter;
