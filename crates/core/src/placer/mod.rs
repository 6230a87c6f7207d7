//! Placer module for putting book files at their location under the content root.
//!
//! This module provides the `Placer` trait and a filesystem implementation that
//! moves or copies an inbound file to a path relative to the configured root.
//!
//! # Features
//!
//! - Atomic rename when moving within one filesystem
//! - Copy-then-delete fallback when the rename fails
//! - Source modification time preserved on copies
//! - Automatic parent directory creation
//! - Collision-free names via [`unique_name`]
//!
//! # Example
//!
//! ```ignore
//! use bookshelf_core::placer::{FsPlacer, Placer, PlacementMode, PlacerConfig};
//!
//! let placer = FsPlacer::new("/srv/books", PlacerConfig::default());
//! let placed = placer.place(
//!     Path::new("/tmp/inbox/Frank Herbert - Dune.epub"),
//!     Path::new("Frank Herbert/Dune.epub"),
//!     PlacementMode::Move,
//! )?;
//! println!("Placed {} ({} bytes)", placed.destination.display(), placed.size_bytes);
//! ```

mod config;
mod error;
mod fs_placer;
mod traits;
mod types;

pub use config::PlacerConfig;
pub use error::PlacerError;
pub use fs_placer::{unique_name, FsPlacer};
pub use traits::Placer;
pub use types::{PlacedFile, PlacementMode, PlacementOutcome};
