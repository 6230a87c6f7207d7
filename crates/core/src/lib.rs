pub mod catalog;
pub mod config;
pub mod converter;
pub mod editor;
pub mod import;
pub mod placer;
pub mod testing;

pub use catalog::{
    decode_tags, encode_tags, Book, BookCatalog, CatalogError, NewBook, SqliteLibrary,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, ImportConfig,
    LibraryConfig, PatternConfig,
};
pub use converter::{ConversionCache, Converter, ConverterConfig, ConverterError, ExternalConverter};
pub use editor::EditorSession;
pub use import::{hash_file, prepare_import, ImportError, NamingRules, ParsedName};
pub use placer::{unique_name, FsPlacer, PlacementMode, Placer, PlacerConfig, PlacerError};
