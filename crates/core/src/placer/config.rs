//! Configuration for the placer module.

use serde::{Deserialize, Serialize};

/// Configuration for the file system placer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacerConfig {
    /// Buffer size for file copies in bytes.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Whether moves try a rename before copying.
    #[serde(default = "default_true")]
    pub prefer_atomic_moves: bool,

    /// Whether an existing destination may be replaced.
    #[serde(default)]
    pub overwrite: bool,
}

fn default_buffer_size() -> usize {
    1024 * 1024 // 1 MB
}

fn default_true() -> bool {
    true
}

impl Default for PlacerConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            prefer_atomic_moves: true,
            overwrite: false,
        }
    }
}

impl PlacerConfig {
    /// Enables or disables rename-first moves.
    pub fn with_atomic_moves(mut self, enabled: bool) -> Self {
        self.prefer_atomic_moves = enabled;
        self
    }

    /// Allows replacing existing destinations.
    pub fn with_overwrite(mut self, enabled: bool) -> Self {
        self.overwrite = enabled;
        self
    }

    /// Sets the buffer size for copies.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PlacerConfig::default();
        assert_eq!(config.buffer_size, 1024 * 1024);
        assert!(config.prefer_atomic_moves);
        assert!(!config.overwrite);
    }

    #[test]
    fn test_config_builder() {
        let config = PlacerConfig::default()
            .with_atomic_moves(false)
            .with_overwrite(true)
            .with_buffer_size(4096);

        assert!(!config.prefer_atomic_moves);
        assert!(config.overwrite);
        assert_eq!(config.buffer_size, 4096);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: PlacerConfig = toml::from_str("overwrite = true").unwrap();
        assert!(config.overwrite);
        assert!(config.prefer_atomic_moves);
        assert_eq!(config.buffer_size, 1024 * 1024);
    }
}
