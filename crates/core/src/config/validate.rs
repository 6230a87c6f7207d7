use std::collections::HashSet;

use regex_lite::Regex;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Library path and root are set
/// - Import patterns compile, capture author and title, and have unique names
/// - The output template keeps the extension
/// - Converter target extension and placer buffer size are usable
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.library.path.as_os_str().is_empty() {
        return Err(invalid("library.path cannot be empty"));
    }
    if config.library.root.as_os_str().is_empty() {
        return Err(invalid("library.root cannot be empty"));
    }

    let mut names = HashSet::new();
    for pattern in &config.import.patterns {
        if !names.insert(pattern.name.as_str()) {
            return Err(invalid(format!(
                "duplicate import pattern name: {}",
                pattern.name
            )));
        }
        let regex = Regex::new(&pattern.pattern).map_err(|e| {
            invalid(format!("import pattern {} does not compile: {}", pattern.name, e))
        })?;
        let groups: HashSet<&str> = regex.capture_names().flatten().collect();
        for required in ["author", "title"] {
            if !groups.contains(required) {
                return Err(invalid(format!(
                    "import pattern {} has no '{}' group",
                    pattern.name, required
                )));
            }
        }
    }

    if !config.import.output_template.contains("{ext}") {
        return Err(invalid("import.output_template must contain {ext}"));
    }

    let extension = &config.converter.target_extension;
    if extension.is_empty() || extension.starts_with('.') {
        return Err(invalid(
            "converter.target_extension must be non-empty and have no leading dot",
        ));
    }

    if config.placer.buffer_size == 0 {
        return Err(invalid("placer.buffer_size cannot be 0"));
    }

    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_config_from_str, PatternConfig};

    fn valid_config() -> Config {
        load_config_from_str(
            r#"
[library]
path = "books.db"
root = "books"
"#,
        )
        .unwrap()
    }

    fn assert_invalid(config: &Config) {
        let result = validate_config(config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_empty_root_fails() {
        let mut config = valid_config();
        config.library.root = "".into();
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_pattern_without_title_fails() {
        let mut config = valid_config();
        config.import.patterns = vec![PatternConfig {
            name: "bad".to_string(),
            pattern: "^(?P<author>.+)$".to_string(),
        }];
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_pattern_that_does_not_compile_fails() {
        let mut config = valid_config();
        config.import.patterns[0].pattern = "^(?P<author>.+".to_string();
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_duplicate_pattern_names_fail() {
        let mut config = valid_config();
        let copy = config.import.patterns[0].clone();
        config.import.patterns.push(copy);
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_template_without_extension_fails() {
        let mut config = valid_config();
        config.import.output_template = "{author}/{title}".to_string();
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_target_extension() {
        let mut config = valid_config();
        config.converter.target_extension = ".epub".to_string();
        assert_invalid(&config);

        config.converter.target_extension = String::new();
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_zero_buffer_fails() {
        let mut config = valid_config();
        config.placer.buffer_size = 0;
        assert_invalid(&config);
    }
}
