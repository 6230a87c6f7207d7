use regex_lite::Regex;
use std::path::PathBuf;

use super::ImportError;
use crate::catalog::TAG_DELIMITER;
use crate::config::ImportConfig;

/// Metadata extracted from a file stem by one of the naming patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    /// Name of the pattern that matched.
    pub pattern: String,
    pub author: String,
    pub title: String,
    pub series: Option<String>,
    pub tags: Vec<String>,
}

/// Compiled import patterns plus the output template.
#[derive(Debug, Clone)]
pub struct NamingRules {
    patterns: Vec<(String, Regex)>,
    template: String,
}

impl NamingRules {
    pub fn new(
        patterns: &[(impl AsRef<str>, impl AsRef<str>)],
        template: impl Into<String>,
    ) -> Result<Self, ImportError> {
        let patterns = patterns
            .iter()
            .map(|(name, pattern)| {
                let name = name.as_ref().to_string();
                Regex::new(pattern.as_ref())
                    .map(|regex| (name.clone(), regex))
                    .map_err(|e| ImportError::InvalidPattern {
                        name,
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            patterns,
            template: template.into(),
        })
    }

    pub fn from_config(config: &ImportConfig) -> Result<Self, ImportError> {
        let patterns: Vec<(&str, &str)> = config
            .patterns
            .iter()
            .map(|p| (p.name.as_str(), p.pattern.as_str()))
            .collect();
        Self::new(&patterns, config.output_template.clone())
    }

    /// Tries each pattern in order. A match with a blank author or title is
    /// skipped so a later pattern gets a chance.
    pub fn parse(&self, stem: &str) -> Option<ParsedName> {
        self.patterns.iter().find_map(|(name, regex)| {
            let caps = regex.captures(stem)?;
            let group = |group: &str| {
                caps.name(group)
                    .map(|m| m.as_str().trim().to_string())
                    .filter(|s| !s.is_empty())
            };

            Some(ParsedName {
                pattern: name.clone(),
                author: group("author")?,
                title: group("title")?,
                series: group("series"),
                tags: group("tags").map(|t| split_tags(&t)).unwrap_or_default(),
            })
        })
    }

    /// Fills the output template. Returns a path relative to the content root.
    pub fn render(&self, author: &str, series: Option<&str>, title: &str, ext: &str) -> PathBuf {
        render_template(&self.template, author, series, title, ext)
    }
}

/// Fills `{author}`, `{series}`, `{title}` and `{ext}` in `template`.
///
/// Path separators inside values are replaced, and empty segments (for
/// example a missing series) are dropped.
pub(crate) fn render_template(
    template: &str,
    author: &str,
    series: Option<&str>,
    title: &str,
    ext: &str,
) -> PathBuf {
    let rendered = template
        .replace("{author}", &sanitize(author))
        .replace("{series}", &series.map(sanitize).unwrap_or_default())
        .replace("{title}", &sanitize(title))
        .replace("{ext}", &sanitize(ext));

    rendered
        .split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect()
}

fn sanitize(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    if cleaned.chars().all(|c| c == '.') {
        cleaned.replace('.', "_")
    } else {
        cleaned
    }
}

fn split_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split([',', TAG_DELIMITER]) {
        let tag = tag.trim();
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}
