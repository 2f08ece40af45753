//! Project configuration (`loc.toml`)
//!
//! Enumerates the spreadsheet documents, the declared languages with
//! their culture ids and import settings, and the optional atlas
//! sub-pipeline (font groups, fallback chain, minimum font size).

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid loc.toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("language '{language}' has invalid culture id '{culture}'")]
    InvalidCulture { language: String, culture: String },
    #[error("master document '{0}' is not declared in [[documents]]")]
    UnknownMaster(String),
    #[error("atlas group references undeclared language '{0}'")]
    UnknownGroupLanguage(String),
}

/// One remote spreadsheet document and its canonical export path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Document name; doubles as the runtime table name.
    pub name: String,
    /// Opaque id handed to the fetch adapter.
    pub remote_id: String,
    /// Where the canonical tab-separated table is written.
    pub canonical_path: PathBuf,
}

/// Glyph render mode for a language's font import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    #[default]
    Smooth,
    Hinted,
    Mono,
}

/// Per-language import record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub name: String,
    /// BCP-47-style culture id, e.g. "en-US".
    pub culture: String,
    #[serde(default)]
    pub render_mode: RenderMode,
    /// Glyph padding in pixels inside the atlas.
    #[serde(default = "default_padding")]
    pub padding: u32,
}

fn default_padding() -> u32 {
    2
}

/// Languages sharing one font asset, generated as one atlas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtlasGroupConfig {
    /// Path to the primary font file for this group.
    pub font: PathBuf,
    pub languages: Vec<String>,
}

/// Optional atlas sub-pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AtlasConfig {
    #[serde(default = "default_min_font_size")]
    pub min_font_size: u32,
    /// Ordered fallback font chain, tried at a fixed size.
    #[serde(default)]
    pub fallback_fonts: Vec<PathBuf>,
    #[serde(default = "default_fallback_font_size")]
    pub fallback_font_size: u32,
    #[serde(default)]
    pub groups: Vec<AtlasGroupConfig>,
}

fn default_min_font_size() -> u32 {
    12
}

fn default_fallback_font_size() -> u32 {
    32
}

/// Root configuration record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocConfig {
    /// Name of the master document (owns the empty-string sentinel).
    pub master: String,
    /// Header column where language names begin (identifier is column 0).
    #[serde(default = "default_start_column")]
    pub start_language_column: usize,
    /// Where the regenerated identifier module is written.
    pub generated_module_path: PathBuf,
    pub documents: Vec<DocumentConfig>,
    pub languages: Vec<LanguageConfig>,
    #[serde(default)]
    pub atlas: AtlasConfig,
}

fn default_start_column() -> usize {
    1
}

impl LocConfig {
    /// Parse and validate configuration text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: LocConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a `loc.toml` file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        // Unrecognized culture ids are a data-integrity error, caught at
        // load time rather than halfway through a run.
        let culture = Regex::new(r"^[a-z]{2,3}(-[A-Za-z]{2,4})?$").unwrap();
        for language in &self.languages {
            if !culture.is_match(&language.culture) {
                return Err(ConfigError::InvalidCulture {
                    language: language.name.clone(),
                    culture: language.culture.clone(),
                });
            }
        }

        if !self.documents.iter().any(|d| d.name == self.master) {
            return Err(ConfigError::UnknownMaster(self.master.clone()));
        }

        for group in &self.atlas.groups {
            for name in &group.languages {
                if !self.languages.iter().any(|l| l.name.eq_ignore_ascii_case(name)) {
                    return Err(ConfigError::UnknownGroupLanguage(name.clone()));
                }
            }
        }

        Ok(())
    }

    /// Declared language names in declaration order.
    pub fn language_names(&self) -> Vec<String> {
        self.languages.iter().map(|l| l.name.clone()).collect()
    }

    /// The master document record.
    pub fn master_document(&self) -> &DocumentConfig {
        // validate() guarantees presence.
        self.documents
            .iter()
            .find(|d| d.name == self.master)
            .expect("validated master document")
    }

    /// Largest padding among the group's languages, used when packing.
    pub fn group_padding(&self, group: &AtlasGroupConfig) -> u32 {
        group
            .languages
            .iter()
            .filter_map(|name| {
                self.languages
                    .iter()
                    .find(|l| l.name.eq_ignore_ascii_case(name))
                    .map(|l| l.padding)
            })
            .max()
            .unwrap_or(default_padding())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
master = "master"
generated_module_path = "src/generated_ids.rs"

[[documents]]
name = "master"
remote_id = "doc-123"
canonical_path = "loc/master.tsv"

[[documents]]
name = "quests"
remote_id = "doc-456"
canonical_path = "loc/quests.tsv"

[[languages]]
name = "English"
culture = "en-US"

[[languages]]
name = "Spanish"
culture = "es-ES"
render_mode = "hinted"
padding = 4

[atlas]
min_font_size = 16
fallback_fonts = ["fonts/everything.ttf"]

[[atlas.groups]]
font = "fonts/latin.ttf"
languages = ["English", "Spanish"]
"#;

    #[test]
    fn test_parse_sample() {
        let config = LocConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.master, "master");
        assert_eq!(config.start_language_column, 1);
        assert_eq!(config.documents.len(), 2);
        assert_eq!(config.language_names(), vec!["English", "Spanish"]);
        assert_eq!(config.languages[0].padding, 2);
        assert_eq!(config.languages[1].render_mode, RenderMode::Hinted);
        assert_eq!(config.atlas.min_font_size, 16);
        assert_eq!(config.atlas.groups.len(), 1);
        assert_eq!(config.master_document().remote_id, "doc-123");
    }

    #[test]
    fn test_invalid_culture_rejected() {
        let text = SAMPLE.replace("es-ES", "not a culture");
        let err = LocConfig::parse(&text).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCulture { .. }));
    }

    #[test]
    fn test_unknown_master_rejected() {
        let text = SAMPLE.replace("master = \"master\"", "master = \"nope\"");
        let err = LocConfig::parse(&text).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownMaster(_)));
    }

    #[test]
    fn test_group_with_undeclared_language_rejected() {
        let text = SAMPLE.replace(
            "languages = [\"English\", \"Spanish\"]",
            "languages = [\"Klingon\"]",
        );
        let err = LocConfig::parse(&text).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownGroupLanguage(_)));
    }

    #[test]
    fn test_group_padding_takes_max() {
        let config = LocConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.group_padding(&config.atlas.groups[0]), 4);
    }
}
