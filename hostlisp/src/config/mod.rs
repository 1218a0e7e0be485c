//! Configuration types and parsing for the analyzer
//!
//! Every field has a default, so an empty TOML document yields the stock
//! configuration:
//!
//! ```toml
//! core-namespace = "core"
//! default-namespace = "user"
//! allow-redefinition = false
//! extra-reserved-words = []
//! ```

pub mod reserved_words;

use serde::{Deserialize, Serialize};
use std::path::Path;

pub use reserved_words::is_platform_reserved;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read analyzer config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid analyzer config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AnalyzerConfig {
    /// Namespace searched last when resolving unqualified symbols.
    pub core_namespace: String,
    /// Namespace active before the first `ns`/`in-ns` form.
    pub default_namespace: String,
    /// Whether `def` may replace an existing definition.
    pub allow_redefinition: bool,
    /// Additional words rejected as namespace segments.
    pub extra_reserved_words: Vec<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            core_namespace: "core".to_string(),
            default_namespace: "user".to_string(),
            allow_redefinition: false,
            extra_reserved_words: Vec::new(),
        }
    }
}

impl AnalyzerConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn is_reserved_word(&self, word: &str) -> bool {
        is_platform_reserved(word)
            || self
                .extra_reserved_words
                .iter()
                .any(|extra| extra.eq_ignore_ascii_case(word))
    }
}
