use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;

/// File name of the project configuration.
pub const CONFIG_FILE: &str = ".fragmentum.toml";

/// Generation and storage settings loaded from `.fragmentum.toml`.
/// Every key is optional; absent keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Words of prefix/suffix context attached per side.
    pub context_words: usize,
    /// Wall-clock budget for one expansion loop.
    pub generation_timeout: Duration,
    /// Normalized selections longer than this many chars use a range pattern.
    pub long_selection_threshold: usize,
    /// Stored display text is cut to this many chars plus `...`.
    pub max_display_text_length: usize,
    /// Upper bound on expansion iterations, at least 1.
    pub max_expansion_iterations: usize,
    /// Highlight store location, relative to the project root unless absolute.
    pub store: PathBuf,
}

/// Raw TOML structure for `.fragmentum.toml`.
#[derive(serde::Deserialize)]
struct FragmentumTomlConfig {
    /// See [`Config::context_words`].
    context_words: Option<usize>,
    /// Budget in milliseconds.
    generation_timeout_ms: Option<u64>,
    /// See [`Config::long_selection_threshold`].
    long_selection_threshold: Option<usize>,
    /// See [`Config::max_display_text_length`].
    max_display_text_length: Option<usize>,
    /// See [`Config::max_expansion_iterations`].
    max_expansion_iterations: Option<usize>,
    /// See [`Config::store`].
    store: Option<PathBuf>,
}

impl Config {
    /// Load config from `.fragmentum.toml` in the given root directory.
    /// Returns defaults if the file doesn't exist. A file that exists but is
    /// malformed is an error, never silently replaced by defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// `Error::TomlDe` if the TOML is malformed,
    /// or `Error::ConfigInvalid` if a value is out of range.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        return Self::parse(&content);
    }

    /// Parse config from TOML content, filling gaps with defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed,
    /// or `Error::ConfigInvalid` if `max_expansion_iterations` is zero.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let raw: FragmentumTomlConfig = toml::from_str(content)?;
        let defaults = Self::default();

        let max_expansion_iterations = raw.max_expansion_iterations.unwrap_or(defaults.max_expansion_iterations);
        if max_expansion_iterations == 0 {
            return Err(Error::ConfigInvalid {
                key: "max_expansion_iterations".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        return Ok(Self {
            context_words: raw.context_words.unwrap_or(defaults.context_words),
            generation_timeout: raw.generation_timeout_ms.map_or(defaults.generation_timeout, Duration::from_millis),
            long_selection_threshold: raw.long_selection_threshold.unwrap_or(defaults.long_selection_threshold),
            max_display_text_length: raw.max_display_text_length.unwrap_or(defaults.max_display_text_length),
            max_expansion_iterations,
            store: raw.store.unwrap_or(defaults.store),
        });
    }
}

impl Default for Config {
    fn default() -> Self {
        return Self {
            context_words: 3,
            generation_timeout: Duration::from_millis(500),
            long_selection_threshold: 300,
            max_display_text_length: 100,
            max_expansion_iterations: 10,
            store: PathBuf::from(".fragmentum-highlights.toml"),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::parse("context_words = 5\ngeneration_timeout_ms = 50\n").unwrap();
        assert_eq!(config.context_words, 5);
        assert_eq!(config.generation_timeout, Duration::from_millis(50));
        assert_eq!(config.long_selection_threshold, 300);
        assert_eq!(config.store, PathBuf::from(".fragmentum-highlights.toml"));
    }

    #[test]
    fn zero_iterations_is_rejected() {
        let err = Config::parse("max_expansion_iterations = 0").unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { ref key, .. } if key == "max_expansion_iterations"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "context_words = \"three\"").unwrap();
        assert!(matches!(Config::load(dir.path()), Err(Error::TomlDe(_))));
    }
}
