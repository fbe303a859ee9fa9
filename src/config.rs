//! Run configuration.
//!
//! A `soundshift.toml` names the input files and the loading options:
//!
//! ```toml
//! features = "features.csv"
//! rules = "changes.txt"
//! categories = "categories.txt"   # optional
//! corpus = "words.txt"            # optional, stdin when absent
//! initial_active = "all"          # "none" (default) or "all"
//! modifier_marker = "^"
//! parallel = true
//! ```
//!
//! Relative paths in a file loaded with [`ShiftConfig::load`] are resolved
//! against the file's directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Result, ShiftError, TableOptions};

/// Which symbols are active before the first rule-file line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialActive {
    /// Every declared symbol.
    All,
    /// Nothing; `add` directives and the active list fill the set.
    #[default]
    None,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct ShiftConfig {
    #[serde(default)]
    pub features: PathBuf,

    #[serde(default)]
    pub rules: PathBuf,

    #[serde(default)]
    pub categories: Option<PathBuf>,

    /// One symbol per line, activated before the rule file runs.
    #[serde(default)]
    pub active: Option<PathBuf>,

    #[serde(default)]
    pub corpus: Option<PathBuf>,

    #[serde(default)]
    pub initial_active: InitialActive,

    #[serde(default)]
    pub modifier_marker: Option<char>,

    #[serde(default)]
    pub delimiter: Option<char>,

    #[serde(default)]
    pub parallel: bool,
}

impl ShiftConfig {
    pub fn new(features: impl Into<PathBuf>, rules: impl Into<PathBuf>) -> Self {
        ShiftConfig { features: features.into(), rules: rules.into(), ..Default::default() }
    }

    /// Load a TOML file, resolving relative paths against its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| ShiftError::Io { path: path.to_path_buf(), source })?;
        let mut config = Self::from_toml_str(&text)?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn with_corpus(mut self, corpus: impl Into<PathBuf>) -> Self {
        self.corpus = Some(corpus.into());
        self
    }

    pub fn with_initial_active(mut self, initial: InitialActive) -> Self {
        self.initial_active = initial;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Feature-table options derived from this configuration.
    pub fn table_options(&self) -> TableOptions {
        let defaults = TableOptions::default();
        TableOptions {
            modifier_marker: self.modifier_marker.unwrap_or(defaults.modifier_marker),
            delimiter: self.delimiter,
        }
    }

    /// Fail unless both required paths are set.
    pub fn validate(&self) -> Result<()> {
        if self.features.as_os_str().is_empty() {
            return Err(ShiftError::Config("missing 'features' path".into()));
        }
        if self.rules.as_os_str().is_empty() {
            return Err(ShiftError::Config("missing 'rules' path".into()));
        }
        if self.modifier_marker.is_some_and(crate::inventory::is_reserved_char) {
            return Err(ShiftError::Config("modifier marker is a reserved character".into()));
        }
        Ok(())
    }

    fn rebase(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() && !p.as_os_str().is_empty() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.features);
        join(&mut self.rules);
        for p in [&mut self.categories, &mut self.active, &mut self.corpus].into_iter().flatten() {
            join(p);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config = ShiftConfig::from_toml_str(
            r#"
            features = "f.csv"
            rules = "r.txt"
            categories = "c.txt"
            initial_active = "all"
            modifier_marker = "~"
            delimiter = ";"
            parallel = true
            "#,
        )
        .unwrap();
        assert_eq!(config.features, PathBuf::from("f.csv"));
        assert_eq!(config.categories, Some(PathBuf::from("c.txt")));
        assert_eq!(config.initial_active, InitialActive::All);
        assert_eq!(config.table_options(), TableOptions { modifier_marker: '~', delimiter: Some(';') });
        assert!(config.parallel);
        config.validate().unwrap();
    }

    #[test]
    fn defaults_apply() {
        let config = ShiftConfig::from_toml_str("features = \"f.csv\"\nrules = \"r.txt\"\n").unwrap();
        assert_eq!(config.initial_active, InitialActive::None);
        assert_eq!(config.table_options(), TableOptions::default());
        assert!(!config.parallel);
        assert_eq!(config.corpus, None);
    }

    #[test]
    fn unknown_keys_and_missing_paths_are_rejected() {
        assert!(matches!(ShiftConfig::from_toml_str("feature = \"x\""), Err(ShiftError::Config(_))));
        let config = ShiftConfig::from_toml_str("rules = \"r.txt\"").unwrap();
        assert!(matches!(config.validate(), Err(ShiftError::Config(msg)) if msg.contains("features")));
        let config = ShiftConfig::new("f", "r");
        assert!(config.validate().is_ok());
        let config = ShiftConfig { modifier_marker: Some('#'), ..config };
        assert!(config.validate().is_err());
    }

    #[test]
    fn relative_paths_follow_the_config_file() {
        let mut config = ShiftConfig::new("f.csv", "/abs/r.txt").with_corpus("words.txt");
        config.rebase(Path::new("lang"));
        assert_eq!(config.features, PathBuf::from("lang/f.csv"));
        assert_eq!(config.rules, PathBuf::from("/abs/r.txt"));
        assert_eq!(config.corpus, Some(PathBuf::from("lang/words.txt")));
    }
}
