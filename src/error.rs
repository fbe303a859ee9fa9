//! Error types for loading inventories, compiling rules and reading run
//! configuration.
//!
//! Everything here is raised before the first word is derived: once a
//! [`RuleBook`](crate::RuleBook) exists, applying it cannot fail.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShiftError {
    /// Malformed rule text, including target/output length mismatches.
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax { line: usize, column: usize, message: String },

    /// A symbol that is not part of the declared alphabet.
    #[error("unknown symbol '{0}'")]
    UnknownSymbol(String),

    /// A bundle names a feature that is not in the feature table header.
    #[error("unknown feature '{name}' at line {line}")]
    UnknownFeature { name: String, line: usize },

    /// An operation needed active sounds before any were added.
    #[error("no active sounds; add sounds before rules that select by feature")]
    EmptyActiveSet,

    /// No active sound satisfies the requested feature values.
    #[error("no active variant of '{source_symbol}' satisfies {changes}")]
    NoMatchingVariant { source_symbol: String, changes: String },

    /// A malformed feature table, category table or active-sound list.
    #[error("table error at line {line}: {message}")]
    Table { line: usize, message: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ShiftError {
    pub(crate) fn syntax(line: usize, column: usize, message: impl Into<String>) -> Self {
        ShiftError::Syntax { line, column, message: message.into() }
    }

    pub(crate) fn table(line: usize, message: impl Into<String>) -> Self {
        ShiftError::Table { line, message: message.into() }
    }
}

impl From<toml::de::Error> for ShiftError {
    fn from(err: toml::de::Error) -> Self {
        ShiftError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShiftError>;
