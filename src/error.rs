//! Error types for the classifier crate.

use thiserror::Error;

use crate::store::Category;

pub type Result<T> = std::result::Result<T, ClassifierError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifierError {
    /// The backing store failed or could not be reached.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A stored rule pattern could not be compiled while building the shared dataset.
    #[error("Invalid {category} pattern for rule {rule_id}: {pattern} ({message})")]
    InvalidPattern {
        category: Category,
        rule_id: i64,
        pattern: String,
        message: String,
    },

    /// An ad-hoc pattern (device brand or client hints list) failed to compile.
    #[error("Invalid regex pattern: {0}")]
    InvalidRegex(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("YAML parsing error: {0}")]
    Yaml(String),

    #[error("JSON parsing error: {0}")]
    Json(String),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(&'static str),
}

impl From<std::io::Error> for ClassifierError {
    fn from(err: std::io::Error) -> Self {
        ClassifierError::Io(err.to_string())
    }
}

impl From<serde_yaml::Error> for ClassifierError {
    fn from(err: serde_yaml::Error) -> Self {
        ClassifierError::Yaml(err.to_string())
    }
}

impl From<serde_json::Error> for ClassifierError {
    fn from(err: serde_json::Error) -> Self {
        ClassifierError::Json(err.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for ClassifierError {
    fn from(err: rusqlite::Error) -> Self {
        ClassifierError::Storage(err.to_string())
    }
}
