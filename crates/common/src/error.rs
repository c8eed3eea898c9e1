//! Error types for Testplan

use thiserror::Error;

use crate::validate::ValidationError;

/// Result type alias using Testplan Error
pub type Result<T> = std::result::Result<T, Error>;

/// Testplan error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid report: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not found: {kind} {id}")]
    NotFound { kind: String, id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Test path '{title}' has {open} open item(s)")]
    Incomplete { title: String, open: usize },

    #[error("Confirmation required: {0}")]
    ConfirmationRequired(String),

    #[error("Missing tester name for: {}", .0.join(", "))]
    MissingTesterNames(Vec<String>),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Export error: {0}")]
    Export(String),
}

impl Error {
    pub(crate) fn not_found(kind: &str, id: impl ToString) -> Self {
        Error::NotFound {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Export(e.to_string())
    }
}
