//! Error handling for the generator library.
//!
//! Fatal problems (bad configuration, unreadable input, template failures) are
//! reported through [`Error`]. Problems local to one schema or operation are
//! never errors: they are recorded as issues in
//! [`Diagnostics`](crate::diagnostics::Diagnostics) and generation carries on.

use thiserror::Error;

use crate::pipeline::GenerationOutput;

/// Result type for generator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for generator operations
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid caller configuration, raised before any generation work
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// The input document could not be turned into a document model
    #[error("OpenAPI error: {0}")]
    OpenApi(String),

    /// Template engine error
    #[error("Template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// Strict mode found Warning-or-worse issues. The produced artifacts and
    /// the full issue list are kept so callers can still inspect them.
    #[error("strict mode: {} issue(s) at warning level or above", .0.blocking_issue_count())]
    Strict(Box<GenerationOutput>),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new OpenAPI error
    pub fn openapi<S: Into<String>>(msg: S) -> Self {
        Self::OpenApi(msg.into())
    }

    /// The generation output carried by a strict-mode failure, if any.
    pub fn output(&self) -> Option<&GenerationOutput> {
        match self {
            Self::Strict(output) => Some(output),
            _ => None,
        }
    }
}
