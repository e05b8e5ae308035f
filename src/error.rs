//! Error types for the form engine

use thiserror::Error;

/// Result type for form operations
pub type Result<T> = std::result::Result<T, FormError>;

/// Form engine errors
///
/// Rule violations are not errors: they are recorded in the form state and
/// surfaced per field. These variants cover the boundaries around that core.
#[derive(Error, Debug)]
pub enum FormError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Form definition rejected with {count} lint error(s): {summary}")]
    Lint { count: usize, summary: String },

    #[error("Submit handler failed: {0}")]
    Submission(#[source] anyhow::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}
