use serde_json::{json, Value};
use thiserror::Error;

/// Application-level error type.
/// The scoring core is total; these variants come from the boundaries around it.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Raised by `ResumeModel` implementations; the bundled model never fails.
    #[allow(dead_code)]
    #[error("Model error: {0}")]
    Model(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code for the error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::Extraction(_) => "EXTRACTION_ERROR",
            AppError::Model(_) => "MODEL_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Renders the error as `{"error": {"code": ..., "message": ...}}`.
    /// Internal errors are logged in full and reported generically.
    pub fn to_body(&self) -> Value {
        let message = match self {
            AppError::InvalidInput(msg)
            | AppError::Extraction(msg)
            | AppError::Model(msg)
            | AppError::Config(msg) => msg.clone(),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An internal error occurred".to_string()
            }
        };

        json!({
            "error": {
                "code": self.code(),
                "message": message
            }
        })
    }
}
