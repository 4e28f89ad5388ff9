use promeconfig_common::{AuthErrorKind, ValidationError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsoleError {
    /// Rejected locally, nothing was sent.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("authentication failed: {0}")]
    Auth(AuthErrorKind),
    #[error("not signed in or session expired")]
    Unauthorized,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("{message}")]
    Http { status: u16, message: String },
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to render configuration: {0}")]
    Render(#[from] serde_yaml::Error),
    #[error("configuration error: {0}")]
    Config(String),
}

impl ConsoleError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ConsoleError::Unauthorized)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ConsoleError::NotFound(_))
    }
}

pub type Result<T, E = ConsoleError> = std::result::Result<T, E>;
