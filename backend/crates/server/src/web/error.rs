use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use promeconfig_common::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("user already exists: {0}")]
    UserAlreadyExists(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Password hashing failed: {0}")]
    PasswordHashingError(String),
    #[error("JWT creation failed: {0}")]
    TokenCreationError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::UserAlreadyExists(_) => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PasswordHashingError(_)
            | AppError::TokenCreationError(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code sent next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(ValidationError::InvalidEmail) => "invalid_email",
            AppError::Validation(ValidationError::WeakPassword(_)) => "weak_password",
            AppError::Validation(_) => "validation_failed",
            AppError::UserAlreadyExists(_) => "user_already_exists",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::NotFound(_) => "not_found",
            AppError::PasswordHashingError(_)
            | AppError::TokenCreationError(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let error_message = match &self {
            AppError::NotFound(msg) | AppError::Unauthorized(msg) => msg.clone(),
            AppError::UserAlreadyExists(_) => "user already exists".to_string(),
            AppError::InvalidCredentials => "invalid credentials".to_string(),
            AppError::Validation(e) => e.to_string(),
            // Internal details stay in the log.
            other => {
                tracing::error!(error = %other, "Request failed with an internal error.");
                "internal server error".to_string()
            }
        };
        (status, Json(serde_json::json!({ "error": error_message, "code": code }))).into_response()
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalServerError(format!("JSON serialization/deserialization error: {err}"))
    }
}
