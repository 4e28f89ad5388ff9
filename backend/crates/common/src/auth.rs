use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::User;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Body returned by sign-up and sign-in.
///
/// Older clients read `token`, newer ones read `access_token`; the server
/// fills both and the console accepts either.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: User,
}

impl AuthResponse {
    pub fn new(token: String, user: User) -> Self {
        Self {
            token: Some(token.clone()),
            access_token: Some(token),
            token_type: default_token_type(),
            user,
        }
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.access_token
            .as_deref()
            .or(self.token.as_deref())
            .filter(|t| !t.is_empty())
    }
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// JSON error body: `{"error": "...", "code": "..."}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Closed set of authentication failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthErrorKind {
    InvalidCredentials,
    DuplicateAccount,
    WeakPassword,
    InvalidEmail,
    EmailNotConfirmed,
    /// Anything that could not be classified; carries the raw message.
    Other(String),
}

impl AuthErrorKind {
    pub fn code(&self) -> Option<&'static str> {
        match self {
            AuthErrorKind::InvalidCredentials => Some("invalid_credentials"),
            AuthErrorKind::DuplicateAccount => Some("user_already_exists"),
            AuthErrorKind::WeakPassword => Some("weak_password"),
            AuthErrorKind::InvalidEmail => Some("invalid_email"),
            AuthErrorKind::EmailNotConfirmed => Some("email_not_confirmed"),
            AuthErrorKind::Other(_) => None,
        }
    }

    /// Maps a structured error code to a kind. Accepts the codes emitted by
    /// the PromeConfig server and the ones used by the hosted auth service.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "invalid_credentials" | "invalid_grant" => Some(AuthErrorKind::InvalidCredentials),
            "user_already_exists" | "email_exists" => Some(AuthErrorKind::DuplicateAccount),
            "weak_password" => Some(AuthErrorKind::WeakPassword),
            "invalid_email" | "email_address_invalid" => Some(AuthErrorKind::InvalidEmail),
            "email_not_confirmed" => Some(AuthErrorKind::EmailNotConfirmed),
            _ => None,
        }
    }

    /// Substring heuristic for backends that only return free text.
    /// Matching is case-sensitive: "Invalid email or password" is a
    /// credential failure, not an address problem.
    pub fn from_message(message: &str) -> Self {
        if message.contains("Invalid login credentials") || message.contains("invalid credentials") {
            AuthErrorKind::InvalidCredentials
        } else if message.contains("user already exists") {
            AuthErrorKind::DuplicateAccount
        } else if message.contains("Password should be at least") {
            AuthErrorKind::WeakPassword
        } else if message.contains("invalid email") {
            AuthErrorKind::InvalidEmail
        } else if message.contains("Email not confirmed") {
            AuthErrorKind::EmailNotConfirmed
        } else {
            AuthErrorKind::Other(message.to_string())
        }
    }

    pub fn classify(code: Option<&str>, message: &str) -> Self {
        code.and_then(Self::from_code)
            .unwrap_or_else(|| Self::from_message(message))
    }
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthErrorKind::Other(msg) => f.write_str(msg),
            kind => f.write_str(kind.code().unwrap_or("auth_error")),
        }
    }
}
