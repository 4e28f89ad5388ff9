use promeconfig_common::validation::MIN_PASSWORD_LEN;
use promeconfig_common::AuthErrorKind;

use crate::error::ConsoleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
}

#[derive(Debug, Clone, Default)]
pub struct AuthForm {
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
    pub error: Option<String>,
}

impl AuthForm {
    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::SignIn => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::SignIn,
        };
        self.error = None;
    }

    pub fn submit_label(&self) -> &'static str {
        match self.mode {
            AuthMode::SignIn => "Sign In",
            AuthMode::SignUp => "Create Account",
        }
    }

    /// Records a failed attempt; the password is cleared, the email kept.
    pub fn fail(&mut self, err: &ConsoleError) {
        self.password.clear();
        self.error = Some(error_message(err));
    }
}

pub fn auth_error_message(kind: &AuthErrorKind) -> String {
    match kind {
        AuthErrorKind::InvalidCredentials => {
            "Invalid email or password. Please check your credentials and try again.".to_string()
        }
        AuthErrorKind::DuplicateAccount => {
            "An account with this email already exists. Please sign in instead.".to_string()
        }
        AuthErrorKind::WeakPassword => {
            format!("Password must be at least {MIN_PASSWORD_LEN} characters long.")
        }
        AuthErrorKind::InvalidEmail => "Please enter a valid email address.".to_string(),
        AuthErrorKind::EmailNotConfirmed => {
            "Please confirm your email address, then sign in.".to_string()
        }
        AuthErrorKind::Other(msg) if !msg.trim().is_empty() => msg.clone(),
        AuthErrorKind::Other(_) => "An error occurred during authentication.".to_string(),
    }
}

/// The one place errors become user-facing text.
pub fn error_message(err: &ConsoleError) -> String {
    match err {
        ConsoleError::Auth(kind) => auth_error_message(kind),
        ConsoleError::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
        ConsoleError::Transport(e) if e.is_timeout() => "The server did not answer in time.".to_string(),
        ConsoleError::Transport(_) => "Could not reach the server.".to_string(),
        other => other.to_string(),
    }
}
