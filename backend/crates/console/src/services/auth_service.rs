use promeconfig_common::validation::{validate_email, validate_password, MIN_PASSWORD_LEN};
use promeconfig_common::{AuthErrorKind, Credentials, User, ValidationError};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::backend::Backend;
use crate::error::{ConsoleError, Result};
use crate::session::SessionStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticating,
    Authenticated(User),
}

impl AuthState {
    pub fn user(&self) -> Option<&User> {
        match self {
            AuthState::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// Drives the sign-in state machine on top of a backend and the session
/// store. `Authenticating` doubles as the in-flight flag.
pub struct AuthService {
    backend: Arc<dyn Backend>,
    session: Arc<SessionStore>,
    state: watch::Sender<AuthState>,
}

impl AuthService {
    pub fn new(backend: Arc<dyn Backend>, session: Arc<SessionStore>) -> Self {
        let (state, _rx) = watch::channel(AuthState::Unauthenticated);
        Self { backend, session, state }
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(*self.state.borrow(), AuthState::Authenticated(_))
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    /// Confirms a persisted session with the backend. A rejected token is
    /// dropped; a network failure leaves the file alone but still starts
    /// signed out.
    pub async fn restore(&self) -> AuthState {
        if !self.session.is_authenticated() {
            self.state.send_replace(AuthState::Unauthenticated);
            return AuthState::Unauthenticated;
        }
        let next = match self.backend.current_user().await {
            Ok(user) => AuthState::Authenticated(user),
            Err(ConsoleError::Unauthorized) => {
                info!("Persisted session was rejected, clearing it.");
                if let Err(e) = self.session.clear().await {
                    warn!(error = %e, "Failed to remove rejected session file.");
                }
                AuthState::Unauthenticated
            }
            Err(e) => {
                warn!(error = %e, "Could not confirm persisted session.");
                AuthState::Unauthenticated
            }
        };
        self.state.send_replace(next.clone());
        next
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<User> {
        let credentials = Credentials { email: email.trim().to_string(), password: password.to_string() };
        validate_email(&credentials.email).map_err(auth_validation)?;
        validate_password(&credentials.password, MIN_PASSWORD_LEN).map_err(auth_validation)?;
        let previous = self.begin()?;
        let result = self.backend.sign_up(&credentials).await;
        self.finish(previous, result)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        let credentials = Credentials { email: email.trim().to_string(), password: password.to_string() };
        if credentials.email.is_empty() || credentials.password.is_empty() {
            return Err(ConsoleError::Auth(AuthErrorKind::InvalidCredentials));
        }
        let previous = self.begin()?;
        let result = self.backend.sign_in(&credentials).await;
        self.finish(previous, result)
    }

    /// Always ends signed out, whatever the remote call did.
    pub async fn sign_out(&self) -> Result<()> {
        let result = self.backend.sign_out().await;
        if result.is_err() {
            // The backend could not remove the file; make sure memory is clean.
            if let Err(e) = self.session.clear().await {
                warn!(error = %e, "Failed to clear session after a failed sign-out.");
            }
        }
        self.state.send_replace(AuthState::Unauthenticated);
        result
    }

    /// A resource call came back 401: drop the session, no retry.
    pub async fn handle_unauthorized(&self) {
        if let Err(e) = self.session.clear().await {
            warn!(error = %e, "Failed to clear session after 401.");
        }
        self.state.send_replace(AuthState::Unauthenticated);
    }

    /// The session was cleared elsewhere (another process, a 401 seen by a
    /// different component).
    pub fn session_ended(&self) {
        self.state.send_replace(AuthState::Unauthenticated);
    }

    /// Enters `Authenticating` and hands back the state it replaced.
    fn begin(&self) -> Result<AuthState> {
        let mut previous = None;
        self.state.send_if_modified(|state| {
            if *state == AuthState::Authenticating {
                false
            } else {
                previous = Some(std::mem::replace(state, AuthState::Authenticating));
                true
            }
        });
        previous.ok_or_else(|| {
            ConsoleError::Conflict("an authentication request is already in flight".to_string())
        })
    }

    /// A failed attempt leaves an existing sign-in in place as long as the
    /// stored session still backs it.
    fn finish(&self, previous: AuthState, result: Result<crate::session::Session>) -> Result<User> {
        match result {
            Ok(session) => {
                self.state.send_replace(AuthState::Authenticated(session.user.clone()));
                Ok(session.user)
            }
            Err(e) => {
                let next = match previous {
                    AuthState::Authenticated(user) if self.session.is_authenticated() => {
                        AuthState::Authenticated(user)
                    }
                    _ => AuthState::Unauthenticated,
                };
                self.state.send_replace(next);
                Err(e)
            }
        }
    }
}

fn auth_validation(err: ValidationError) -> ConsoleError {
    match err {
        ValidationError::InvalidEmail => ConsoleError::Auth(AuthErrorKind::InvalidEmail),
        ValidationError::WeakPassword(_) => ConsoleError::Auth(AuthErrorKind::WeakPassword),
        other => ConsoleError::Validation(other),
    }
}
