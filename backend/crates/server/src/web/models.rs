use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The user's email.
    pub sub: String,
    pub user_id: String,
    pub exp: usize,
    #[serde(default)]
    pub iat: usize,
}

/// Inserted into request extensions by the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
}
