//! Authentication data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// JWT claims structure
#[derive(Serialize, Deserialize, Debug)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// User database model
#[derive(FromRow, Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: Option<String>,
}

/// User fields safe to return to clients (never the password hash)
#[derive(Serialize, Debug)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            id: user.id.clone(),
            email: user.email.clone(),
        }
    }
}

/// Signup / login request body
#[derive(Deserialize)]
pub struct CredentialsPayload {
    pub email: String,
    pub password: String,
}
