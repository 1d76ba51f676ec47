//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /api/auth/signup` - Create an account (alias: `/api/auth/register`)
/// - `POST /api/auth/login` - Authenticate with email/password
/// - `POST /api/auth/logout` - Clear the token cookie
/// - `GET /api/auth/check` - Report whether the caller is authenticated
pub fn auth_routes() -> Router {
    Router::new()
        .route("/api/auth/signup", post(handlers::signup))
        .route("/api/auth/register", post(handlers::signup))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/logout", post(handlers::logout))
        .route("/api/auth/check", get(handlers::check_auth))
}
