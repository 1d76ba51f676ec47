//! # Auth Module
//!
//! This module handles all authentication-related functionality including:
//! - Account signup and login with argon2-hashed passwords
//! - JWT token generation and validation (7 day validity)
//! - Cookie and Bearer-header token transport
//! - AuthedUser / MaybeUser extractors for protected and public routes

pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;

#[cfg(test)]
mod tests;

pub use extractors::{AuthedUser, MaybeUser};
pub use models::User;
pub use routes::auth_routes;
