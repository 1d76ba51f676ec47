//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use super::handlers::validate_token;
use super::models::User;
use crate::common::{safe_email_log, ApiError, AppState};

/// Pull the identity token out of the request, if any.
///
/// Tokens are accepted from the `token` cookie or a `Bearer` authorization
/// header; the cookie wins when both are present.
pub fn token_from_parts(parts: &Parts) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get("token") {
        return Some(cookie.value().to_string());
    }

    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|t| t.to_string())
}

async fn resolve_user(parts: &Parts, state_lock: &Arc<RwLock<AppState>>) -> Result<User, ApiError> {
    let token = token_from_parts(parts)
        .ok_or_else(|| ApiError::Unauthorized("No token, authorization denied".to_string()))?;

    let state = state_lock.read().await.clone();
    let claims = validate_token(&token, &state.jwt_secret)?;

    let user: Option<User> = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&claims.sub)
        .fetch_optional(&state.db)
        .await
        .map_err(|e| {
            error!(
                error = %e,
                user_id = %claims.sub,
                "Database error during user lookup in authentication"
            );
            ApiError::DatabaseError(e)
        })?;

    match user {
        Some(u) => {
            debug!(
                user_id = %u.id,
                email = %safe_email_log(&u.email),
                "User authentication successful via extractor"
            );
            Ok(u)
        }
        None => {
            warn!(user_id = %claims.sub, "Authentication failed: user not found in database");
            Err(ApiError::Unauthorized("Token is not valid".to_string()))
        }
    }
}

/// Authenticated user extractor (mandatory auth gate)
///
/// Validates the JWT token and loads the user record from the database.
/// Requests without a valid token short-circuit with 401 and never reach
/// the handler.
#[derive(Debug)]
pub struct AuthedUser {
    pub id: String,
    pub email: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(state_lock): Extension<Arc<RwLock<AppState>>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let user = resolve_user(parts, &state_lock).await?;
        Ok(AuthedUser {
            id: user.id,
            email: user.email,
        })
    }
}

/// Optional auth gate: attaches the identity when a valid token is present,
/// continues without one otherwise. Used on endpoints that are public by
/// default but behave differently for a known identity (public survey reads,
/// response submission).
#[derive(Debug)]
pub struct MaybeUser(pub Option<AuthedUser>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(state_lock): Extension<Arc<RwLock<AppState>>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        match resolve_user(parts, &state_lock).await {
            Ok(user) => Ok(MaybeUser(Some(AuthedUser {
                id: user.id,
                email: user.email,
            }))),
            // Absence or invalidity of the token is not an error here
            Err(_) => Ok(MaybeUser(None)),
        }
    }
}
