//! Authentication handlers

use argon2::password_hash::rand_core::OsRng;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::extract::{Extension, Json};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::extractors::MaybeUser;
use super::models::{Claims, CredentialsPayload, User, UserSummary};
use crate::common::validation::looks_like_email;
use crate::common::{generate_user_id, safe_email_log, ApiError, AppState, ValidationResult};

/// Identity tokens are valid for 7 days from issuance
const TOKEN_VALIDITY_DAYS: i64 = 7;

/// Issue a signed identity token embedding the user's id
pub fn issue_token(user_id: &str, secret: &str) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now() + Duration::days(TOKEN_VALIDITY_DAYS)).timestamp() as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        error!(error = %e, "Failed to sign identity token");
        ApiError::InternalServer("Failed to issue token".to_string())
    })
}

/// Validate a signed identity token and return its claims.
/// Fails on bad signature, malformed token, or elapsed expiry.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        warn!(error = %e, "JWT token validation failed");
        ApiError::Unauthorized("Token is not valid".to_string())
    })
}

fn token_cookie(token: String) -> Cookie<'static> {
    Cookie::build(("token", token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::days(TOKEN_VALIDITY_DAYS))
        .build()
}

fn validate_credentials(payload: &CredentialsPayload, check_password_length: bool) -> ValidationResult {
    let mut result = ValidationResult::new();

    if !looks_like_email(&payload.email) {
        result.add_error("email", "Please provide a valid email");
    }
    if check_password_length {
        if payload.password.len() < 6 {
            result.add_error("password", "Password must be at least 6 characters");
        }
    } else if payload.password.is_empty() {
        result.add_error("password", "Password is required");
    }

    result
}

/// POST /api/auth/signup (also mounted as /api/auth/register)
/// Creates a new account and issues an identity token
///
/// # Response
/// ```json
/// {
///   "msg": "User created successfully",
///   "token": "<jwt token>",
///   "user": { "id": "U_XXXXXX", "email": "..." }
/// }
/// ```
pub async fn signup(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    jar: CookieJar,
    Json(payload): Json<CredentialsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let validation = validate_credentials(&payload, true);
    if !validation.is_valid {
        return Err(validation.into());
    }

    let state = state_lock.read().await.clone();

    let existing: Option<User> = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(&payload.email)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    if existing.is_some() {
        warn!(
            email = %safe_email_log(&payload.email),
            "Signup rejected: email already registered"
        );
        return Err(ApiError::Conflict("User already exists".to_string()));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(payload.password.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "Password hashing failed");
            ApiError::InternalServer("Failed to create user".to_string())
        })?
        .to_string();

    let user_id = generate_user_id();
    sqlx::query("INSERT INTO users (id, email, password_hash) VALUES (?, ?, ?)")
        .bind(&user_id)
        .bind(&payload.email)
        .bind(&password_hash)
        .execute(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    let token = issue_token(&user_id, &state.jwt_secret)?;

    info!(
        user_id = %user_id,
        email = %safe_email_log(&payload.email),
        "User account created"
    );

    let body = serde_json::json!({
        "msg": "User created successfully",
        "token": token,
        "user": { "id": user_id, "email": payload.email },
    });

    Ok((
        StatusCode::CREATED,
        jar.add(token_cookie(token)),
        Json(body),
    ))
}

/// POST /api/auth/login
/// Authenticates with email/password and issues an identity token.
/// Unknown email and wrong password are indistinguishable to the caller.
pub async fn login(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    jar: CookieJar,
    Json(payload): Json<CredentialsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let validation = validate_credentials(&payload, false);
    if !validation.is_valid {
        return Err(validation.into());
    }

    let state = state_lock.read().await.clone();

    let user: Option<User> = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(&payload.email)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    let Some(user) = user else {
        warn!(
            email = %safe_email_log(&payload.email),
            "Login failed: unknown email"
        );
        return Err(ApiError::BadRequest("Invalid credentials".to_string()));
    };

    let parsed_hash = PasswordHash::new(&user.password_hash).map_err(|e| {
        error!(error = %e, user_id = %user.id, "Stored password hash is unreadable");
        ApiError::InternalServer("Login failed".to_string())
    })?;

    if Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        warn!(user_id = %user.id, "Login failed: wrong password");
        return Err(ApiError::BadRequest("Invalid credentials".to_string()));
    }

    let token = issue_token(&user.id, &state.jwt_secret)?;

    info!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        "User logged in"
    );

    let body = serde_json::json!({
        "msg": "Logged in successfully",
        "token": token,
        "user": UserSummary::from(&user),
    });

    Ok((jar.add(token_cookie(token)), Json(body)))
}

/// POST /api/auth/logout
/// Clears the token cookie; Bearer tokens are discarded client-side
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    info!("User logout");
    let removal = Cookie::build("token").path("/").build();
    (
        jar.remove(removal),
        Json(serde_json::json!({ "msg": "Logged out successfully" })),
    )
}

/// GET /api/auth/check
/// Reports whether the caller carries a valid identity
///
/// # Response
/// `{ "authenticated": true, "user": {...} }` or 401 `{ "authenticated": false }`
pub async fn check_auth(MaybeUser(identity): MaybeUser) -> impl IntoResponse {
    match identity {
        Some(authed) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "authenticated": true,
                "user": { "id": authed.id, "email": authed.email },
            })),
        ),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "authenticated": false })),
        ),
    }
}
