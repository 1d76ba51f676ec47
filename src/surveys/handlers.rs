// src/surveys/handlers.rs

use axum::{
    extract::{Extension, Path},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::auth::extractors::{AuthedUser, MaybeUser};
use crate::common::{
    generate_question_id, generate_survey_id, is_well_formed_id, ApiError, AppState, EntityPrefix,
    Validator,
};
use crate::surveys::models::*;
use crate::surveys::validators::SurveyValidator;

const DEFAULT_EXPIRATION_MESSAGE: &str = "This survey is no longer accepting responses.";

/// Questions get stable server-assigned ids on creation; ids supplied by the
/// client (from a previous read) are preserved so answers keep resolving
fn assign_question_ids(questions: &mut [Question]) {
    for question in questions.iter_mut() {
        if question.id.is_none() {
            question.id = Some(generate_question_id());
        }
    }
}

async fn fetch_owned_survey(
    state: &AppState,
    survey_id: &str,
    user_id: &str,
) -> Result<Option<Survey>, ApiError> {
    sqlx::query_as::<_, Survey>("SELECT * FROM surveys WHERE id = ? AND user_id = ?")
        .bind(survey_id)
        .bind(user_id)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::DatabaseError)
}

/// POST /api/surveys - Create a survey owned by the caller
pub async fn create_survey(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(mut payload): Json<CreateSurvey>,
) -> Result<impl IntoResponse, ApiError> {
    let validation = SurveyValidator.validate(&payload);
    if !validation.is_valid {
        return Err(validation.into());
    }

    let state = state_lock.read().await.clone();

    // Explicitly null expiration date: force a clean expiry state so a stale
    // expiresAt from a previous edit cannot leak in
    let mut expires_at = payload.expires_at;
    if payload.expiration_date == Some(None) {
        expires_at = None;
    }
    let expiration_date = payload.expiration_date.flatten();

    assign_question_ids(&mut payload.questions);

    let questions_json = serde_json::to_string(&payload.questions)
        .map_err(|e| ApiError::InternalServer(format!("Failed to encode questions: {}", e)))?;
    let theme_json = match &payload.theme {
        Some(theme) => Some(
            serde_json::to_string(theme)
                .map_err(|e| ApiError::InternalServer(format!("Failed to encode theme: {}", e)))?,
        ),
        None => None,
    };

    let survey_id = generate_survey_id();
    let expiration_action = payload
        .expiration_action
        .unwrap_or(ExpirationAction::ShowMessage);

    sqlx::query(
        r#"
        INSERT INTO surveys (
            id, user_id, title, description, questions, theme, logo,
            active, prevent_duplicates, require_auth,
            expiration_date, expires_at, is_expired,
            expiration_action, expiration_message, redirect_url
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
        "#,
    )
    .bind(&survey_id)
    .bind(&authed.id)
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(&questions_json)
    .bind(&theme_json)
    .bind(&payload.logo)
    .bind(payload.active.unwrap_or(true) as i64)
    .bind(payload.prevent_duplicates.unwrap_or(false) as i64)
    .bind(payload.require_auth.unwrap_or(false) as i64)
    .bind(expiration_date.map(|d| d.to_rfc3339()))
    .bind(expires_at.map(|d| d.to_rfc3339()))
    .bind(expiration_action.as_str())
    .bind(
        payload
            .expiration_message
            .unwrap_or_else(|| DEFAULT_EXPIRATION_MESSAGE.to_string()),
    )
    .bind(payload.redirect_url.unwrap_or_default())
    .execute(&state.db)
    .await
    .map_err(ApiError::DatabaseError)?;

    let survey = sqlx::query_as::<_, Survey>("SELECT * FROM surveys WHERE id = ?")
        .bind(&survey_id)
        .fetch_one(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    info!(
        survey_id = %survey_id,
        user_id = %authed.id,
        question_count = payload.questions.len(),
        "Survey created"
    );

    Ok((StatusCode::CREATED, Json(SurveyView::from(survey))))
}

/// GET /api/surveys - List the caller's surveys, most recent first, each
/// annotated with its current response count
pub async fn list_surveys(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<Vec<SurveyWithCount>>, ApiError> {
    let state = state_lock.read().await.clone();

    let surveys = sqlx::query_as::<_, Survey>(
        "SELECT * FROM surveys WHERE user_id = ? ORDER BY created_at DESC",
    )
    .bind(&authed.id)
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::DatabaseError)?;

    // The count is a derived aggregate, never stored on the survey
    let mut annotated = Vec::with_capacity(surveys.len());
    for survey in surveys {
        let response_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM responses WHERE survey_id = ?")
                .bind(&survey.id)
                .fetch_one(&state.db)
                .await
                .map_err(ApiError::DatabaseError)?;
        annotated.push(SurveyWithCount {
            survey: SurveyView::from(survey),
            response_count,
        });
    }

    debug!(
        user_id = %authed.id,
        survey_count = annotated.len(),
        "Listed owner surveys"
    );

    Ok(Json(annotated))
}

/// GET /api/surveys/:id - Owner view of a single survey.
/// An ownership mismatch is indistinguishable from non-existence.
pub async fn get_survey(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(survey_id): Path<String>,
) -> Result<Json<SurveyView>, ApiError> {
    let state = state_lock.read().await.clone();

    let survey = fetch_owned_survey(&state, &survey_id, &authed.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Survey not found".to_string()))?;

    Ok(Json(SurveyView::from(survey)))
}

/// GET /api/surveys/public/:id - Public view for survey takers.
///
/// Enforces, in order: well-formed id, existence, active flag, expiration
/// (expiresAt before the legacy expirationDate), and requireAuth. All
/// responses carry cache-disabling headers.
pub async fn get_public_survey(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    MaybeUser(identity): MaybeUser,
    Path(survey_id): Path<String>,
) -> Response {
    let result = public_survey_inner(state_lock, identity, survey_id).await;
    let mut response = match result {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };

    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));

    response
}

async fn public_survey_inner(
    state_lock: Arc<RwLock<AppState>>,
    identity: Option<AuthedUser>,
    survey_id: String,
) -> Result<Response, ApiError> {
    // Reject garbage ids before touching the store
    if !is_well_formed_id(EntityPrefix::Survey, &survey_id) {
        return Err(ApiError::BadRequest("Invalid survey ID".to_string()));
    }

    let state = state_lock.read().await.clone();

    let survey = sqlx::query_as::<_, Survey>("SELECT * FROM surveys WHERE id = ?")
        .bind(&survey_id)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?
        .ok_or_else(|| ApiError::NotFound("Survey not found".to_string()))?;

    if survey.active == 0 {
        return Err(ApiError::BadRequest("Survey is not active".to_string()));
    }

    match survey.expiry_status(Utc::now()) {
        ExpiryStatus::Expired {
            expires_at,
            needs_cache_write,
        } => {
            // First crossing of the threshold persists the cached flag;
            // repeated reads after that skip the write
            if needs_cache_write {
                sqlx::query("UPDATE surveys SET is_expired = 1 WHERE id = ?")
                    .bind(&survey.id)
                    .execute(&state.db)
                    .await
                    .map_err(ApiError::DatabaseError)?;
                info!(survey_id = %survey.id, "Survey marked as expired");
            }

            return Ok((
                StatusCode::GONE,
                Json(serde_json::json!({
                    "msg": "Survey has expired",
                    "expired": true,
                    "expirationAction": survey.expiration_action,
                    "expirationMessage": survey.expiration_message,
                    "redirectUrl": survey.redirect_url,
                    "expiresAt": expires_at,
                })),
            )
                .into_response());
        }
        ExpiryStatus::ExpiredLegacy { expiration_date } => {
            // Narrower legacy payload: just the date, no action metadata
            return Ok((
                StatusCode::GONE,
                Json(serde_json::json!({
                    "msg": "Survey has expired",
                    "expired": true,
                    "expirationDate": expiration_date,
                })),
            )
                .into_response());
        }
        ExpiryStatus::Open => {}
    }

    // Lazy reconciliation: expiration fields were cleared while the cached
    // flag stayed set
    let mut survey = survey;
    if survey.needs_expiry_cache_clear() {
        sqlx::query("UPDATE surveys SET is_expired = 0 WHERE id = ?")
            .bind(&survey.id)
            .execute(&state.db)
            .await
            .map_err(ApiError::DatabaseError)?;
        survey.is_expired = 0;
        debug!(survey_id = %survey.id, "Cleared stale expired flag");
    }

    if survey.require_auth == 1 && identity.is_none() {
        return Err(ApiError::Unauthorized(
            "Authentication required to access this survey".to_string(),
        ));
    }

    Ok(Json(SurveyView::from(survey)).into_response())
}

/// PUT /api/surveys/:id - Partial update, owner only
pub async fn update_survey(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(survey_id): Path<String>,
    Json(mut payload): Json<UpdateSurvey>,
) -> Result<Json<SurveyView>, ApiError> {
    let validation = SurveyValidator.validate(&payload);
    if !validation.is_valid {
        return Err(validation.into());
    }

    let state = state_lock.read().await.clone();

    // Ownership is re-checked per request, never cached
    let mut survey = fetch_owned_survey(&state, &survey_id, &authed.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Survey not found".to_string()))?;

    if let Some(title) = payload.title {
        survey.title = title;
    }
    if let Some(description) = payload.description {
        survey.description = Some(description);
    }
    if let Some(questions) = payload.questions.as_mut() {
        assign_question_ids(questions);
        survey.questions = serde_json::to_string(questions)
            .map_err(|e| ApiError::InternalServer(format!("Failed to encode questions: {}", e)))?;
    }
    if let Some(theme) = payload.theme {
        survey.theme = Some(
            serde_json::to_string(&theme)
                .map_err(|e| ApiError::InternalServer(format!("Failed to encode theme: {}", e)))?,
        );
    }
    if let Some(logo) = payload.logo {
        survey.logo = Some(logo);
    }
    if let Some(active) = payload.active {
        survey.active = active as i64;
    }
    if let Some(prevent_duplicates) = payload.prevent_duplicates {
        survey.prevent_duplicates = prevent_duplicates as i64;
    }
    if let Some(require_auth) = payload.require_auth {
        survey.require_auth = require_auth as i64;
    }
    if let Some(expiration_action) = payload.expiration_action {
        survey.expiration_action = expiration_action.as_str().to_string();
    }
    if let Some(expiration_message) = payload.expiration_message {
        survey.expiration_message = Some(expiration_message);
    }
    if let Some(redirect_url) = payload.redirect_url {
        survey.redirect_url = Some(redirect_url);
    }
    if let Some(expires_at) = payload.expires_at {
        survey.expires_at = expires_at.map(|d| d.to_rfc3339());
    }
    if let Some(expiration_date) = payload.expiration_date {
        survey.expiration_date = expiration_date.map(|d| d.to_rfc3339());
        // Explicitly clearing the expiration also clears the cached expired
        // flag and the newer expiresAt field
        if expiration_date.is_none() {
            survey.is_expired = 0;
            survey.expires_at = None;
        }
    }

    sqlx::query(
        r#"
        UPDATE surveys SET
            title = ?, description = ?, questions = ?, theme = ?, logo = ?,
            active = ?, prevent_duplicates = ?, require_auth = ?,
            expiration_date = ?, expires_at = ?, is_expired = ?,
            expiration_action = ?, expiration_message = ?, redirect_url = ?,
            updated_at = datetime('now')
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(&survey.title)
    .bind(&survey.description)
    .bind(&survey.questions)
    .bind(&survey.theme)
    .bind(&survey.logo)
    .bind(survey.active)
    .bind(survey.prevent_duplicates)
    .bind(survey.require_auth)
    .bind(&survey.expiration_date)
    .bind(&survey.expires_at)
    .bind(survey.is_expired)
    .bind(&survey.expiration_action)
    .bind(&survey.expiration_message)
    .bind(&survey.redirect_url)
    .bind(&survey.id)
    .bind(&authed.id)
    .execute(&state.db)
    .await
    .map_err(ApiError::DatabaseError)?;

    let updated = sqlx::query_as::<_, Survey>("SELECT * FROM surveys WHERE id = ?")
        .bind(&survey.id)
        .fetch_one(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    info!(survey_id = %survey.id, user_id = %authed.id, "Survey updated");

    Ok(Json(SurveyView::from(updated)))
}

/// DELETE /api/surveys/:id - Owner only. Existing responses are left in
/// place; there is no cascade.
pub async fn delete_survey(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(survey_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    let result = sqlx::query("DELETE FROM surveys WHERE id = ? AND user_id = ?")
        .bind(&survey_id)
        .bind(&authed.id)
        .execute(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    if result.rows_affected() == 0 {
        warn!(
            survey_id = %survey_id,
            user_id = %authed.id,
            "Survey delete refused: not found or not owned by caller"
        );
        return Err(ApiError::NotFound("Survey not found".to_string()));
    }

    info!(survey_id = %survey_id, user_id = %authed.id, "Survey deleted");

    Ok(Json(serde_json::json!({
        "msg": "Survey deleted successfully"
    })))
}
