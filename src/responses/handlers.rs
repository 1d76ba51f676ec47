// src/responses/handlers.rs

use axum::{
    extract::{ConnectInfo, Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::auth::extractors::{AuthedUser, MaybeUser};
use crate::common::{generate_response_id, ApiError, AppState};
use crate::realtime::ServerEvent;
use crate::responses::export::responses_to_csv;
use crate::responses::models::*;
use crate::surveys::models::{Survey, SurveyView};

/// Resolve the submitter's network origin for duplicate detection.
/// Fallback chain: direct peer address, forwarded-for header, then a
/// sentinel so hashing never fails.
fn resolve_origin(connect_info: Option<&ConnectInfo<SocketAddr>>, headers: &HeaderMap) -> String {
    if let Some(info) = connect_info {
        return info.0.ip().to_string();
    }

    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(first_ip) = forwarded_str.split(',').next() {
                return first_ip.trim().to_string();
            }
        }
    }

    "unknown".to_string()
}

/// One-way hash of the submitter's origin; never reversed, never exposed
fn hash_origin(origin: &str) -> String {
    format!("{:x}", Sha256::digest(origin.as_bytes()))
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

/// POST /api/responses - Submit a response to a survey
///
/// Check sequence, each a distinct failure mode: survey exists, survey is
/// active, requireAuth is satisfied, the legacy expiration date has not
/// passed, and the origin has not already submitted when preventDuplicates
/// is set. Only then is the response persisted and the fan-out event
/// emitted.
pub async fn submit_response(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    MaybeUser(identity): MaybeUser,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(payload): Json<SubmitResponse>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();

    let survey = sqlx::query_as::<_, Survey>("SELECT * FROM surveys WHERE id = ?")
        .bind(&payload.survey_id)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?
        .ok_or_else(|| ApiError::NotFound("Survey not found".to_string()))?;

    if survey.active == 0 {
        return Err(ApiError::BadRequest("Survey is not active".to_string()));
    }

    if survey.require_auth == 1 && identity.is_none() {
        return Err(ApiError::Unauthorized(
            "Authentication required to submit this survey".to_string(),
        ));
    }

    // Submission only honors the legacy expirationDate field; the public
    // read path checks both fields with precedence. Kept as-is, not unified.
    if let Some(expiration_date) = survey
        .expiration_date
        .as_deref()
        .and_then(|d| chrono::DateTime::parse_from_rfc3339(d).ok())
    {
        if Utc::now() > expiration_date {
            return Err(ApiError::BadRequest("Survey has expired".to_string()));
        }
    }

    let mut origin_hash: Option<String> = None;
    if survey.prevent_duplicates == 1 {
        let hash = hash_origin(&resolve_origin(connect_info.as_ref(), &headers));

        // Check-then-insert has a race window under concurrent submissions
        // from one origin; accepted weak-consistency trade-off
        let existing: Option<String> = sqlx::query_scalar(
            "SELECT id FROM responses WHERE survey_id = ? AND origin_hash = ? LIMIT 1",
        )
        .bind(&survey.id)
        .bind(&hash)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        if existing.is_some() {
            warn!(survey_id = %survey.id, "Duplicate submission rejected");
            return Err(ApiError::Conflict(
                "You have already submitted a response to this survey".to_string(),
            ));
        }

        origin_hash = Some(hash);
    }

    let answers_json = serde_json::to_string(&payload.answers)
        .map_err(|e| ApiError::InternalServer(format!("Failed to encode answers: {}", e)))?;

    let response_id = generate_response_id();
    let submitted_at = Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO responses (id, survey_id, answers, submitted_at, origin_hash) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&response_id)
    .bind(&survey.id)
    .bind(&answers_json)
    .bind(&submitted_at)
    .bind(&origin_hash)
    .execute(&state.db)
    .await
    .map_err(ApiError::DatabaseError)?;

    info!(
        response_id = %response_id,
        survey_id = %survey.id,
        answer_count = payload.answers.len(),
        "Response submitted"
    );

    // Real-time fan-out to everyone watching this survey's channel
    state
        .channels
        .broadcast(
            &survey.id,
            ServerEvent::NewResponse {
                survey_id: survey.id.clone(),
                count: 1,
                timestamp: submitted_at.clone(),
            },
        )
        .await;

    // Best-effort owner notification; runs detached so neither the owner
    // lookup nor the send can block or fail the submission
    if let Some(email_service) = state.email_service.clone() {
        let db = state.db.clone();
        let owner_id = survey.user_id.clone();
        let survey_title = survey.title.clone();
        let survey_id = survey.id.clone();
        tokio::spawn(async move {
            let owner_email: Option<String> =
                match sqlx::query_scalar("SELECT email FROM users WHERE id = ?")
                    .bind(&owner_id)
                    .fetch_optional(&db)
                    .await
                {
                    Ok(email) => email,
                    Err(e) => {
                        warn!(
                            survey_id = %survey_id,
                            error = %e,
                            "Owner lookup for notification failed"
                        );
                        None
                    }
                };

            if let Some(owner_email) = owner_email {
                if let Err(e) = email_service
                    .send_new_response_notification(&owner_email, &survey_title, &survey_id)
                    .await
                {
                    warn!(survey_id = %survey_id, error = %e, "Notification email failed");
                }
            }
        });
    }

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "msg": "Response submitted successfully",
            "responseId": response_id,
        })),
    ))
}

/// GET /api/responses/:surveyId - List a survey's responses, newest first.
/// Owner-verified; an ownership mismatch reads as not-found.
pub async fn list_responses(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(survey_id): Path<String>,
) -> Result<Json<Vec<ResponseView>>, ApiError> {
    let state = state_lock.read().await.clone();

    fetch_owned_survey(&state, &survey_id, &authed.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Survey not found".to_string()))?;

    let responses = sqlx::query_as::<_, ResponseRecord>(
        "SELECT * FROM responses WHERE survey_id = ? ORDER BY submitted_at DESC",
    )
    .bind(&survey_id)
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::DatabaseError)?;

    debug!(
        survey_id = %survey_id,
        response_count = responses.len(),
        "Listed survey responses"
    );

    Ok(Json(responses.into_iter().map(ResponseView::from).collect()))
}

/// GET /api/responses/:surveyId/export - Export a survey's responses as CSV
pub async fn export_csv(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(survey_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();

    let survey = fetch_owned_survey(&state, &survey_id, &authed.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Survey not found".to_string()))?;

    let responses = sqlx::query_as::<_, ResponseRecord>(
        "SELECT * FROM responses WHERE survey_id = ? ORDER BY submitted_at ASC",
    )
    .bind(&survey_id)
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::DatabaseError)?;

    // Never emit a header-only file
    if responses.is_empty() {
        return Err(ApiError::NotFound("No responses found".to_string()));
    }

    let questions = SurveyView::from(survey).questions;
    let views: Vec<ResponseView> = responses.into_iter().map(ResponseView::from).collect();
    let csv_content = responses_to_csv(&questions, &views);

    info!(
        survey_id = %survey_id,
        user_id = %authed.id,
        record_count = views.len(),
        "Responses exported as CSV"
    );

    Ok((
        StatusCode::OK,
        [
            ("Content-Type", "text/csv".to_string()),
            (
                "Content-Disposition",
                format!("attachment; filename=\"survey-{}-responses.csv\"", survey_id),
            ),
        ],
        csv_content,
    ))
}
