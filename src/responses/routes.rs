// src/responses/routes.rs

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Create the responses router
///
/// # Routes
/// - `POST /api/responses` - Submit a response (optional auth)
/// - `GET /api/responses/:surveyId` - Owner listing, newest first
/// - `GET /api/responses/:surveyId/export` - Owner CSV export
pub fn response_routes() -> Router {
    Router::new()
        .route("/api/responses", post(handlers::submit_response))
        .route("/api/responses/:survey_id", get(handlers::list_responses))
        .route(
            "/api/responses/:survey_id/export",
            get(handlers::export_csv),
        )
}
