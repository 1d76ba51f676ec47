// src/surveys/routes.rs

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Create the surveys router
///
/// # Routes
/// - `GET /api/surveys/public/:id` - Public view for survey takers (optional auth)
/// - `POST /api/surveys` - Create a survey
/// - `GET /api/surveys` - List the caller's surveys with response counts
/// - `GET /api/surveys/:id` - Owner view of a survey
/// - `PUT /api/surveys/:id` - Partial update
/// - `DELETE /api/surveys/:id` - Delete a survey
pub fn survey_routes() -> Router {
    Router::new()
        // NOTE: the public route must come before the parameterized owner route
        .route("/api/surveys/public/:id", get(handlers::get_public_survey))
        .route(
            "/api/surveys",
            post(handlers::create_survey).get(handlers::list_surveys),
        )
        .route(
            "/api/surveys/:id",
            get(handlers::get_survey)
                .put(handlers::update_survey)
                .delete(handlers::delete_survey),
        )
}
