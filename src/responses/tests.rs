//! Tests for the responses module
//!
//! Covers answer payload parsing (closed variant set), the export
//! flattening rules, and origin hashing for duplicate detection.

#[cfg(test)]
mod tests {
    use super::super::export::responses_to_csv;
    use super::super::models::*;
    use crate::surveys::models::{Question, QuestionType};
    use sha2::{Digest, Sha256};

    fn question(id: &str, label: &str) -> Question {
        Question {
            id: Some(id.to_string()),
            question_type: QuestionType::Text,
            question: label.to_string(),
            text: None,
            description: None,
            options: None,
            required: false,
            min: None,
            max: None,
            conditional: None,
        }
    }

    fn answer(question_id: &str, value: serde_json::Value) -> Answer {
        Answer {
            question_id: question_id.to_string(),
            answer: serde_json::from_value(value).unwrap(),
        }
    }

    fn response(id: &str, answers: Vec<Answer>) -> ResponseView {
        ResponseView {
            id: id.to_string(),
            survey_id: "S_K7NP3X".to_string(),
            answers,
            timestamp: "2026-08-26T12:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_answer_value_variants_parse() {
        let scalar: AnswerValue = serde_json::from_str(r#""Alice""#).unwrap();
        assert!(matches!(scalar, AnswerValue::Scalar(_)));

        let number: AnswerValue = serde_json::from_str("30").unwrap();
        assert_eq!(number.to_export_string(), "30");

        let list: AnswerValue = serde_json::from_str(r#"["red", "blue"]"#).unwrap();
        assert_eq!(list.to_export_string(), "red, blue");

        let structured: AnswerValue = serde_json::from_str(r#"{"lat": 1, "lng": 2}"#).unwrap();
        assert!(matches!(structured, AnswerValue::Structured(_)));
        assert!(structured.to_export_string().contains("\"lat\""));
    }

    #[test]
    fn test_export_one_row_with_labelled_columns() {
        let questions = vec![question("Q_NAME01", "Name"), question("Q_AGE001", "Age")];
        let responses = vec![response(
            "R_000001",
            vec![
                answer("Q_NAME01", serde_json::json!("Alice")),
                answer("Q_AGE001", serde_json::json!(30)),
            ],
        )];

        let csv = responses_to_csv(&questions, &responses);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#""responseId","timestamp","Name","Age""#);
        assert_eq!(
            lines[1],
            r#""R_000001","2026-08-26T12:00:00+00:00","Alice","30""#
        );
    }

    #[test]
    fn test_export_missing_answers_render_empty() {
        let questions = vec![question("Q_NAME01", "Name"), question("Q_AGE001", "Age")];
        let responses = vec![response(
            "R_000001",
            vec![answer("Q_NAME01", serde_json::json!("Bob"))],
        )];

        let csv = responses_to_csv(&questions, &responses);
        assert!(csv.lines().nth(1).unwrap().ends_with(r#""Bob","""#));
    }

    #[test]
    fn test_export_falls_back_to_raw_question_id() {
        // Answer referencing a question that was since removed from the
        // survey gets a column labelled by its raw id
        let questions = vec![question("Q_NAME01", "Name")];
        let responses = vec![response(
            "R_000001",
            vec![
                answer("Q_NAME01", serde_json::json!("Carol")),
                answer("Q_GONE01", serde_json::json!("orphaned")),
            ],
        )];

        let csv = responses_to_csv(&questions, &responses);
        let header = csv.lines().next().unwrap();
        assert!(header.contains(r#""Q_GONE01""#));
        assert!(csv.lines().nth(1).unwrap().contains(r#""orphaned""#));
    }

    #[test]
    fn test_export_joins_multi_valued_answers() {
        let questions = vec![question("Q_COLORS", "Colors")];
        let responses = vec![response(
            "R_000001",
            vec![answer("Q_COLORS", serde_json::json!(["red", "green", "blue"]))],
        )];

        let csv = responses_to_csv(&questions, &responses);
        assert!(csv.contains(r#""red, green, blue""#));
    }

    #[test]
    fn test_export_escapes_embedded_quotes() {
        let questions = vec![question("Q_QUOTE1", "Quote")];
        let responses = vec![response(
            "R_000001",
            vec![answer("Q_QUOTE1", serde_json::json!(r#"she said "hi""#))],
        )];

        let csv = responses_to_csv(&questions, &responses);
        assert!(csv.contains(r#""she said ""hi""""#));
    }

    #[test]
    fn test_null_answer_renders_empty() {
        let questions = vec![question("Q_NAME01", "Name")];
        let responses = vec![response(
            "R_000001",
            vec![Answer {
                question_id: "Q_NAME01".to_string(),
                answer: None,
            }],
        )];

        let csv = responses_to_csv(&questions, &responses);
        assert!(csv.lines().nth(1).unwrap().ends_with(r#","""#));
    }

    #[test]
    fn test_same_origin_hashes_identically() {
        let a = format!("{:x}", Sha256::digest("203.0.113.9".as_bytes()));
        let b = format!("{:x}", Sha256::digest("203.0.113.9".as_bytes()));
        let c = format!("{:x}", Sha256::digest("203.0.113.10".as_bytes()));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_response_view_parses_answers_column() {
        let record = ResponseRecord {
            id: "R_000001".to_string(),
            survey_id: "S_K7NP3X".to_string(),
            answers: r#"[{"questionId":"Q_NAME01","answer":"Alice"}]"#.to_string(),
            submitted_at: "2026-08-26T12:00:00+00:00".to_string(),
            origin_hash: Some("deadbeef".to_string()),
        };

        let view = ResponseView::from(record);
        assert_eq!(view.answers.len(), 1);
        assert_eq!(view.answers[0].question_id, "Q_NAME01");

        // The origin hash never leaves the store
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("originHash").is_none());
        assert!(json.get("origin_hash").is_none());
    }
}

#[cfg(test)]
mod handler_tests {
    use super::super::handlers::{list_responses, submit_response};
    use super::super::models::SubmitResponse;
    use crate::auth::extractors::{AuthedUser, MaybeUser};
    use crate::common::migrations::run_migrations;
    use crate::common::{ApiError, AppState};
    use crate::realtime::ChannelRegistry;
    use crate::services::EmailService;
    use axum::extract::{ConnectInfo, Extension, Path};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::Json;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    async fn test_state(
        email_service: Option<Arc<EmailService>>,
    ) -> Arc<RwLock<AppState>> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        Arc::new(RwLock::new(AppState {
            db: pool,
            jwt_secret: "test_secret_key".to_string(),
            channels: ChannelRegistry::new(),
            email_service,
        }))
    }

    async fn seed_survey(
        state: &Arc<RwLock<AppState>>,
        survey_id: &str,
        prevent_duplicates: i64,
    ) {
        let db = state.read().await.db.clone();
        sqlx::query(
            "INSERT INTO users (id, email, password_hash) VALUES ('U_OWNER1', 'owner@example.com', 'hash')",
        )
        .execute(&db)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO surveys (id, user_id, title, prevent_duplicates) VALUES (?, 'U_OWNER1', 'Customer feedback', ?)",
        )
        .bind(survey_id)
        .bind(prevent_duplicates)
        .execute(&db)
        .await
        .unwrap();
    }

    async fn submit_from(
        state: &Arc<RwLock<AppState>>,
        survey_id: &str,
        addr: [u8; 4],
    ) -> Result<Response, ApiError> {
        submit_response(
            Extension(state.clone()),
            MaybeUser(None),
            Some(ConnectInfo(SocketAddr::from((addr, 51000)))),
            HeaderMap::new(),
            Json(SubmitResponse {
                survey_id: survey_id.to_string(),
                answers: Vec::new(),
            }),
        )
        .await
        .map(|r| r.into_response())
    }

    async fn response_count(state: &Arc<RwLock<AppState>>, survey_id: &str) -> i64 {
        let db = state.read().await.db.clone();
        sqlx::query_scalar("SELECT COUNT(*) FROM responses WHERE survey_id = ?")
            .bind(survey_id)
            .fetch_one(&db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_origin_rejected_when_prevention_enabled() {
        let state = test_state(None).await;
        seed_survey(&state, "S_K7NP3X", 1).await;

        let first = submit_from(&state, "S_K7NP3X", [203, 0, 113, 9]).await.unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = submit_from(&state, "S_K7NP3X", [203, 0, 113, 9]).await;
        assert!(matches!(second, Err(ApiError::Conflict(_))));

        assert_eq!(response_count(&state, "S_K7NP3X").await, 1);
    }

    #[tokio::test]
    async fn test_distinct_origins_both_accepted() {
        let state = test_state(None).await;
        seed_survey(&state, "S_K7NP3X", 1).await;

        let first = submit_from(&state, "S_K7NP3X", [203, 0, 113, 9]).await.unwrap();
        let second = submit_from(&state, "S_K7NP3X", [203, 0, 113, 10]).await.unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);
        assert_eq!(second.status(), StatusCode::CREATED);

        assert_eq!(response_count(&state, "S_K7NP3X").await, 2);
    }

    #[tokio::test]
    async fn test_repeat_submission_accepted_without_prevention() {
        let state = test_state(None).await;
        seed_survey(&state, "S_K7NP3X", 0).await;

        let first = submit_from(&state, "S_K7NP3X", [203, 0, 113, 9]).await.unwrap();
        let second = submit_from(&state, "S_K7NP3X", [203, 0, 113, 9]).await.unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);
        assert_eq!(second.status(), StatusCode::CREATED);

        assert_eq!(response_count(&state, "S_K7NP3X").await, 2);

        // No origin hash is ever computed when prevention is off
        let db = state.read().await.db.clone();
        let hashless: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM responses WHERE origin_hash IS NULL")
                .fetch_one(&db)
                .await
                .unwrap();
        assert_eq!(hashless, 2);
    }

    #[tokio::test]
    async fn test_listing_masks_surveys_of_other_owners() {
        let state = test_state(None).await;
        seed_survey(&state, "S_K7NP3X", 0).await;

        let intruder = AuthedUser {
            id: "U_OTHER1".to_string(),
            email: "other@example.com".to_string(),
        };
        let result = list_responses(
            Extension(state.clone()),
            intruder,
            Path("S_K7NP3X".to_string()),
        )
        .await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));

        let owner = AuthedUser {
            id: "U_OWNER1".to_string(),
            email: "owner@example.com".to_string(),
        };
        let result = list_responses(Extension(state), owner, Path("S_K7NP3X".to_string())).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_submission_survives_owner_lookup_failure() {
        let ses_config = aws_sdk_sesv2::Config::builder()
            .behavior_version(aws_sdk_sesv2::config::BehaviorVersion::latest())
            .build();
        let email_service = Arc::new(EmailService::new(
            aws_sdk_sesv2::Client::from_conf(ses_config),
            "noreply@example.com".to_string(),
            "http://localhost:3000".to_string(),
        ));

        let state = test_state(Some(email_service)).await;
        seed_survey(&state, "S_K7NP3X", 0).await;

        // The owner lookup for the notification runs detached; a users-table
        // failure must never surface to the submitter
        let db = state.read().await.db.clone();
        sqlx::query("DROP TABLE users").execute(&db).await.unwrap();

        let response = submit_from(&state, "S_K7NP3X", [203, 0, 113, 9]).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        assert_eq!(response_count(&state, "S_K7NP3X").await, 1);
    }
}
