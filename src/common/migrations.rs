// src/common/migrations.rs
//! Database migration and schema management

use sqlx::SqlitePool;
use std::env;
use tracing::{info, warn};

/// Run all database migrations
///
/// Tables are created if missing. Setting RESET_DB=true drops everything
/// first, which is only meant for local development.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let should_reset_db = env::var("RESET_DB").unwrap_or_else(|_| "false".to_string()) == "true";

    if should_reset_db {
        warn!("RESET_DB=true - dropping all tables and recreating schema");
        drop_all_tables(pool).await?;
    }

    create_user_tables(pool).await?;
    create_survey_tables(pool).await?;
    create_response_tables(pool).await?;
    create_indexes(pool).await?;

    info!("Database migration completed");

    Ok(())
}

async fn drop_all_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("DROP TABLE IF EXISTS responses")
        .execute(pool)
        .await?;
    sqlx::query("DROP TABLE IF EXISTS surveys")
        .execute(pool)
        .await?;
    sqlx::query("DROP TABLE IF EXISTS users").execute(pool).await?;
    Ok(())
}

async fn create_user_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TEXT DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_survey_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // questions and theme are JSON documents stored as TEXT
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS surveys (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            questions TEXT NOT NULL DEFAULT '[]',
            theme TEXT,
            logo TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            prevent_duplicates INTEGER NOT NULL DEFAULT 0,
            require_auth INTEGER NOT NULL DEFAULT 0,
            expiration_date TEXT,
            expires_at TEXT,
            is_expired INTEGER NOT NULL DEFAULT 0,
            expiration_action TEXT NOT NULL DEFAULT 'show_message',
            expiration_message TEXT DEFAULT 'This survey is no longer accepting responses.',
            redirect_url TEXT DEFAULT '',
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_response_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // survey_id is a plain reference, not a foreign key: deleting a survey
    // leaves its responses in place
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS responses (
            id TEXT PRIMARY KEY,
            survey_id TEXT NOT NULL,
            answers TEXT NOT NULL DEFAULT '[]',
            submitted_at TEXT NOT NULL DEFAULT (datetime('now')),
            origin_hash TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_surveys_user_id ON surveys(user_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_responses_survey_id ON responses(survey_id)")
        .execute(pool)
        .await?;
    // Non-unique by design: the duplicate-check-then-insert race is an
    // accepted trade-off
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_responses_survey_origin ON responses(survey_id, origin_hash)",
    )
    .execute(pool)
    .await?;
    Ok(())
}
