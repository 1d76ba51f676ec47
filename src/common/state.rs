// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::realtime::channels::ChannelRegistry;
use crate::services::EmailService;

/// Application state containing the database pool, configuration, and the
/// collaborators injected into request handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub jwt_secret: String,
    pub channels: ChannelRegistry,
    pub email_service: Option<Arc<EmailService>>,
}
