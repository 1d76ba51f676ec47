// src/surveys/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::common::helpers::double_option;

// ============================================================================
// Survey Models
// ============================================================================

/// Survey database row. The questions and theme documents are stored as
/// JSON strings in TEXT columns and parsed on the way out.
#[derive(FromRow, Debug, Clone)]
pub struct Survey {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub questions: String, // JSON array in DB
    pub theme: Option<String>, // JSON object in DB
    pub logo: Option<String>,
    pub active: i64, // SQLite uses INTEGER for boolean
    pub prevent_duplicates: i64,
    pub require_auth: i64,
    pub expiration_date: Option<String>, // legacy expiration field
    pub expires_at: Option<String>,
    pub is_expired: i64,
    pub expiration_action: String,
    pub expiration_message: Option<String>,
    pub redirect_url: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Closed set of question types
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Text,
    Paragraph,
    Multiple,
    Radio,
    Dropdown,
    Rating,
    Scale,
    Date,
    Time,
}

/// Conditional-display rule referencing another question
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalRule {
    pub question_id: String,
    pub value: String,
}

/// Question embedded in a survey. Ids are assigned server-side when the
/// survey is created or updated and stay stable afterwards; answers
/// reference them.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub question: String,
    /// Legacy alternative to `question`, kept for old clients
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional: Option<ConditionalRule>,
}

impl Question {
    /// Human-readable label, preferring `question` over the legacy `text`
    pub fn label(&self) -> &str {
        if !self.question.trim().is_empty() {
            &self.question
        } else if let Some(text) = self.text.as_deref() {
            text
        } else {
            "Unknown Question"
        }
    }
}

/// Branding/theme configuration, stored alongside the survey
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rounded: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// What to show submitters once a survey has expired
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExpirationAction {
    ShowMessage,
    Redirect,
}

impl ExpirationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpirationAction::ShowMessage => "show_message",
            ExpirationAction::Redirect => "redirect",
        }
    }
}

// ============================================================================
// API shapes
// ============================================================================

/// Survey response with parsed question/theme documents
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SurveyView {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub questions: Vec<Question>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    pub active: bool,
    pub prevent_duplicates: bool,
    pub require_auth: bool,
    pub expiration_date: Option<String>,
    pub expires_at: Option<String>,
    pub is_expired: bool,
    pub expiration_action: String,
    pub expiration_message: Option<String>,
    pub redirect_url: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<Survey> for SurveyView {
    fn from(survey: Survey) -> Self {
        let questions: Vec<Question> =
            serde_json::from_str(&survey.questions).unwrap_or_default();
        let theme: Option<Theme> = survey
            .theme
            .as_deref()
            .and_then(|t| serde_json::from_str(t).ok());

        SurveyView {
            id: survey.id,
            user_id: survey.user_id,
            title: survey.title,
            description: survey.description,
            questions,
            theme,
            logo: survey.logo,
            active: survey.active == 1,
            prevent_duplicates: survey.prevent_duplicates == 1,
            require_auth: survey.require_auth == 1,
            expiration_date: survey.expiration_date,
            expires_at: survey.expires_at,
            is_expired: survey.is_expired == 1,
            expiration_action: survey.expiration_action,
            expiration_message: survey.expiration_message,
            redirect_url: survey.redirect_url,
            created_at: survey.created_at,
            updated_at: survey.updated_at,
        }
    }
}

/// Owner-list entry: a survey annotated with its derived response count
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SurveyWithCount {
    #[serde(flatten)]
    pub survey: SurveyView,
    pub response_count: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSurvey {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub theme: Option<Theme>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub prevent_duplicates: Option<bool>,
    #[serde(default)]
    pub require_auth: Option<bool>,
    /// Explicit `null` here forces a clean expiry state (no stale
    /// `isExpired`/`expiresAt` leaking in from a previous edit)
    #[serde(default, deserialize_with = "double_option")]
    pub expiration_date: Option<Option<DateTime<Utc>>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expiration_action: Option<ExpirationAction>,
    #[serde(default)]
    pub expiration_message: Option<String>,
    #[serde(default)]
    pub redirect_url: Option<String>,
}

/// Partial update: only supplied fields are modified. The expiration fields
/// distinguish "absent" from "explicitly null" so owners can clear them.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSurvey {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Option<Vec<Question>>,
    #[serde(default)]
    pub theme: Option<Theme>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub prevent_duplicates: Option<bool>,
    #[serde(default)]
    pub require_auth: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub expiration_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub expires_at: Option<Option<DateTime<Utc>>>,
    #[serde(default)]
    pub expiration_action: Option<ExpirationAction>,
    #[serde(default)]
    pub expiration_message: Option<String>,
    #[serde(default)]
    pub redirect_url: Option<String>,
}

// ============================================================================
// Expiry evaluation
// ============================================================================

/// Outcome of the live expiration check.
///
/// The `expiresAt` branch carries the full action/message/redirect payload;
/// the legacy `expirationDate` branch carries only the date. The two shapes
/// are deliberately not unified.
#[derive(Debug, PartialEq)]
pub enum ExpiryStatus {
    Open,
    /// Expired per `expiresAt`; `needs_cache_write` is set the first time
    /// the threshold is crossed
    Expired { expires_at: String, needs_cache_write: bool },
    /// Expired per the legacy `expirationDate` field
    ExpiredLegacy { expiration_date: String },
}

fn parse_stored_ts(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

impl Survey {
    /// Authoritative expiration check: always the live date comparison,
    /// checking `expiresAt` before the legacy `expirationDate`. The cached
    /// `is_expired` flag only influences whether a cache write is needed.
    pub fn expiry_status(&self, now: DateTime<Utc>) -> ExpiryStatus {
        if let Some(expires_at) = self.expires_at.as_deref().and_then(parse_stored_ts) {
            if now > expires_at {
                return ExpiryStatus::Expired {
                    expires_at: self.expires_at.clone().unwrap_or_default(),
                    needs_cache_write: self.is_expired == 0,
                };
            }
        }

        // Legacy fallback fires whenever the expiresAt branch did not
        if let Some(expiration_date) = self.expiration_date.as_deref().and_then(parse_stored_ts) {
            if now > expiration_date {
                return ExpiryStatus::ExpiredLegacy {
                    expiration_date: self.expiration_date.clone().unwrap_or_default(),
                };
            }
        }

        ExpiryStatus::Open
    }

    /// True when a previously cached expired flag should be cleared: both
    /// expiration fields are gone but `is_expired` stayed set
    pub fn needs_expiry_cache_clear(&self) -> bool {
        self.is_expired == 1 && self.expires_at.is_none() && self.expiration_date.is_none()
    }
}
