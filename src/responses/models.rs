// src/responses/models.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

// ============================================================================
// Response Models
// ============================================================================

/// Response database row. The answers document is a JSON string in a TEXT
/// column; the origin hash is only ever used for duplicate detection.
#[derive(FromRow, Debug, Clone)]
pub struct ResponseRecord {
    pub id: String,
    pub survey_id: String,
    pub answers: String, // JSON array in DB
    pub submitted_at: String,
    pub origin_hash: Option<String>,
}

/// A single scalar answer value
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Bool(b) => write!(f, "{}", b),
            ScalarValue::Number(n) => write!(f, "{}", n),
            ScalarValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Answer payload: a closed set of shapes rather than an open "any" type,
/// so export and validation stay exhaustive
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum AnswerValue {
    Scalar(ScalarValue),
    List(Vec<ScalarValue>),
    Structured(serde_json::Map<String, serde_json::Value>),
}

impl AnswerValue {
    /// Text rendition used by the CSV export: scalars verbatim, lists joined
    /// with ", ", structured payloads JSON-encoded
    pub fn to_export_string(&self) -> String {
        match self {
            AnswerValue::Scalar(scalar) => scalar.to_string(),
            AnswerValue::List(values) => values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            AnswerValue::Structured(map) => {
                serde_json::to_string(map).unwrap_or_else(|_| String::new())
            }
        }
    }
}

/// Answer embedded in a response, referencing a question by id
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: String,
    #[serde(default)]
    pub answer: Option<AnswerValue>,
}

// ============================================================================
// API shapes
// ============================================================================

/// Response with parsed answers. The origin hash never leaves the store.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ResponseView {
    pub id: String,
    pub survey_id: String,
    pub answers: Vec<Answer>,
    pub timestamp: String,
}

impl From<ResponseRecord> for ResponseView {
    fn from(record: ResponseRecord) -> Self {
        let answers: Vec<Answer> = serde_json::from_str(&record.answers).unwrap_or_default();
        ResponseView {
            id: record.id,
            survey_id: record.survey_id,
            answers,
            timestamp: record.submitted_at,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub survey_id: String,
    #[serde(default)]
    pub answers: Vec<Answer>,
}
