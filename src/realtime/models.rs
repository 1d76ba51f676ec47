// src/realtime/models.rs

use serde::{Deserialize, Serialize};

/// Frames a connected client may send
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientCommand {
    /// Join a survey's channel to observe new responses
    #[serde(rename_all = "camelCase")]
    Join { survey_id: String },
    /// Leave a previously joined channel
    #[serde(rename_all = "camelCase")]
    Leave { survey_id: String },
    Ping,
}

/// Frames the server emits
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Acknowledges a join
    #[serde(rename_all = "camelCase")]
    Joined { survey_id: String },
    /// Acknowledges a leave
    #[serde(rename_all = "camelCase")]
    Left { survey_id: String },
    /// A response was submitted to a joined survey
    #[serde(rename_all = "camelCase")]
    NewResponse {
        survey_id: String,
        count: u64,
        timestamp: String,
    },
    Pong,
    Error { code: String, message: String },
}
