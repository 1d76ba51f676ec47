// src/realtime/channels.rs

use axum::extract::ws::Message;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use super::models::ServerEvent;

/// Channel membership table for the new-response fan-out.
///
/// Keyed by survey id; any number of connections may join a channel and a
/// broadcast reaches the members connected at emission time. The registry is
/// an explicit collaborator owned by the process and handed to the response
/// intake handler, not ambient global state.
#[derive(Clone)]
pub struct ChannelRegistry {
    // Map of survey_id -> (connection_id -> sender channel)
    channels: Arc<RwLock<HashMap<String, HashMap<String, mpsc::UnboundedSender<Message>>>>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Add a connection to a survey's channel
    pub async fn join(
        &self,
        survey_id: &str,
        connection_id: &str,
        sender: mpsc::UnboundedSender<Message>,
    ) {
        let mut channels = self.channels.write().await;
        channels
            .entry(survey_id.to_string())
            .or_default()
            .insert(connection_id.to_string(), sender);

        info!(
            survey_id = %survey_id,
            connection_id = %connection_id,
            "Connection joined survey channel"
        );
    }

    /// Remove a connection from a survey's channel
    pub async fn leave(&self, survey_id: &str, connection_id: &str) {
        let mut channels = self.channels.write().await;
        if let Some(members) = channels.get_mut(survey_id) {
            members.remove(connection_id);
            if members.is_empty() {
                channels.remove(survey_id);
            }
            debug!(
                survey_id = %survey_id,
                connection_id = %connection_id,
                "Connection left survey channel"
            );
        }
    }

    /// Remove a connection from every channel it joined. Called when the
    /// underlying socket closes.
    pub async fn leave_all(&self, connection_id: &str) {
        let mut channels = self.channels.write().await;
        channels.retain(|_, members| {
            members.remove(connection_id);
            !members.is_empty()
        });
    }

    /// Broadcast an event to every current member of a survey's channel.
    /// Best-effort: members whose socket task already hung up are skipped.
    /// Returns the number of members the event was handed to.
    pub async fn broadcast(&self, survey_id: &str, event: ServerEvent) -> usize {
        let json = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize realtime event");
                return 0;
            }
        };

        let channels = self.channels.read().await;
        let Some(members) = channels.get(survey_id) else {
            return 0;
        };

        let mut sent = 0;
        for (connection_id, sender) in members {
            if sender.send(Message::Text(json.clone())).is_ok() {
                sent += 1;
            } else {
                debug!(
                    connection_id = %connection_id,
                    "Skipping closed connection during broadcast"
                );
            }
        }

        if sent > 0 {
            debug!(
                survey_id = %survey_id,
                recipients = sent,
                "Broadcast new-response event"
            );
        }

        sent
    }

    /// Current member count of a survey's channel
    pub async fn member_count(&self, survey_id: &str) -> usize {
        self.channels
            .read()
            .await
            .get(survey_id)
            .map(|members| members.len())
            .unwrap_or(0)
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
