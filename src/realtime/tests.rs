//! Tests for the realtime fan-out
//!
//! Verifies the channel registry's join/leave/broadcast behavior: exactly
//! one event per member per broadcast, channel isolation, and no delivery
//! to members who joined after emission.

#[cfg(test)]
mod tests {
    use super::super::channels::ChannelRegistry;
    use super::super::models::{ClientCommand, ServerEvent};
    use axum::extract::ws::Message;
    use tokio::sync::mpsc;

    fn event_for(survey_id: &str) -> ServerEvent {
        ServerEvent::NewResponse {
            survey_id: survey_id.to_string(),
            count: 1,
            timestamp: "2026-08-26T12:00:00+00:00".to_string(),
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(Message::Text(text)) = rx.try_recv() {
            frames.push(text);
        }
        frames
    }

    #[tokio::test]
    async fn test_broadcast_reaches_only_joined_members() {
        let registry = ChannelRegistry::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();

        registry.join("S_AAAAAA", "N_CONN01", tx_a).await;
        registry.join("S_BBBBBB", "N_CONN02", tx_b).await;

        let sent = registry.broadcast("S_AAAAAA", event_for("S_AAAAAA")).await;
        assert_eq!(sent, 1);

        let frames_a = drain(&mut rx_a);
        assert_eq!(frames_a.len(), 1);
        assert!(frames_a[0].contains("newResponse"));
        assert!(frames_a[0].contains("S_AAAAAA"));

        // The other survey's channel sees nothing
        assert!(drain(&mut rx_b).is_empty());
    }

    #[tokio::test]
    async fn test_one_event_per_member_per_broadcast() {
        let registry = ChannelRegistry::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();

        registry.join("S_AAAAAA", "N_CONN01", tx_a).await;
        registry.join("S_AAAAAA", "N_CONN02", tx_b).await;

        let sent = registry.broadcast("S_AAAAAA", event_for("S_AAAAAA")).await;
        assert_eq!(sent, 2);
        assert_eq!(drain(&mut rx_a).len(), 1);
        assert_eq!(drain(&mut rx_b).len(), 1);
    }

    #[tokio::test]
    async fn test_late_joiner_misses_earlier_events() {
        let registry = ChannelRegistry::new();

        let sent = registry.broadcast("S_AAAAAA", event_for("S_AAAAAA")).await;
        assert_eq!(sent, 0);

        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.join("S_AAAAAA", "N_CONN01", tx).await;

        // Nothing is replayed on join
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_leave_stops_delivery() {
        let registry = ChannelRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        registry.join("S_AAAAAA", "N_CONN01", tx).await;
        registry.leave("S_AAAAAA", "N_CONN01").await;
        assert_eq!(registry.member_count("S_AAAAAA").await, 0);

        let sent = registry.broadcast("S_AAAAAA", event_for("S_AAAAAA")).await;
        assert_eq!(sent, 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_leave_all_clears_every_membership() {
        let registry = ChannelRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        registry.join("S_AAAAAA", "N_CONN01", tx.clone()).await;
        registry.join("S_BBBBBB", "N_CONN01", tx).await;
        registry.leave_all("N_CONN01").await;

        assert_eq!(registry.member_count("S_AAAAAA").await, 0);
        assert_eq!(registry.member_count("S_BBBBBB").await, 0);
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_skipped() {
        let registry = ChannelRegistry::new();
        let (tx_live, mut rx_live) = mpsc::unbounded_channel();
        let (tx_dead, rx_dead) = mpsc::unbounded_channel();
        drop(rx_dead);

        registry.join("S_AAAAAA", "N_LIVE01", tx_live).await;
        registry.join("S_AAAAAA", "N_DEAD01", tx_dead).await;

        // The hung-up member is skipped, the live one still gets the event
        let sent = registry.broadcast("S_AAAAAA", event_for("S_AAAAAA")).await;
        assert_eq!(sent, 1);
        assert_eq!(drain(&mut rx_live).len(), 1);
    }

    #[test]
    fn test_client_command_frames_parse() {
        let join: ClientCommand =
            serde_json::from_str(r#"{"type":"join","surveyId":"S_AAAAAA"}"#).unwrap();
        assert!(matches!(join, ClientCommand::Join { survey_id } if survey_id == "S_AAAAAA"));

        let ping: ClientCommand = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(ping, ClientCommand::Ping));

        let bad: Result<ClientCommand, _> = serde_json::from_str(r#"{"type":"subscribe"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_new_response_event_wire_shape() {
        let json = serde_json::to_value(event_for("S_AAAAAA")).unwrap();
        assert_eq!(json["type"], "newResponse");
        assert_eq!(json["surveyId"], "S_AAAAAA");
        assert_eq!(json["count"], 1);
        assert!(json["timestamp"].is_string());
    }
}
