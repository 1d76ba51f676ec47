// src/services/email.rs
//! Optional new-response notification emails via SES.
//!
//! This collaborator is outside the core intake path: notifications are
//! spawned after fan-out and failures are logged, never surfaced to the
//! submitter.

use aws_sdk_sesv2::Client as SesClient;
use tracing::{error, info};

pub struct EmailService {
    client: SesClient,
    from_email: String,
    frontend_url: String,
}

impl EmailService {
    pub fn new(client: SesClient, from_email: String, frontend_url: String) -> Self {
        Self {
            client,
            from_email,
            frontend_url,
        }
    }

    /// Build the service from environment configuration. Returns None when
    /// NOTIFY_FROM_EMAIL is unset, which disables email notifications.
    pub async fn from_env(frontend_url: &str) -> Option<Self> {
        let from_email = std::env::var("NOTIFY_FROM_EMAIL").ok()?;
        if from_email.is_empty() {
            return None;
        }

        let aws_config = aws_config::load_from_env().await;
        Some(Self::new(
            SesClient::new(&aws_config),
            from_email,
            frontend_url.to_string(),
        ))
    }

    /// Notify a survey owner that a new response arrived
    pub async fn send_new_response_notification(
        &self,
        to: &str,
        survey_title: &str,
        survey_id: &str,
    ) -> Result<(), String> {
        use aws_sdk_sesv2::types::{Body as SesBody, Content, Destination, EmailContent, Message};

        let subject = format!("New Response: {}", survey_title);
        let html = new_response_email_body(survey_title, survey_id, &self.frontend_url);

        let destination = Destination::builder().to_addresses(to).build();

        let subject_content = Content::builder()
            .data(subject)
            .charset("UTF-8")
            .build()
            .map_err(|e| format!("Failed to build subject: {}", e))?;

        let body_content = Content::builder()
            .data(html)
            .charset("UTF-8")
            .build()
            .map_err(|e| format!("Failed to build body: {}", e))?;

        let message = Message::builder()
            .subject(subject_content)
            .body(SesBody::builder().html(body_content).build())
            .build();

        let result = self
            .client
            .send_email()
            .from_email_address(&self.from_email)
            .destination(destination)
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send notification email via SES");
                format!("Send failed: {}", e)
            })?;

        info!(
            message_id = ?result.message_id(),
            survey_id = %survey_id,
            "New-response notification email sent"
        );

        Ok(())
    }
}

fn new_response_email_body(survey_title: &str, survey_id: &str, frontend_url: &str) -> String {
    format!(
        r#"<h2>New Survey Response</h2>
<p>A new response has been submitted to your survey <strong>"{}"</strong>.</p>
<p><a href="{}/admin/analytics/{}">View Analytics</a></p>"#,
        survey_title, frontend_url, survey_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_body_links_to_analytics() {
        let body = new_response_email_body("Customer feedback", "S_K7NP3X", "https://example.com");
        assert!(body.contains("Customer feedback"));
        assert!(body.contains("https://example.com/admin/analytics/S_K7NP3X"));
    }
}
