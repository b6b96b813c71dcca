use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// One line of a status email, echoing a booking item
#[derive(Debug, Clone, Serialize)]
pub struct EmailLineItem {
    pub homestay_id: i32,
    pub checkin_date: NaiveDate,
    pub checkout_date: NaiveDate,
    pub guests: i32,
    pub line_total: Decimal,
}

/// Payload handed to the mail relay when a booking changes status
#[derive(Debug, Clone, Serialize)]
pub struct StatusEmail {
    pub booking_id: Uuid,
    pub status: String,
    pub to_email: String,
    pub to_name: String,
    pub total: Decimal,
    pub line_items: Vec<EmailLineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Error types for notification dispatch
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Mail relay request failed: {0}")]
    Transport(String),

    #[error("Mail relay responded with status {0}")]
    RelayStatus(u16),
}

/// Outbound notification channel
///
/// Dispatch is fire and forget: senders run after the owning transaction
/// commits, and failures are logged rather than surfaced to the API caller.
#[axum::async_trait]
pub trait Notifier: Send + Sync {
    async fn send_status_email(&self, email: &StatusEmail) -> Result<(), NotifyError>;
}

/// Notifier that posts status emails as JSON to an HTTP mail relay
pub struct WebhookNotifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl WebhookNotifier {
    /// Build the notifier from the MAIL_WEBHOOK_URL environment variable
    ///
    /// When the variable is unset or empty the notifier is disabled and
    /// every send becomes a no-op.
    pub fn from_env() -> Self {
        let webhook_url = std::env::var("MAIL_WEBHOOK_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        if webhook_url.is_none() {
            tracing::info!("MAIL_WEBHOOK_URL not set, status emails are disabled");
        }

        Self {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }

    /// A notifier with no relay configured
    pub fn disabled() -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: None,
        }
    }
}

#[axum::async_trait]
impl Notifier for WebhookNotifier {
    async fn send_status_email(&self, email: &StatusEmail) -> Result<(), NotifyError> {
        let url = match &self.webhook_url {
            Some(url) => url,
            None => {
                tracing::debug!(
                    "Status email for booking {} skipped, relay disabled",
                    email.booking_id
                );
                return Ok(());
            }
        };

        let response = self
            .client
            .post(url)
            .json(email)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::RelayStatus(response.status().as_u16()));
        }

        tracing::info!(
            "Status email for booking {} dispatched ({})",
            email.booking_id,
            email.status
        );
        Ok(())
    }
}

/// Send a status email on a background task
///
/// Runs after the caller's transaction has committed so the payload always
/// reflects persisted state. Failures are logged and swallowed.
pub fn spawn_dispatch(notifier: Arc<dyn Notifier>, email: StatusEmail) {
    tokio::spawn(async move {
        if let Err(e) = notifier.send_status_email(&email).await {
            tracing::warn!(
                "Status email for booking {} failed: {}",
                email.booking_id,
                e
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_email(reason: Option<String>) -> StatusEmail {
        StatusEmail {
            booking_id: Uuid::new_v4(),
            status: "confirmed".to_string(),
            to_email: "guest@example.com".to_string(),
            to_name: "Guest".to_string(),
            total: dec!(850000),
            line_items: vec![EmailLineItem {
                homestay_id: 1,
                checkin_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                checkout_date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
                guests: 2,
                line_total: dec!(1000000),
            }],
            reason,
        }
    }

    #[test]
    fn test_reason_omitted_when_absent() {
        let json = serde_json::to_value(sample_email(None)).unwrap();
        assert!(json.get("reason").is_none());
        assert_eq!(json["status"], "confirmed");
        assert_eq!(json["line_items"][0]["guests"], 2);
    }

    #[test]
    fn test_reason_serialized_when_present() {
        let json = serde_json::to_value(sample_email(Some("cancelled by host rejection".into())))
            .unwrap();
        assert_eq!(json["reason"], "cancelled by host rejection");
    }

    #[tokio::test]
    async fn test_disabled_notifier_is_a_noop() {
        let notifier = WebhookNotifier::disabled();
        let result = notifier.send_status_email(&sample_email(None)).await;
        assert!(result.is_ok());
    }
}
