use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;

use super::domain::Permit;

/// Alert dispatch error. Failed sends are logged by the caller and never
/// retried; notification loss is an accepted trade-off.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("alert transport unavailable: {0}")]
    Transport(String),
    #[error("alert endpoint rejected the message with status {status}")]
    Rejected { status: u16 },
}

/// Outbound text-message hook. One call delivers one message to one phone
/// number; the monitor fans a permit's alert out to both stakeholders.
#[async_trait]
pub trait AlertGateway: Send + Sync {
    async fn send(&self, phone: &str, body: &str) -> Result<(), NotifyError>;
}

/// Reminder body for a permit inside the expiring-soon window.
pub fn expiring_soon_message(permit: &Permit, days_remaining: i64, end: NaiveDate) -> String {
    format!(
        "Scaffold permit reminder: {} / {} is valid for {} more day(s), through {}. \
         Arrange renewal or dismantling before the end date.",
        permit.area, permit.sub_area, days_remaining, end
    )
}

/// Urgent body for a permit whose validity ran out with the current day.
pub fn expired_today_message(permit: &Permit) -> String {
    format!(
        "URGENT: the scaffold permit for {} / {} has expired as of today. \
         Renew it immediately or schedule dismantling.",
        permit.area, permit.sub_area
    )
}

#[derive(Serialize)]
struct OutboundMessage<'a> {
    phone: &'a str,
    message: &'a str,
}

/// Client for the messaging endpoint: JSON body with recipient and text,
/// bearer-token authentication.
pub struct MessagingGateway {
    http: reqwest::Client,
    endpoint: String,
    bearer_token: String,
}

impl MessagingGateway {
    pub fn new(config: &crate::config::AlertGatewayConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            bearer_token: config.bearer_token.clone(),
        }
    }
}

impl std::fmt::Debug for MessagingGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagingGateway")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AlertGateway for MessagingGateway {
    async fn send(&self, phone: &str, body: &str) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.bearer_token)
            .json(&OutboundMessage {
                phone,
                message: body,
            })
            .send()
            .await
            .map_err(|err| NotifyError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotifyError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permits::domain::PermitStatus;

    fn permit() -> Permit {
        Permit {
            id: Some("abc123".to_string()),
            area: "North Yard".to_string(),
            sub_area: "Bay 3".to_string(),
            start_date: "2024-01-01".to_string(),
            estimated_end_date: "2024-01-10".to_string(),
            leader_name: "Lead".to_string(),
            executor_name: "Exec".to_string(),
            leader_phone: "+15550001".to_string(),
            executor_phone: "+15550002".to_string(),
            status: PermitStatus::Active,
        }
    }

    #[test]
    fn reminder_names_the_location_and_days_remaining() {
        let end = NaiveDate::from_ymd_opt(2024, 1, 10).expect("valid date");
        let body = expiring_soon_message(&permit(), 3, end);
        assert!(body.contains("North Yard / Bay 3"));
        assert!(body.contains("3 more day(s)"));
        assert!(body.contains("2024-01-10"));
    }

    #[test]
    fn urgent_body_reads_differently_from_the_reminder() {
        let body = expired_today_message(&permit());
        assert!(body.starts_with("URGENT"));
        assert!(body.contains("expired as of today"));
    }
}
