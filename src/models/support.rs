//! Support ticket models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

pub const MAX_SUBJECT_LEN: usize = 200;
pub const MAX_MESSAGE_LEN: usize = 5_000;

/// Represents a support ticket record from the database.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct SupportTicket {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject: String,
    pub message: String,
    /// "LOW", "NORMAL" or "HIGH"
    pub priority: String,
    /// "OPEN" or "CLOSED"
    pub status: String,
    /// Whether the support webhook accepted the ticket
    pub notified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Normal => "NORMAL",
            Priority::High => "HIGH",
        }
    }
}

/// Body for `POST /api/support`.
///
/// ```json
/// { "subject": "Can't export", "message": "The Excel export hangs", "priority": "HIGH" }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub priority: Priority,
}

impl CreateTicketRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let subject = self.subject.trim();
        if subject.is_empty() || subject.chars().count() > MAX_SUBJECT_LEN {
            return Err(AppError::InvalidRequest(format!(
                "Subject must be between 1 and {} characters",
                MAX_SUBJECT_LEN
            )));
        }
        let message = self.message.trim();
        if message.is_empty() || message.chars().count() > MAX_MESSAGE_LEN {
            return Err(AppError::InvalidRequest(format!(
                "Message must be between 1 and {} characters",
                MAX_MESSAGE_LEN
            )));
        }
        Ok(())
    }
}

/// JSON body sent to the support webhook.
#[derive(Debug, Serialize)]
pub struct SupportNotification {
    pub event: &'static str,
    pub ticket_id: Uuid,
    pub company_name: String,
    pub user_email: String,
    pub subject: String,
    pub message: String,
    pub priority: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_defaults_to_normal() {
        let request: CreateTicketRequest =
            serde_json::from_str(r#"{"subject":"Hi","message":"Help"}"#).unwrap();
        assert_eq!(request.priority, Priority::Normal);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn blank_or_oversized_fields_are_rejected() {
        let blank = CreateTicketRequest {
            subject: "  ".to_string(),
            message: "Help".to_string(),
            priority: Priority::Low,
        };
        assert!(blank.validate().is_err());

        let long = CreateTicketRequest {
            subject: "Export".to_string(),
            message: "x".repeat(MAX_MESSAGE_LEN + 1),
            priority: Priority::High,
        };
        assert!(long.validate().is_err());
    }
}
