use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{ApiError, FieldErrors};
use crate::notifications::repo::NotificationRow;

#[derive(Debug, Deserialize)]
pub struct CreateNotificationRequest {
    pub message: String,
    pub notification_type: String,
}

impl CreateNotificationRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        if self.message.is_empty() {
            errors.push("message", "This field may not be blank.");
        }
        if self.notification_type.is_empty() {
            errors.push("notification_type", "This field may not be blank.");
        }
        errors.into_result()
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateNotificationRequest {
    pub message: Option<String>,
    pub notification_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub username: String,
    pub message: String,
    pub notification_type: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<NotificationRow> for NotificationResponse {
    fn from(r: NotificationRow) -> Self {
        Self {
            id: r.id,
            username: r.username,
            message: r.message,
            notification_type: r.notification_type,
            created_at: r.created_at,
        }
    }
}
