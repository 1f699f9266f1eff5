//! Non-blocking feedback for user actions.
//!
//! Every action ends in exactly one [`Notification`], whether it succeeded or
//! failed. Nothing here panics or propagates an error back into the caller's
//! view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use crate::errors::{ConflictField, ErrorCategory, ServiceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// Inline message for one form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMessage {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub level: NotificationLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldMessage>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            message: message.into(),
            fields: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, message)
    }

    pub fn from_error(err: &ServiceError) -> Self {
        let (level, message) = match err.category() {
            ErrorCategory::Validation => (
                NotificationLevel::Warning,
                match err {
                    ServiceError::InvalidFields(_) => "Please correct the highlighted fields".to_string(),
                    other => other.to_string(),
                },
            ),
            ErrorCategory::Conflict => {
                let message = match err {
                    ServiceError::Conflict {
                        field: ConflictField::Slug,
                        ..
                    } => "A promotion with this title already exists",
                    _ => "A promotion with this code already exists",
                };
                (NotificationLevel::Warning, message.to_string())
            }
            ErrorCategory::NotFound => (
                NotificationLevel::Error,
                "This promotion no longer exists".to_string(),
            ),
            ErrorCategory::Unauthorized => (
                NotificationLevel::Error,
                "Please sign in again to manage promotions".to_string(),
            ),
            ErrorCategory::Network => (
                NotificationLevel::Error,
                format!("Could not reach the promotions service: {}", err),
            ),
            ErrorCategory::InFlight => (
                NotificationLevel::Info,
                "This action is already in progress".to_string(),
            ),
            ErrorCategory::Internal => (
                NotificationLevel::Error,
                format!("Unexpected error: {}", err),
            ),
        };

        let mut notification = Self::new(level, message);
        notification.fields = err
            .field_messages()
            .into_iter()
            .map(|(field, message)| FieldMessage { field, message })
            .collect();
        if let ServiceError::Conflict { field, message } = err {
            notification.fields.push(FieldMessage {
                field: field.to_string(),
                message: message.clone(),
            });
        }
        notification
    }

    /// Success message on `Ok`, the error's notification otherwise.
    pub fn from_result<T>(result: &Result<T, ServiceError>, success: impl Into<String>) -> Self {
        match result {
            Ok(_) => Self::success(success),
            Err(err) => Self::from_error(err),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self.level,
            NotificationLevel::Error | NotificationLevel::Warning
        )
    }
}

impl From<ServiceError> for Notification {
    fn from(err: ServiceError) -> Self {
        Notification::from_error(&err)
    }
}
