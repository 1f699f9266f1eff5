use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Which unique key a conflict was raised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConflictField {
    Code,
    Slug,
}

/// Machine-readable kind carried by a structured API error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    Conflict,
    Validation,
    NotFound,
    Unauthorized,
    #[serde(other)]
    Unknown,
}

/// Structured error payload returned by the promotions API.
///
/// Servers that predate this payload only send a prose `message`; see
/// [`ServiceError::from_api_failure`] for the fallback classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<ConflictField>,
    pub kind: ApiErrorKind,
    #[serde(default)]
    pub message: String,
}

/// Coarse error taxonomy used when turning failures into notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    Conflict,
    NotFound,
    Unauthorized,
    Network,
    InFlight,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Validation error: {0}")]
    InvalidFields(#[from] validator::ValidationErrors),

    #[error("Conflict on {field}: {message}")]
    Conflict {
        field: ConflictField,
        message: String,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Request already in flight: {0}")]
    RequestInFlight(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("External API error ({status:?}): {message}")]
    ExternalApiError {
        status: Option<u16>,
        message: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::InvalidResponse(err.to_string())
        } else {
            ServiceError::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl From<url::ParseError> for ServiceError {
    fn from(err: url::ParseError) -> Self {
        ServiceError::ConfigError(format!("invalid URL: {}", err))
    }
}

impl ServiceError {
    /// Builds a conflict error for the given key.
    pub fn conflict(field: ConflictField, message: impl Into<String>) -> Self {
        ServiceError::Conflict {
            field,
            message: message.into(),
        }
    }

    /// Maps a failed API response onto an error.
    ///
    /// A structured body wins. Without one, the HTTP status decides the kind
    /// and a conflict's field is recovered from the message text.
    pub fn from_api_failure(
        status: Option<u16>,
        structured: Option<ApiErrorBody>,
        message: Option<String>,
    ) -> Self {
        if let Some(body) = structured {
            let message = if body.message.is_empty() {
                message.unwrap_or_default()
            } else {
                body.message
            };
            return match body.kind {
                ApiErrorKind::Conflict => {
                    let field = body
                        .field
                        .unwrap_or_else(|| conflict_field_from_message(&message));
                    ServiceError::conflict(field, message)
                }
                ApiErrorKind::Validation => ServiceError::ValidationError(message),
                ApiErrorKind::NotFound => ServiceError::NotFound(message),
                ApiErrorKind::Unauthorized => ServiceError::Unauthorized(message),
                ApiErrorKind::Unknown => ServiceError::ExternalApiError { status, message },
            };
        }

        let message = message.unwrap_or_else(|| "request failed".to_string());
        match status {
            Some(404) => ServiceError::NotFound(message),
            Some(401) | Some(403) => ServiceError::Unauthorized(message),
            Some(409) => {
                let field = conflict_field_from_message(&message);
                ServiceError::conflict(field, message)
            }
            _ if looks_like_duplicate(&message) => {
                let field = conflict_field_from_message(&message);
                ServiceError::conflict(field, message)
            }
            Some(400) | Some(422) => ServiceError::ValidationError(message),
            _ => ServiceError::ExternalApiError { status, message },
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ValidationError(_) | Self::InvalidFields(_) | Self::InvalidOperation(_) => {
                ErrorCategory::Validation
            }
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::Unauthorized(_) => ErrorCategory::Unauthorized,
            Self::NetworkError(_) | Self::ExternalApiError { .. } | Self::InvalidResponse(_) => {
                ErrorCategory::Network
            }
            Self::RequestInFlight(_) => ErrorCategory::InFlight,
            Self::ConfigError(_) | Self::SerializationError(_) | Self::Other(_) => {
                ErrorCategory::Internal
            }
        }
    }

    /// Per-field messages for inline display, empty for non-field errors.
    pub fn field_messages(&self) -> Vec<(String, String)> {
        let Self::InvalidFields(errors) = self else {
            return Vec::new();
        };

        let mut messages: Vec<(String, String)> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |err| {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string());
                    (field.to_string(), message)
                })
            })
            .collect();
        messages.sort();
        messages
    }
}

/// Legacy servers only say "duplicate key ... code" in prose.
fn conflict_field_from_message(message: &str) -> ConflictField {
    let lower = message.to_lowercase();
    if lower.contains("slug") {
        ConflictField::Slug
    } else {
        ConflictField::Code
    }
}

fn looks_like_duplicate(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("duplicate") || lower.contains("already exists")
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use validator::{ValidationError, ValidationErrors};

    #[test]
    fn structured_conflict_uses_field_from_body() {
        let err = ServiceError::from_api_failure(
            Some(400),
            Some(ApiErrorBody {
                field: Some(ConflictField::Slug),
                kind: ApiErrorKind::Conflict,
                message: "taken".into(),
            }),
            None,
        );
        assert_matches!(
            err,
            ServiceError::Conflict {
                field: ConflictField::Slug,
                ..
            }
        );
    }

    #[test]
    fn legacy_conflict_falls_back_to_message_text() {
        let err = ServiceError::from_api_failure(
            Some(409),
            None,
            Some("Promotion with this code already exists".into()),
        );
        assert_matches!(
            err,
            ServiceError::Conflict {
                field: ConflictField::Code,
                ..
            }
        );

        let err = ServiceError::from_api_failure(
            Some(400),
            None,
            Some("Duplicate slug weekend-20-off".into()),
        );
        assert_matches!(
            err,
            ServiceError::Conflict {
                field: ConflictField::Slug,
                ..
            }
        );
    }

    #[test]
    fn status_codes_map_to_categories() {
        let not_found = ServiceError::from_api_failure(Some(404), None, None);
        assert_eq!(not_found.category(), ErrorCategory::NotFound);

        let invalid = ServiceError::from_api_failure(Some(422), None, Some("bad date".into()));
        assert_eq!(invalid.category(), ErrorCategory::Validation);

        let upstream = ServiceError::from_api_failure(Some(502), None, None);
        assert_eq!(upstream.category(), ErrorCategory::Network);
    }

    #[test]
    fn field_messages_are_sorted_and_fall_back_to_code() {
        let mut errors = ValidationErrors::new();
        let mut with_message = ValidationError::new("window");
        with_message.message = Some("End date must be after start date".into());
        errors.add("end_date", with_message);
        errors.add("code", ValidationError::new("required"));

        let err = ServiceError::from(errors);
        assert_eq!(
            err.field_messages(),
            vec![
                ("code".to_string(), "required".to_string()),
                (
                    "end_date".to_string(),
                    "End date must be after start date".to_string()
                ),
            ]
        );
    }
}
