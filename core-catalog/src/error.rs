use std::collections::BTreeMap;
use thiserror::Error;

/// Field name to message, ordered by field name.
pub type FieldErrors = BTreeMap<String, String>;

/// Every failure the catalog surfaces to its callers.
///
/// Produced only by the transport boundary and by local draft validation.
/// Exactly one variant describes a failed operation; the `message` is always
/// suitable for display.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Non-2xx status other than 400/404/409, or no response at all (`status: None`)
    #[error("{message}")]
    Network { status: Option<u16>, message: String },

    #[error("{message}")]
    NotFound { resource: String, message: String },

    #[error("{message}")]
    Conflict { resource: String, message: String },

    #[error("{message}")]
    Validation {
        field_errors: FieldErrors,
        message: String,
    },

    /// Malformed payloads, missing capabilities and other unexpected failures
    #[error("{message}")]
    Unknown { cause: String, message: String },
}

impl AppError {
    pub fn network(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Network {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            message: message.into(),
        }
    }

    pub fn conflict(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            resource: resource.into(),
            message: message.into(),
        }
    }

    pub fn validation(field_errors: FieldErrors, message: impl Into<String>) -> Self {
        Self::Validation {
            field_errors,
            message: message.into(),
        }
    }

    pub fn unknown(cause: impl Into<String>) -> Self {
        Self::Unknown {
            cause: cause.into(),
            message: "Unexpected error".to_string(),
        }
    }

    /// Variant name, for logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Network { .. } => "Network",
            AppError::NotFound { .. } => "NotFound",
            AppError::Conflict { .. } => "Conflict",
            AppError::Validation { .. } => "Validation",
            AppError::Unknown { .. } => "Unknown",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Network { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Conflict { message, .. }
            | AppError::Validation { message, .. }
            | AppError::Unknown { message, .. } => message,
        }
    }

    /// HTTP status that produced this error, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Network { status, .. } => *status,
            AppError::NotFound { .. } => Some(404),
            AppError::Conflict { .. } => Some(409),
            AppError::Validation { .. } => Some(400),
            AppError::Unknown { .. } => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound { .. })
    }

    /// One display line. Validation errors list each field as
    /// `field: message`, joined with `; `.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation { field_errors, .. } if !field_errors.is_empty() => {
                field_errors
                    .iter()
                    .map(|(field, msg)| format!("{}: {}", field, msg))
                    .collect::<Vec<_>>()
                    .join("; ")
            }
            other => other.message().to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_joins_field_errors() {
        let mut fields = FieldErrors::new();
        fields.insert("title".into(), "Title is required".into());
        fields.insert("genres".into(), "Select at least one genre".into());
        let err = AppError::validation(fields, "Validation failed");

        assert_eq!(
            err.user_message(),
            "genres: Select at least one genre; title: Title is required"
        );
        assert_eq!(err.to_string(), "Validation failed");
    }

    #[test]
    fn test_user_message_falls_back_to_message() {
        let err = AppError::validation(FieldErrors::new(), "Bad payload");
        assert_eq!(err.user_message(), "Bad payload");

        let err = AppError::network(Some(503), "Service unavailable");
        assert_eq!(err.user_message(), "Service unavailable");
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.kind(), "Network");
    }

    #[test]
    fn test_unknown_has_generic_message() {
        let err = AppError::unknown("expected value at line 1 column 1");
        assert_eq!(err.message(), "Unexpected error");
        assert!(matches!(err, AppError::Unknown { ref cause, .. } if cause.contains("line 1")));
    }
}
