use std::fmt;

use rusqlite;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, warn};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorCode {
    HttpTimeout,
    ServiceUnavailable,
    ServerError,
    RateLimited,
    InvalidResponse,
    InvalidRequest,
    Unknown,
}

impl RemoteErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            RemoteErrorCode::HttpTimeout => "HTTP_TIMEOUT",
            RemoteErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            RemoteErrorCode::ServerError => "SERVER_ERROR",
            RemoteErrorCode::RateLimited => "RATE_LIMITED",
            RemoteErrorCode::InvalidResponse => "INVALID_RESPONSE",
            RemoteErrorCode::InvalidRequest => "INVALID_REQUEST",
            RemoteErrorCode::Unknown => "UNKNOWN_REMOTE_ERROR",
        }
    }

    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            RemoteErrorCode::HttpTimeout
                | RemoteErrorCode::ServiceUnavailable
                | RemoteErrorCode::RateLimited
        )
    }
}

impl fmt::Display for RemoteErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {message}")]
    Database { message: String },

    #[error("record not found")]
    NotFound,

    #[error("validation failed: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        details: Option<JsonValue>,
    },

    #[error("{message}")]
    Remote {
        code: RemoteErrorCode,
        message: String,
        correlation_id: Option<String>,
        details: Option<JsonValue>,
    },

    #[error("{0} must be used within its provider")]
    MissingProvider(&'static str),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::validation", %message, "validation error");
        AppError::Validation {
            message,
            source: None,
            details: None,
        }
    }

    pub fn remote(code: RemoteErrorCode, message: impl Into<String>) -> Self {
        Self::remote_with_details(code, message, None, None)
    }

    pub fn remote_with_details(
        code: RemoteErrorCode,
        message: impl Into<String>,
        correlation_id: Option<&str>,
        details: Option<JsonValue>,
    ) -> Self {
        let message = message.into();
        let correlation = correlation_id.map(|value| value.to_string());
        match (&correlation, &details) {
            (Some(id), Some(payload)) => {
                warn!(
                    target: "app::inference::error",
                    code = %code,
                    correlation_id = %id,
                    details = %payload,
                    %message
                );
            }
            (Some(id), None) => {
                warn!(
                    target: "app::inference::error",
                    code = %code,
                    correlation_id = %id,
                    %message
                );
            }
            (None, Some(payload)) => {
                warn!(target: "app::inference::error", code = %code, details = %payload, %message);
            }
            (None, None) => {
                warn!(target: "app::inference::error", code = %code, %message);
            }
        }

        AppError::Remote {
            code,
            message,
            correlation_id: correlation,
            details,
        }
    }

    pub fn remote_code(&self) -> Option<RemoteErrorCode> {
        match self {
            AppError::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn remote_correlation_id(&self) -> Option<&str> {
        match self {
            AppError::Remote { correlation_id, .. } => correlation_id.as_deref(),
            _ => None,
        }
    }

    /// Text shown to the user. Server-reported errors pass through verbatim,
    /// transport failures get a retry hint.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Remote { code, message, .. } => match code {
                RemoteErrorCode::ServerError | RemoteErrorCode::InvalidRequest => message.clone(),
                RemoteErrorCode::HttpTimeout => {
                    "The request timed out. Please try again or check your connection.".to_string()
                }
                RemoteErrorCode::ServiceUnavailable => {
                    "Could not connect to the analysis server. Please try again later.".to_string()
                }
                RemoteErrorCode::RateLimited => {
                    "The server is busy. Please wait a moment and try again.".to_string()
                }
                RemoteErrorCode::InvalidResponse | RemoteErrorCode::Unknown => {
                    "An unexpected error occurred. Please try again.".to_string()
                }
            },
            AppError::Validation { message, .. } => message.clone(),
            _ => "An unexpected error occurred. Please try again.".to_string(),
        }
    }

    pub fn not_found() -> Self {
        warn!(target: "app::database", "resource not found");
        AppError::NotFound
    }

    pub fn database(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::database", %message, "database error");
        AppError::Database { message }
    }

    pub fn missing_provider(scope: &'static str) -> Self {
        error!(target: "app::scope", scope, "state consumed outside of its provider");
        AppError::MissingProvider(scope)
    }

    pub fn other(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::other", %message, "other error");
        AppError::Other(message)
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(error: rusqlite::Error) -> Self {
        use rusqlite::Error::QueryReturnedNoRows;

        match &error {
            QueryReturnedNoRows => AppError::not_found(),
            _ => {
                error!(target: "app::database", error = ?error, "sqlite error");
                AppError::database(error.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_shown_verbatim() {
        let err = AppError::remote(RemoteErrorCode::ServerError, "No human detected in the video.");
        assert_eq!(err.user_message(), "No human detected in the video.");
        assert_eq!(err.remote_code(), Some(RemoteErrorCode::ServerError));
    }

    #[test]
    fn transport_errors_suggest_retry() {
        let timeout = AppError::remote(RemoteErrorCode::HttpTimeout, "analyze timed out");
        assert!(timeout.user_message().contains("timed out"));
        assert!(RemoteErrorCode::HttpTimeout.is_retryable());

        let offline = AppError::remote(RemoteErrorCode::ServiceUnavailable, "connect refused");
        assert!(offline.user_message().contains("Could not connect"));
        assert!(!RemoteErrorCode::ServerError.is_retryable());
    }
}
