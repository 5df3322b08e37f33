//! Error types for Turnstile
//!
//! Every failure carries an HTTP status, a stable reason code and a human
//! detail string. Boundary handlers turn these into the JSON envelope
//! `{"error": {"code", "reason", "details"}}`.

use hyper::StatusCode;
use serde::Serialize;

pub const ERR_AUTH_MISSING: &str = "ERR_AUTH_MISSING";
pub const ERR_WRONG_AUTH_FORMAT: &str = "ERR_WRONG_AUTH_FORMAT";
pub const ERR_AUTH_MISSING_BEARER: &str = "ERR_AUTH_MISSING_BEARER";
pub const ERR_INVALID_TOKEN: &str = "ERR_INVALID_TOKEN";
pub const ERR_TOKEN_EXPIRED: &str = "ERR_TOKEN_EXPIRED";
pub const ERR_NOT_AUTHORIZED: &str = "ERR_NOT_AUTHORIZED";
pub const ERR_INVALID_INPUT: &str = "ERR_INVALID_INPUT";
pub const ERR_STORE_UNAVAILABLE: &str = "ERR_STORE_UNAVAILABLE";
pub const ERR_INTERNAL: &str = "ERR_INTERNAL";
pub const ERR_CONFIG: &str = "ERR_CONFIG";

/// Main error type for Turnstile operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TurnstileError {
    #[error("ERR_AUTH_MISSING: {0}")]
    AuthMissing(String),

    #[error("ERR_WRONG_AUTH_FORMAT: {0}")]
    InvalidAuthFormat(String),

    #[error("ERR_AUTH_MISSING_BEARER: {0}")]
    AuthMissingBearer(String),

    #[error("ERR_INVALID_TOKEN: {0}")]
    InvalidToken(String),

    #[error("ERR_TOKEN_EXPIRED: {0}")]
    TokenExpired(String),

    #[error("ERR_NOT_AUTHORIZED: {0}")]
    NotAuthorized(String),

    #[error("ERR_INVALID_INPUT: {0}")]
    InvalidInput(String),

    #[error("ERR_STORE_UNAVAILABLE: {0}")]
    StoreUnavailable(String),

    #[error("ERR_INTERNAL: {0}")]
    Internal(String),

    #[error("ERR_CONFIG: {0}")]
    Config(String),
}

impl TurnstileError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthMissing(_)
            | Self::InvalidAuthFormat(_)
            | Self::AuthMissingBearer(_)
            | Self::InvalidToken(_)
            | Self::TokenExpired(_) => StatusCode::UNAUTHORIZED,
            Self::NotAuthorized(_) => StatusCode::FORBIDDEN,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable reason code
    pub fn reason(&self) -> &'static str {
        match self {
            Self::AuthMissing(_) => ERR_AUTH_MISSING,
            Self::InvalidAuthFormat(_) => ERR_WRONG_AUTH_FORMAT,
            Self::AuthMissingBearer(_) => ERR_AUTH_MISSING_BEARER,
            Self::InvalidToken(_) => ERR_INVALID_TOKEN,
            Self::TokenExpired(_) => ERR_TOKEN_EXPIRED,
            Self::NotAuthorized(_) => ERR_NOT_AUTHORIZED,
            Self::InvalidInput(_) => ERR_INVALID_INPUT,
            Self::StoreUnavailable(_) => ERR_STORE_UNAVAILABLE,
            Self::Internal(_) => ERR_INTERNAL,
            Self::Config(_) => ERR_CONFIG,
        }
    }

    /// Human-readable detail
    pub fn details(&self) -> &str {
        match self {
            Self::AuthMissing(d)
            | Self::InvalidAuthFormat(d)
            | Self::AuthMissingBearer(d)
            | Self::InvalidToken(d)
            | Self::TokenExpired(d)
            | Self::NotAuthorized(d)
            | Self::InvalidInput(d)
            | Self::StoreUnavailable(d)
            | Self::Internal(d)
            | Self::Config(d) => d,
        }
    }

    /// Whether the caller may retry the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }

    /// Build the JSON error envelope for this error
    pub fn to_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorBody {
                code: self.status_code().as_u16(),
                reason: self.reason(),
                details: self.details().to_string(),
            },
        }
    }

    /// Convert to status code and serialized envelope for HTTP response
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        let status = self.status_code();
        let body = serde_json::to_string(&self.to_envelope())
            .unwrap_or_else(|_| format!(r#"{{"error":{{"reason":"{}"}}}}"#, self.reason()));
        (status, body)
    }
}

/// `{"error": {...}}` wrapper returned by every failing endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub reason: &'static str,
    pub details: String,
}

impl From<std::io::Error> for TurnstileError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for TurnstileError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for TurnstileError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for TurnstileError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

/// Result type alias for Turnstile operations
pub type Result<T> = std::result::Result<T, TurnstileError>;
