//! # Error Handling
//!
//! Two error families live here:
//!
//! - [`AppError`]: failures of HTTP handlers, converted into JSON responses through
//!   actix-web's `ResponseError`
//! - [`SessionError`]: failures while processing one WebSocket frame. All but
//!   `TransportFailure` are recoverable and become an outbound error message
//!   while the session stays open.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Errors returned by HTTP handlers.
///
/// ## HTTP Status Code Mapping:
/// - Internal/ConfigError -> 500
/// - BadRequest -> 400
/// - ServiceUnavailable -> 503
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The server cannot take another session right now (limit reached, shutting down)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    fn kind(&self) -> (StatusCode, &'static str, &str) {
        match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AppError::ConfigError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error", msg),
            AppError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg)
            }
        }
    }
}

/// JSON error body:
///
/// ```json
/// {
///   "error": {
///     "type": "service_unavailable",
///     "message": "Maximum concurrent sessions (100) reached",
///     "timestamp": "2025-01-01T12:00:00Z"
///   }
/// }
/// ```
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.kind().0
    }

    fn error_response(&self) -> HttpResponse {
        let (status, error_type, message) = self.kind();

        HttpResponse::build(status).json(json!({
            "error": {
                "type": error_type,
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        }))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(format!("{:#}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

/// Per-frame failures of a WebSocket session.
///
/// The `Display` text of the recoverable variants is exactly what the client
/// receives in the `message` field of the error message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// No speech model is loaded; audio frames cannot be decoded
    #[error("Speech recognition not available")]
    EngineUnavailable,

    /// The recognizer could not read or decode the utterance
    #[error("{0}")]
    DecodeFailure(String),

    /// Unexpected fault while extracting or formatting a query
    #[error("Error: {0}")]
    ExtractionFailure(String),

    /// A text frame that cannot be interpreted as a query
    #[error("Invalid message: {0}")]
    MalformedFrame(String),

    /// The connection is gone; nothing more can be sent
    #[error("Transport failure: {0}")]
    TransportFailure(String),
}

impl SessionError {
    /// Whether the session keeps running after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SessionError::TransportFailure(_))
    }
}
