//! Error Handling Module
//!
//! Single crate-wide error type for the planning core. Transport and parsing
//! failures carry their message; session/quota conditions are first-class
//! variants so callers can branch on them instead of string-matching.

use thiserror::Error;

/// Errors produced by the planning core and its provider adapters.
#[derive(Debug, Clone, Error)]
pub enum PlanError {
    /// HTTP-level error (non-success status, unreadable body, bad request build)
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The provider stream failed mid-flight
    #[error("Stream error: {0}")]
    StreamError(String),

    /// A provider frame or payload could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Request timed out before or during streaming
    #[error("Timeout: {0}")]
    TimeoutError(String),

    /// Connection could not be established
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Caller supplied an invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Session has no remaining prepaid quota
    #[error("Quota exhausted for session {session_id}")]
    QuotaExhausted { session_id: String },

    /// Session id is unknown or has been swept after its TTL
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Session exists but belongs to a different user
    #[error("Session {0} belongs to another user")]
    SessionForbidden(String),

    /// Invariant violation inside the core
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl PlanError {
    /// Conventional HTTP status for business conditions, for callers that
    /// expose the session API over request/response semantics.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::QuotaExhausted { .. } => Some(402),
            Self::SessionForbidden(_) => Some(403),
            Self::SessionNotFound(_) => Some(404),
            Self::InvalidParameter(_) => Some(400),
            _ => None,
        }
    }

    /// Whether the caller may reasonably retry the operation.
    ///
    /// Transport failures are recoverable (retry is the caller's decision);
    /// session/quota outcomes and parse failures are not.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::HttpError(_)
                | Self::StreamError(_)
                | Self::TimeoutError(_)
                | Self::ConnectionError(_)
        )
    }
}
