//! Error types for everything above the wire protocol.
//!
//! `DbError` lives in [`crate::db`] instead of here because it needs
//! `#[from] sqlx::Error` in scope next to the repository code that produces
//! it; keeping it there avoids a dependency edge from this module back into
//! `sqlx` for a type only `db` constructs.

use superchat_proto::payload::{ErrorPayload, WireErrorCode};
use thiserror::Error;

/// Errors a session command handler can produce. Each maps onto exactly one
/// [`WireErrorCode`] so the client always gets a machine-readable reason.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("rate limited")]
    RateLimited { retry_after_secs: Option<u32> },
    #[error("banned: {reason}")]
    Banned {
        reason: String,
        until_ms: Option<u64>,
    },
    #[error("registration required, code={code}")]
    NeedRegistration { code: String },
    #[error("not found")]
    NotFound,
    #[error("try again")]
    TryAgain,
    #[error("internal error: {0}")]
    Internal(String),
    #[error(transparent)]
    Db(#[from] crate::db::DbError),
}

impl HandlerError {
    pub fn error_code(&self) -> &'static str {
        match self {
            HandlerError::NotAuthenticated => "not_authenticated",
            HandlerError::Forbidden(_) => "forbidden",
            HandlerError::Validation(_) => "validation",
            HandlerError::RateLimited { .. } => "rate_limited",
            HandlerError::Banned { .. } => "banned",
            HandlerError::NeedRegistration { .. } => "need_registration",
            HandlerError::NotFound => "not_found",
            HandlerError::TryAgain => "try_again",
            HandlerError::Internal(_) => "internal",
            HandlerError::Db(_) => "internal",
        }
    }

    /// Translate into the wire-level reply. `in_reply_to` is the raw type
    /// byte of the request being refused.
    pub fn wire_error(&self, in_reply_to: Option<u8>) -> ErrorPayload {
        let (code, retry_after_secs) = match self {
            HandlerError::NotAuthenticated => (WireErrorCode::NotAuthenticated, None),
            HandlerError::Forbidden(_) => (WireErrorCode::Forbidden, None),
            HandlerError::Validation(_) => (WireErrorCode::Validation, None),
            HandlerError::RateLimited { retry_after_secs } => {
                (WireErrorCode::RateLimited, *retry_after_secs)
            }
            HandlerError::Banned { .. } => (WireErrorCode::Banned, None),
            HandlerError::NeedRegistration { .. } => (WireErrorCode::NeedRegistration, None),
            HandlerError::NotFound => (WireErrorCode::NotFound, None),
            HandlerError::TryAgain => (WireErrorCode::TryAgain, None),
            HandlerError::Internal(_) | HandlerError::Db(_) => (WireErrorCode::Internal, None),
        };
        ErrorPayload {
            code,
            message: self.to_string(),
            in_reply_to,
            retry_after_secs,
        }
    }
}
