//! Stable error taxonomy shared by every crate in the workspace.
//!
//! Callers discriminate on `ErrorKind`, never on message text.

use shared_types::Id;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    InvalidArgument,
    InvalidState,
    AtCapacity,
    Closed,
    RateLimited,
    Transient,
    NotificationFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::AtCapacity => "at_capacity",
            ErrorKind::Closed => "closed",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Transient => "transient",
            ErrorKind::NotificationFailed => "notification_failed",
        }
    }
}

/// Extra identifiers attached to an error for log correlation.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub entity_id: Option<Id>,
    pub tenant_id: Option<Id>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub struct QueueError {
    pub kind: ErrorKind,
    pub message: String,
    pub context: ErrorContext,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl QueueError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), context: ErrorContext::default() }
    }

    pub fn with_tenant(mut self, tenant_id: Id) -> Self {
        self.context.tenant_id = Some(tenant_id);
        self
    }

    pub fn with_entity(mut self, entity_id: Id) -> Self {
        self.context.entity_id = Some(entity_id);
        self
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, msg)
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, msg)
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidState, msg)
    }

    pub fn at_capacity(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::AtCapacity, msg)
    }

    pub fn closed(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Closed, msg)
    }

    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, msg)
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, msg)
    }

    pub fn notification_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotificationFailed, msg)
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::Transient)
    }
}

impl From<sqlx::Error> for QueueError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => QueueError::not_found("row not found"),
            other => {
                tracing::error!(error = %other, "store error");
                QueueError::transient(format!("store error: {other}"))
            },
        }
    }
}

impl From<redis::RedisError> for QueueError {
    fn from(err: redis::RedisError) -> Self {
        tracing::warn!(error = %err, "cache error");
        QueueError::transient(format!("cache error: {err}"))
    }
}

impl From<jsonwebtoken::errors::Error> for QueueError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        QueueError::unauthorized(format!("invalid token: {err}"))
    }
}
