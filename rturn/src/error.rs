//! Turn-layer errors and classification.

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnErrorKind {
    InvalidRequest,
    NotFound,
    UpstreamUnavailable,
    InProgress,
    Configuration,
    Store,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnError {
    pub kind: TurnErrorKind,
    pub message: String,
}

impl TurnError {
    pub fn new(kind: TurnErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(TurnErrorKind::InvalidRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(TurnErrorKind::NotFound, message)
    }

    pub fn upstream_unavailable(message: impl Into<String>) -> Self {
        Self::new(TurnErrorKind::UpstreamUnavailable, message)
    }

    pub fn in_progress(message: impl Into<String>) -> Self {
        Self::new(TurnErrorKind::InProgress, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(TurnErrorKind::Configuration, message)
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(TurnErrorKind::Store, message)
    }

    /// Whether the caller may resubmit the same idempotency key later.
    pub fn is_retryable_by_caller(&self) -> bool {
        matches!(
            self.kind,
            TurnErrorKind::UpstreamUnavailable | TurnErrorKind::InProgress | TurnErrorKind::Store
        )
    }
}

impl Display for TurnError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for TurnError {}
