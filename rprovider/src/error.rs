//! Classified provider errors.
//!
//! ```rust
//! use std::time::Duration;
//!
//! use rprovider::ProviderError;
//!
//! let bad_request = ProviderError::http(400, "bad prompt");
//! assert!(!bad_request.is_retryable());
//!
//! let limited = ProviderError::rate_limited(Some(Duration::from_millis(400)));
//! assert!(limited.is_retryable());
//! assert_eq!(limited.retry_after_hint(), Some(Duration::from_millis(400)));
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

const RETRYABLE_HTTP_CODES: [u16; 2] = [429, 500];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorKind {
    Timeout,
    Http,
}

impl ProviderErrorKind {
    /// Stable label written to audit records.
    pub fn label(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Http => "http_error",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "timeout" => Some(Self::Timeout),
            "http_error" => Some(Self::Http),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub http_code: Option<u16>,
    pub retry_after: Option<Duration>,
    pub message: String,
}

impl ProviderError {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Timeout,
            http_code: None,
            retry_after: None,
            message: message.into(),
        }
    }

    pub fn http(code: u16, message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Http,
            http_code: Some(code),
            retry_after: None,
            message: message.into(),
        }
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::http(500, message)
    }

    pub fn rate_limited(retry_after: Option<Duration>) -> Self {
        Self {
            retry_after,
            ..Self::http(429, "rate limited")
        }
    }

    /// The upstream answered with a body that matches no known shape.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::http(502, message)
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    pub fn is_retryable(&self) -> bool {
        match self.kind {
            ProviderErrorKind::Timeout => true,
            ProviderErrorKind::Http => self
                .http_code
                .is_some_and(|code| RETRYABLE_HTTP_CODES.contains(&code)),
        }
    }

    /// Upstream-supplied delay, honored only on rate-limit responses.
    pub fn retry_after_hint(&self) -> Option<Duration> {
        match (self.kind, self.http_code) {
            (ProviderErrorKind::Http, Some(429)) => self.retry_after,
            _ => None,
        }
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.http_code {
            Some(code) => write!(f, "{:?}({code}): {}", self.kind, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for ProviderError {}
