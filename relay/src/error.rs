//! Errors raised while assembling a gateway.

use std::error::Error;
use std::fmt::{Display, Formatter};

use rstore::StoreError;
use rturn::{TurnError, TurnErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    Config,
    Store,
    Turn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Config, message)
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Store, message)
    }

    pub fn turn(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Turn, message)
    }
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for GatewayError {}

impl From<StoreError> for GatewayError {
    fn from(error: StoreError) -> Self {
        Self::store(error.to_string())
    }
}

impl From<TurnError> for GatewayError {
    fn from(error: TurnError) -> Self {
        match error.kind {
            TurnErrorKind::Configuration => Self::config(error.message),
            TurnErrorKind::Store => Self::store(error.message),
            _ => Self::turn(error.to_string()),
        }
    }
}
