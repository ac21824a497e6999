//! Observer contract for turn state transitions.
//!
//! ```rust
//! use rturn::{NoopTurnHooks, TurnHooks, TurnPhase};
//!
//! fn accepts_hooks(_hooks: &dyn TurnHooks) {}
//!
//! accepts_hooks(&NoopTurnHooks);
//! assert!(TurnPhase::Cached.is_terminal());
//! assert!(!TurnPhase::AttemptFallback.is_terminal());
//! ```

use std::time::Duration;

use crate::{ProviderEvent, TurnError, TurnRequest, TurnResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnPhase {
    IdempotencyCheck,
    LoadContext,
    PersistUserTurn,
    AttemptPrimary,
    AttemptFallback,
    Finalize,
    Cached,
    Committed,
    Rejected,
}

impl TurnPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IdempotencyCheck => "idempotency_check",
            Self::LoadContext => "load_context",
            Self::PersistUserTurn => "persist_user_turn",
            Self::AttemptPrimary => "attempt_primary",
            Self::AttemptFallback => "attempt_fallback",
            Self::Finalize => "finalize",
            Self::Cached => "cached",
            Self::Committed => "committed",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cached | Self::Committed | Self::Rejected)
    }
}

pub trait TurnHooks: Send + Sync {
    fn on_phase_start(&self, _phase: TurnPhase, _request: &TurnRequest) {}

    fn on_provider_event(&self, _event: &ProviderEvent) {}

    /// `terminal` is either [`TurnPhase::Cached`] or [`TurnPhase::Committed`].
    fn on_turn_complete(
        &self,
        _terminal: TurnPhase,
        _request: &TurnRequest,
        _result: &TurnResult,
        _elapsed: Duration,
    ) {
    }

    fn on_turn_rejected(&self, _request: &TurnRequest, _error: &TurnError, _elapsed: Duration) {}

    fn on_claim_release_failure(&self, _request: &TurnRequest, _error: &TurnError) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTurnHooks;

impl TurnHooks for NoopTurnHooks {}
