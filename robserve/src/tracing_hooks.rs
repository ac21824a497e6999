//! Structured `tracing` events for provider attempts and turn phases.
//!
//! ```rust
//! use robserve::TracingObservabilityHooks;
//! use rturn::TurnHooks;
//!
//! fn accepts_turn_hooks(_hooks: &dyn TurnHooks) {}
//!
//! accepts_turn_hooks(&TracingObservabilityHooks);
//! ```

use std::time::Duration;

use rprovider::{ProviderError, ProviderId, ProviderOperationHooks};
use rturn::{EventStatus, ProviderEvent, TurnError, TurnHooks, TurnPhase, TurnRequest, TurnResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservabilityHooks;

impl ProviderOperationHooks for TracingObservabilityHooks {
    fn on_attempt_start(&self, provider: ProviderId, attempt: u32) {
        tracing::debug!(
            phase = "provider",
            event = "attempt_start",
            provider = %provider,
            attempt
        );
    }

    fn on_timeout(&self, provider: ProviderId, attempt: u32, timeout: Duration) {
        tracing::warn!(
            phase = "provider",
            event = "timeout",
            provider = %provider,
            attempt,
            timeout_ms = timeout.as_millis() as u64
        );
    }

    fn on_retry_scheduled(
        &self,
        provider: ProviderId,
        attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        tracing::warn!(
            phase = "provider",
            event = "retry_scheduled",
            provider = %provider,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error_kind = error.kind.label(),
            http_code = error.http_code,
            error = %error
        );
    }

    fn on_success(&self, provider: ProviderId, attempts: u32) {
        tracing::info!(
            phase = "provider",
            event = "success",
            provider = %provider,
            attempts
        );
    }

    fn on_failure(&self, provider: ProviderId, attempts: u32, error: &ProviderError) {
        tracing::error!(
            phase = "provider",
            event = "failure",
            provider = %provider,
            attempts,
            error_kind = error.kind.label(),
            http_code = error.http_code,
            retryable = error.is_retryable(),
            error = %error
        );
    }
}

impl TurnHooks for TracingObservabilityHooks {
    fn on_phase_start(&self, phase: TurnPhase, request: &TurnRequest) {
        tracing::debug!(
            phase = phase.as_str(),
            event = "phase_start",
            tenant_id = %request.tenant_id,
            session_id = %request.session_id,
            idempotency_key = %request.idempotency_key
        );
    }

    fn on_provider_event(&self, event: &ProviderEvent) {
        match event.status {
            EventStatus::Success => tracing::info!(
                phase = "turn",
                event = "provider_event",
                tenant_id = %event.tenant_id,
                session_id = %event.session_id,
                provider = %event.provider,
                attempt = event.attempt,
                status = event.status.as_str(),
                latency_ms = event.latency_ms
            ),
            EventStatus::Fail => tracing::warn!(
                phase = "turn",
                event = "provider_event",
                tenant_id = %event.tenant_id,
                session_id = %event.session_id,
                provider = %event.provider,
                attempt = event.attempt,
                status = event.status.as_str(),
                http_code = event.http_code,
                error_kind = event.error_kind.map(|kind| kind.label())
            ),
        }
    }

    fn on_turn_complete(
        &self,
        terminal: TurnPhase,
        request: &TurnRequest,
        result: &TurnResult,
        elapsed: Duration,
    ) {
        tracing::info!(
            phase = terminal.as_str(),
            event = "turn_complete",
            tenant_id = %request.tenant_id,
            session_id = %request.session_id,
            idempotency_key = %request.idempotency_key,
            provider = %result.provider_used,
            tokens_in = result.tokens_in,
            tokens_out = result.tokens_out,
            cost = result.cost,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_turn_rejected(&self, request: &TurnRequest, error: &TurnError, elapsed: Duration) {
        tracing::error!(
            phase = TurnPhase::Rejected.as_str(),
            event = "turn_rejected",
            tenant_id = %request.tenant_id,
            session_id = %request.session_id,
            idempotency_key = %request.idempotency_key,
            error_kind = ?error.kind,
            error = %error,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_claim_release_failure(&self, request: &TurnRequest, error: &TurnError) {
        tracing::error!(
            phase = "turn",
            event = "claim_release_failure",
            tenant_id = %request.tenant_id,
            idempotency_key = %request.idempotency_key,
            error = %error
        );
    }
}
