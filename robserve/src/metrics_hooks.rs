//! `metrics` counters and histograms for provider attempts and turn outcomes.
//!
//! ```rust
//! use robserve::MetricsObservabilityHooks;
//! use rprovider::ProviderOperationHooks;
//!
//! fn accepts_provider_hooks(_hooks: &dyn ProviderOperationHooks) {}
//!
//! accepts_provider_hooks(&MetricsObservabilityHooks);
//! ```

use std::time::Duration;

use rprovider::{ProviderError, ProviderId, ProviderOperationHooks};
use rturn::{ProviderEvent, TurnError, TurnHooks, TurnPhase, TurnRequest, TurnResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObservabilityHooks;

impl ProviderOperationHooks for MetricsObservabilityHooks {
    fn on_attempt_start(&self, provider: ProviderId, _attempt: u32) {
        metrics::counter!(
            "relay_provider_attempt_start_total",
            "provider" => provider.to_string()
        )
        .increment(1);
    }

    fn on_timeout(&self, provider: ProviderId, _attempt: u32, _timeout: Duration) {
        metrics::counter!(
            "relay_provider_timeout_total",
            "provider" => provider.to_string()
        )
        .increment(1);
    }

    fn on_retry_scheduled(
        &self,
        provider: ProviderId,
        _attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        metrics::counter!(
            "relay_provider_retry_scheduled_total",
            "provider" => provider.to_string(),
            "error_kind" => error.kind.label()
        )
        .increment(1);
        metrics::histogram!(
            "relay_provider_retry_delay_seconds",
            "provider" => provider.to_string()
        )
        .record(delay.as_secs_f64());
    }

    fn on_success(&self, provider: ProviderId, attempts: u32) {
        metrics::counter!(
            "relay_provider_success_total",
            "provider" => provider.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "relay_provider_attempts_per_success",
            "provider" => provider.to_string()
        )
        .record(attempts as f64);
    }

    fn on_failure(&self, provider: ProviderId, attempts: u32, error: &ProviderError) {
        metrics::counter!(
            "relay_provider_failure_total",
            "provider" => provider.to_string(),
            "error_kind" => error.kind.label()
        )
        .increment(1);
        metrics::histogram!(
            "relay_provider_attempts_per_failure",
            "provider" => provider.to_string()
        )
        .record(attempts as f64);
    }
}

impl TurnHooks for MetricsObservabilityHooks {
    fn on_phase_start(&self, phase: TurnPhase, _request: &TurnRequest) {
        metrics::counter!("relay_turn_phase_start_total", "phase" => phase.as_str()).increment(1);
    }

    fn on_provider_event(&self, event: &ProviderEvent) {
        metrics::counter!(
            "relay_turn_provider_event_total",
            "provider" => event.provider.to_string(),
            "status" => event.status.as_str()
        )
        .increment(1);
    }

    fn on_turn_complete(
        &self,
        terminal: TurnPhase,
        _request: &TurnRequest,
        result: &TurnResult,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "relay_turn_complete_total",
            "terminal" => terminal.as_str(),
            "provider" => result.provider_used.to_string()
        )
        .increment(1);
        metrics::histogram!("relay_turn_duration_seconds", "terminal" => terminal.as_str())
            .record(elapsed.as_secs_f64());

        if terminal == TurnPhase::Committed {
            let tokens = u64::from(result.tokens_in) + u64::from(result.tokens_out);
            metrics::counter!(
                "relay_turn_tokens_total",
                "provider" => result.provider_used.to_string()
            )
            .increment(tokens);
            metrics::histogram!(
                "relay_turn_cost",
                "provider" => result.provider_used.to_string()
            )
            .record(result.cost);
        }
    }

    fn on_turn_rejected(&self, _request: &TurnRequest, error: &TurnError, elapsed: Duration) {
        metrics::counter!(
            "relay_turn_rejected_total",
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "relay_turn_duration_seconds",
            "terminal" => TurnPhase::Rejected.as_str()
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_claim_release_failure(&self, _request: &TurnRequest, _error: &TurnError) {
        metrics::counter!("relay_turn_claim_release_failure_total").increment(1);
    }
}
