use std::sync::{Arc, Mutex};
use std::time::Duration;

use rprovider::{ProviderError, ProviderErrorKind, ProviderId, ProviderOperationHooks};
use rturn::{
    EventStatus, ProviderEvent, TurnError, TurnHooks, TurnPhase, TurnRequest, TurnResult,
};

use crate::{
    MetricsObservabilityHooks, SafeProviderHooks, SafeTurnHooks, TracingObservabilityHooks,
};

fn sample_request() -> TurnRequest {
    TurnRequest::new("tenant-1", "session-1", "hello", "k1")
}

fn sample_result() -> TurnResult {
    TurnResult {
        reply_text: "[VendorA] hello ...".to_string(),
        provider_used: ProviderId::VendorA,
        tokens_in: 2,
        tokens_out: 40,
        cost: 0.000084,
        latency_ms: Some(120),
    }
}

fn sample_event(status: EventStatus) -> ProviderEvent {
    ProviderEvent {
        tenant_id: "tenant-1".into(),
        agent_id: "agent-1".into(),
        session_id: "session-1".into(),
        provider: ProviderId::VendorA,
        attempt: 4,
        status,
        http_code: Some(500),
        latency_ms: None,
        error_kind: Some(ProviderErrorKind::Http),
    }
}

fn exercise_provider_hooks(hooks: &dyn ProviderOperationHooks) {
    let error = ProviderError::rate_limited(Some(Duration::from_millis(400)));

    hooks.on_attempt_start(ProviderId::VendorB, 1);
    hooks.on_timeout(ProviderId::VendorB, 1, Duration::from_secs(3));
    hooks.on_retry_scheduled(ProviderId::VendorB, 1, Duration::from_millis(400), &error);
    hooks.on_success(ProviderId::VendorB, 2);
    hooks.on_failure(ProviderId::VendorB, 4, &error);
}

fn exercise_turn_hooks(hooks: &dyn TurnHooks) {
    let request = sample_request();
    let error = TurnError::upstream_unavailable("all providers failed");

    hooks.on_phase_start(TurnPhase::AttemptPrimary, &request);
    hooks.on_provider_event(&sample_event(EventStatus::Fail));
    hooks.on_provider_event(&sample_event(EventStatus::Success));
    hooks.on_turn_complete(
        TurnPhase::Committed,
        &request,
        &sample_result(),
        Duration::from_millis(250),
    );
    hooks.on_turn_rejected(&request, &error, Duration::from_millis(30));
    hooks.on_claim_release_failure(&request, &TurnError::store("locked"));
}

#[test]
fn tracing_hooks_smoke_test_all_callbacks() {
    exercise_provider_hooks(&TracingObservabilityHooks);
    exercise_turn_hooks(&TracingObservabilityHooks);
}

#[test]
fn metrics_hooks_smoke_test_all_callbacks() {
    exercise_provider_hooks(&MetricsObservabilityHooks);
    exercise_turn_hooks(&MetricsObservabilityHooks);
}

#[derive(Default, Clone)]
struct RecordingHooks {
    events: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingHooks {
    fn push(&self, event: &'static str) {
        self.events.lock().expect("events lock").push(event);
    }
}

impl ProviderOperationHooks for RecordingHooks {
    fn on_attempt_start(&self, _provider: ProviderId, _attempt: u32) {
        self.push("attempt_start");
    }

    fn on_timeout(&self, _provider: ProviderId, _attempt: u32, _timeout: Duration) {
        self.push("timeout");
    }

    fn on_retry_scheduled(
        &self,
        _provider: ProviderId,
        _attempt: u32,
        _delay: Duration,
        _error: &ProviderError,
    ) {
        self.push("retry_scheduled");
    }

    fn on_success(&self, _provider: ProviderId, _attempts: u32) {
        self.push("success");
    }

    fn on_failure(&self, _provider: ProviderId, _attempts: u32, _error: &ProviderError) {
        self.push("failure");
    }
}

impl TurnHooks for RecordingHooks {
    fn on_phase_start(&self, _phase: TurnPhase, _request: &TurnRequest) {
        self.push("phase_start");
    }

    fn on_provider_event(&self, _event: &ProviderEvent) {
        self.push("provider_event");
    }

    fn on_turn_complete(
        &self,
        _terminal: TurnPhase,
        _request: &TurnRequest,
        _result: &TurnResult,
        _elapsed: Duration,
    ) {
        self.push("turn_complete");
    }

    fn on_turn_rejected(&self, _request: &TurnRequest, _error: &TurnError, _elapsed: Duration) {
        self.push("turn_rejected");
    }

    fn on_claim_release_failure(&self, _request: &TurnRequest, _error: &TurnError) {
        self.push("claim_release_failure");
    }
}

struct PanicHooks;

impl ProviderOperationHooks for PanicHooks {
    fn on_attempt_start(&self, _provider: ProviderId, _attempt: u32) {
        panic!("attempt_start panic");
    }

    fn on_timeout(&self, _provider: ProviderId, _attempt: u32, _timeout: Duration) {
        panic!("timeout panic");
    }

    fn on_retry_scheduled(
        &self,
        _provider: ProviderId,
        _attempt: u32,
        _delay: Duration,
        _error: &ProviderError,
    ) {
        panic!("retry_scheduled panic");
    }

    fn on_success(&self, _provider: ProviderId, _attempts: u32) {
        panic!("success panic");
    }

    fn on_failure(&self, _provider: ProviderId, _attempts: u32, _error: &ProviderError) {
        panic!("failure panic");
    }
}

impl TurnHooks for PanicHooks {
    fn on_phase_start(&self, _phase: TurnPhase, _request: &TurnRequest) {
        panic!("phase_start panic");
    }

    fn on_provider_event(&self, _event: &ProviderEvent) {
        panic!("provider_event panic");
    }

    fn on_turn_complete(
        &self,
        _terminal: TurnPhase,
        _request: &TurnRequest,
        _result: &TurnResult,
        _elapsed: Duration,
    ) {
        panic!("turn_complete panic");
    }

    fn on_turn_rejected(&self, _request: &TurnRequest, _error: &TurnError, _elapsed: Duration) {
        panic!("turn_rejected panic");
    }

    fn on_claim_release_failure(&self, _request: &TurnRequest, _error: &TurnError) {
        panic!("claim_release_failure panic");
    }
}

#[test]
fn safe_provider_hooks_delegate_when_inner_succeeds() {
    let inner = RecordingHooks::default();
    let events = Arc::clone(&inner.events);

    exercise_provider_hooks(&SafeProviderHooks::new(inner));

    assert_eq!(
        *events.lock().expect("events lock"),
        vec!["attempt_start", "timeout", "retry_scheduled", "success", "failure"]
    );
}

#[test]
fn safe_turn_hooks_delegate_when_inner_succeeds() {
    let inner = RecordingHooks::default();
    let events = Arc::clone(&inner.events);

    exercise_turn_hooks(&SafeTurnHooks::new(inner));

    assert_eq!(events.lock().expect("events lock").len(), 6);
}

#[test]
fn safe_hooks_swallow_panics() {
    exercise_provider_hooks(&SafeProviderHooks::new(PanicHooks));
    exercise_turn_hooks(&SafeTurnHooks::new(PanicHooks));
}
