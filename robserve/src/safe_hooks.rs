use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use rprovider::{ProviderError, ProviderId, ProviderOperationHooks};
use rturn::{ProviderEvent, TurnError, TurnHooks, TurnPhase, TurnRequest, TurnResult};

pub struct SafeProviderHooks<H> {
    inner: H,
}

impl<H> SafeProviderHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ProviderOperationHooks for SafeProviderHooks<H>
where
    H: ProviderOperationHooks,
{
    fn on_attempt_start(&self, provider: ProviderId, attempt: u32) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_attempt_start(provider, attempt)
        }));
    }

    fn on_timeout(&self, provider: ProviderId, attempt: u32, timeout: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_timeout(provider, attempt, timeout)
        }));
    }

    fn on_retry_scheduled(
        &self,
        provider: ProviderId,
        attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_retry_scheduled(provider, attempt, delay, error)
        }));
    }

    fn on_success(&self, provider: ProviderId, attempts: u32) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_success(provider, attempts)));
    }

    fn on_failure(&self, provider: ProviderId, attempts: u32, error: &ProviderError) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_failure(provider, attempts, error)
        }));
    }
}

pub struct SafeTurnHooks<H> {
    inner: H,
}

impl<H> SafeTurnHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> TurnHooks for SafeTurnHooks<H>
where
    H: TurnHooks,
{
    fn on_phase_start(&self, phase: TurnPhase, request: &TurnRequest) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_phase_start(phase, request)));
    }

    fn on_provider_event(&self, event: &ProviderEvent) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_provider_event(event)));
    }

    fn on_turn_complete(
        &self,
        terminal: TurnPhase,
        request: &TurnRequest,
        result: &TurnResult,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_turn_complete(terminal, request, result, elapsed)
        }));
    }

    fn on_turn_rejected(&self, request: &TurnRequest, error: &TurnError, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_turn_rejected(request, error, elapsed)
        }));
    }

    fn on_claim_release_failure(&self, request: &TurnRequest, error: &TurnError) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_claim_release_failure(request, error)
        }));
    }
}
