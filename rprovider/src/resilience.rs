//! Timeout, retry, and backoff policy applied to a single provider call chain.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rcommon::BoxFuture;

use crate::{NormalizedResponse, ProviderClient, ProviderError, ProviderId};

#[derive(Debug, Clone, PartialEq)]
pub struct ReliabilityPolicy {
    /// Budget for one attempt; every retry gets a fresh window.
    pub timeout: Duration,
    /// Retries after the initial attempt.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: u32,
}

impl Default for ReliabilityPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3),
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(800),
            backoff_multiplier: 2,
        }
    }
}

impl ReliabilityPolicy {
    pub fn new(timeout: Duration, max_retries: u32) -> Self {
        Self {
            timeout,
            max_retries,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn should_retry(&self, attempt: u32, error: &ProviderError) -> bool {
        error.is_retryable() && attempt <= self.max_retries
    }

    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self.backoff_multiplier.saturating_pow(exponent);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Longest a chain can run when every attempt times out and waits the
    /// capped backoff. Retry-after hints are not bounded by this figure.
    pub fn worst_case_chain(&self) -> Duration {
        self.timeout
            .saturating_mul(self.max_attempts())
            .saturating_add(self.max_backoff.saturating_mul(self.max_retries))
    }

    /// Delay before the attempt following `attempt`.
    pub fn delay_for(&self, attempt: u32, error: &ProviderError) -> Duration {
        error
            .retry_after_hint()
            .unwrap_or_else(|| self.backoff_for_attempt(attempt))
    }
}

pub trait Sleeper: Send + Sync {
    fn sleep(&self, delay: Duration) -> BoxFuture<'_, ()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, delay: Duration) -> BoxFuture<'_, ()> {
        Box::pin(tokio::time::sleep(delay))
    }
}

pub trait ProviderOperationHooks: Send + Sync {
    fn on_attempt_start(&self, _provider: ProviderId, _attempt: u32) {}

    fn on_timeout(&self, _provider: ProviderId, _attempt: u32, _timeout: Duration) {}

    fn on_retry_scheduled(
        &self,
        _provider: ProviderId,
        _attempt: u32,
        _delay: Duration,
        _error: &ProviderError,
    ) {
    }

    fn on_success(&self, _provider: ProviderId, _attempts: u32) {}

    fn on_failure(&self, _provider: ProviderId, _attempts: u32, _error: &ProviderError) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOperationHooks;

impl ProviderOperationHooks for NoopOperationHooks {}

/// Final result of one provider's attempt chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptOutcome<T = NormalizedResponse> {
    pub provider: ProviderId,
    pub attempts: u32,
    pub result: Result<T, ProviderError>,
}

impl<T> AttemptOutcome<T> {
    pub fn succeeded(provider: ProviderId, attempts: u32, value: T) -> Self {
        Self {
            provider,
            attempts,
            result: Ok(value),
        }
    }

    pub fn failed(provider: ProviderId, attempts: u32, error: ProviderError) -> Self {
        Self {
            provider,
            attempts,
            result: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn response(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&ProviderError> {
        self.result.as_ref().err()
    }
}

pub async fn execute_with_retry<T, Op, OpFuture, Sleep, SleepFuture>(
    provider: ProviderId,
    policy: &ReliabilityPolicy,
    hooks: &dyn ProviderOperationHooks,
    mut execute: Op,
    mut sleep: Sleep,
) -> AttemptOutcome<T>
where
    Op: FnMut(u32) -> OpFuture,
    OpFuture: Future<Output = Result<T, ProviderError>>,
    Sleep: FnMut(Duration) -> SleepFuture,
    SleepFuture: Future<Output = ()>,
{
    let mut attempt = 1;

    loop {
        hooks.on_attempt_start(provider, attempt);

        // Dropping the timed-out future cancels the in-flight call.
        let result = match tokio::time::timeout(policy.timeout, execute(attempt)).await {
            Ok(result) => result,
            Err(_) => {
                hooks.on_timeout(provider, attempt, policy.timeout);
                Err(ProviderError::timeout(format!(
                    "{provider} did not respond within {}ms",
                    policy.timeout.as_millis()
                )))
            }
        };

        match result {
            Ok(value) => {
                hooks.on_success(provider, attempt);
                return AttemptOutcome::succeeded(provider, attempt, value);
            }
            Err(error) => {
                if policy.should_retry(attempt, &error) {
                    let delay = policy.delay_for(attempt, &error);
                    hooks.on_retry_scheduled(provider, attempt, delay, &error);
                    sleep(delay).await;
                    attempt += 1;
                    continue;
                }

                hooks.on_failure(provider, attempt, &error);
                return AttemptOutcome::failed(provider, attempt, error);
            }
        }
    }
}

/// Provider-agnostic executor shared by primary and fallback attempts.
#[derive(Clone)]
pub struct ReliabilityExecutor {
    hooks: Arc<dyn ProviderOperationHooks>,
    sleeper: Arc<dyn Sleeper>,
}

impl Default for ReliabilityExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ReliabilityExecutor {
    pub fn new() -> Self {
        Self {
            hooks: Arc::new(NoopOperationHooks),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn sleeper(&self) -> Arc<dyn Sleeper> {
        Arc::clone(&self.sleeper)
    }

    pub async fn execute(
        &self,
        client: &dyn ProviderClient,
        prompt: &str,
        policy: &ReliabilityPolicy,
    ) -> AttemptOutcome {
        execute_with_retry(
            client.id(),
            policy,
            self.hooks.as_ref(),
            |_| client.call(prompt),
            |delay| self.sleeper.sleep(delay),
        )
        .await
    }
}
