//! Turn state machine: idempotency claim, context load, provider attempts,
//! and atomic finalization.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rprovider::{
    AttemptOutcome, ProviderId, ProviderRegistry, ReliabilityExecutor, ReliabilityPolicy, Sleeper,
    TokioSleeper,
};

use crate::{
    AgentConfig, ClaimToken, CostMeter, EventStatus, IdempotencyClaim, MessageRole, NoopTurnHooks,
    ProviderEvent, SessionRecord, TurnCommit, TurnError, TurnHooks, TurnPhase, TurnRequest,
    TurnResult, TurnStore, UsageEvent,
};

/// Joins the agent's system prompt and the user's text into one provider prompt.
pub fn build_prompt(system_prompt: &str, user_text: &str) -> String {
    format!("SYSTEM: {system_prompt}\nUSER: {user_text}")
}

/// Limits for contended idempotency keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnPolicy {
    /// How long a duplicate request waits for the owner's result.
    pub claim_wait: Duration,
    pub claim_poll_interval: Duration,
    /// Age after which a pending claim is considered abandoned. Must outlive
    /// the slowest possible turn, or a live turn can be taken over.
    pub claim_lease: Duration,
}

impl Default for TurnPolicy {
    fn default() -> Self {
        Self {
            claim_wait: Duration::from_secs(30),
            claim_poll_interval: Duration::from_millis(100),
            claim_lease: Duration::from_secs(60),
        }
    }
}

impl TurnPolicy {
    pub fn max_claim_polls(&self) -> u64 {
        let step = self.claim_poll_interval.as_nanos();
        if step == 0 {
            return 0;
        }

        u64::try_from(self.claim_wait.as_nanos().div_ceil(step)).unwrap_or(u64::MAX)
    }

    /// Fails unless the claim lease is longer than a turn lasting `turn_budget`.
    pub fn check_lease(&self, turn_budget: Duration) -> Result<(), TurnError> {
        if self.claim_lease.is_zero() {
            return Err(TurnError::configuration("claim lease must be greater than zero"));
        }
        if self.claim_lease <= turn_budget {
            return Err(TurnError::configuration(format!(
                "claim lease of {:?} does not outlast a worst-case turn of {turn_budget:?}",
                self.claim_lease
            )));
        }

        Ok(())
    }
}

/// Worst-case duration of a primary chain followed by a fallback chain, taken
/// over the two slowest of `policies`.
pub fn worst_case_turn<'a>(policies: impl IntoIterator<Item = &'a ReliabilityPolicy>) -> Duration {
    let mut chains: Vec<Duration> = policies
        .into_iter()
        .map(ReliabilityPolicy::worst_case_chain)
        .collect();
    chains.sort_unstable_by(|left, right| right.cmp(left));
    chains
        .into_iter()
        .take(2)
        .fold(Duration::ZERO, Duration::saturating_add)
}

/// Outcome of contending for an idempotency key.
enum ClaimOutcome {
    Owned(ClaimToken),
    Finished(TurnResult),
}

#[derive(Clone)]
pub struct TurnOrchestrator {
    registry: ProviderRegistry,
    store: Arc<dyn TurnStore>,
    executor: ReliabilityExecutor,
    default_policy: ReliabilityPolicy,
    provider_policies: HashMap<ProviderId, ReliabilityPolicy>,
    cost_meter: CostMeter,
    hooks: Arc<dyn TurnHooks>,
    claim_sleeper: Arc<dyn Sleeper>,
    turn_policy: TurnPolicy,
}

pub struct TurnOrchestratorBuilder {
    registry: ProviderRegistry,
    store: Arc<dyn TurnStore>,
    executor: ReliabilityExecutor,
    default_policy: ReliabilityPolicy,
    provider_policies: HashMap<ProviderId, ReliabilityPolicy>,
    cost_meter: CostMeter,
    hooks: Arc<dyn TurnHooks>,
    claim_sleeper: Arc<dyn Sleeper>,
    turn_policy: TurnPolicy,
}

impl TurnOrchestratorBuilder {
    pub fn executor(mut self, executor: ReliabilityExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn default_policy(mut self, policy: ReliabilityPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    pub fn provider_policy(mut self, provider: ProviderId, policy: ReliabilityPolicy) -> Self {
        self.provider_policies.insert(provider, policy);
        self
    }

    pub fn cost_meter(mut self, cost_meter: CostMeter) -> Self {
        self.cost_meter = cost_meter;
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn TurnHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn claim_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.claim_sleeper = sleeper;
        self
    }

    pub fn turn_policy(mut self, turn_policy: TurnPolicy) -> Self {
        self.turn_policy = turn_policy;
        self
    }

    /// Fails when a registered provider has no price or the claim lease is
    /// shorter than a worst-case turn over the registered providers.
    pub fn build(self) -> Result<TurnOrchestrator, TurnError> {
        if let Some(unpriced) = self
            .registry
            .ids()
            .into_iter()
            .find(|provider| self.cost_meter.prices().price(*provider).is_none())
        {
            return Err(TurnError::configuration(format!(
                "provider '{unpriced}' is registered without a price"
            )));
        }

        let turn_budget = worst_case_turn(self.registry.ids().into_iter().map(|provider| {
            self.provider_policies
                .get(&provider)
                .unwrap_or(&self.default_policy)
        }));
        self.turn_policy.check_lease(turn_budget)?;

        Ok(TurnOrchestrator {
            registry: self.registry,
            store: self.store,
            executor: self.executor,
            default_policy: self.default_policy,
            provider_policies: self.provider_policies,
            cost_meter: self.cost_meter,
            hooks: self.hooks,
            claim_sleeper: self.claim_sleeper,
            turn_policy: self.turn_policy,
        })
    }
}

impl TurnOrchestrator {
    pub fn builder(registry: ProviderRegistry, store: Arc<dyn TurnStore>) -> TurnOrchestratorBuilder {
        TurnOrchestratorBuilder {
            registry,
            store,
            executor: ReliabilityExecutor::new(),
            default_policy: ReliabilityPolicy::default(),
            provider_policies: HashMap::new(),
            cost_meter: CostMeter::default(),
            hooks: Arc::new(NoopTurnHooks),
            claim_sleeper: Arc::new(TokioSleeper),
            turn_policy: TurnPolicy::default(),
        }
    }

    pub fn store(&self) -> Arc<dyn TurnStore> {
        Arc::clone(&self.store)
    }

    pub fn policy_for(&self, provider: ProviderId) -> &ReliabilityPolicy {
        self.provider_policies
            .get(&provider)
            .unwrap_or(&self.default_policy)
    }

    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnResult, TurnError> {
        let started = Instant::now();
        match self.run_turn(&request).await {
            Ok((terminal, result)) => {
                self.hooks
                    .on_turn_complete(terminal, &request, &result, started.elapsed());
                Ok(result)
            }
            Err(error) => {
                self.hooks
                    .on_turn_rejected(&request, &error, started.elapsed());
                Err(error)
            }
        }
    }

    async fn run_turn(&self, request: &TurnRequest) -> Result<(TurnPhase, TurnResult), TurnError> {
        validate_request(request)?;

        self.hooks
            .on_phase_start(TurnPhase::IdempotencyCheck, request);
        if let Some(cached) = self
            .store
            .find_idempotent(&request.tenant_id, &request.idempotency_key)
            .await?
        {
            return Ok((TurnPhase::Cached, cached));
        }

        let token = match self.acquire_claim(request).await? {
            ClaimOutcome::Owned(token) => token,
            ClaimOutcome::Finished(cached) => return Ok((TurnPhase::Cached, cached)),
        };

        let outcome = self.run_claimed(request, token).await;
        if outcome.is_err() {
            self.release_claim(request, token).await;
        }
        outcome
    }

    async fn acquire_claim(&self, request: &TurnRequest) -> Result<ClaimOutcome, TurnError> {
        let mut polls_left = self.turn_policy.max_claim_polls();
        loop {
            let claim = self
                .store
                .claim_idempotent(
                    &request.tenant_id,
                    &request.idempotency_key,
                    self.turn_policy.claim_lease,
                )
                .await?;

            match claim {
                IdempotencyClaim::Claimed(token) => return Ok(ClaimOutcome::Owned(token)),
                IdempotencyClaim::Completed(result) => return Ok(ClaimOutcome::Finished(result)),
                IdempotencyClaim::InFlight if polls_left == 0 => {
                    return Err(TurnError::in_progress(format!(
                        "turn with idempotency key '{}' is still in progress",
                        request.idempotency_key
                    )));
                }
                IdempotencyClaim::InFlight => {
                    polls_left -= 1;
                    self.claim_sleeper
                        .sleep(self.turn_policy.claim_poll_interval)
                        .await;
                }
            }
        }
    }

    async fn release_claim(&self, request: &TurnRequest, token: ClaimToken) {
        if let Err(error) = self
            .store
            .release_idempotent(&request.tenant_id, &request.idempotency_key, token)
            .await
        {
            self.hooks.on_claim_release_failure(request, &error);
        }
    }

    async fn run_claimed(
        &self,
        request: &TurnRequest,
        token: ClaimToken,
    ) -> Result<(TurnPhase, TurnResult), TurnError> {
        self.hooks.on_phase_start(TurnPhase::LoadContext, request);
        let (session, agent) = self.load_context(request).await?;

        self.hooks
            .on_phase_start(TurnPhase::PersistUserTurn, request);
        self.store
            .append_message(
                &request.tenant_id,
                &request.session_id,
                MessageRole::User,
                &request.user_text,
            )
            .await?;

        let prompt = build_prompt(&agent.system_prompt, &request.user_text);

        self.hooks.on_phase_start(TurnPhase::AttemptPrimary, request);
        let mut outcome = self
            .attempt_provider(&session, agent.primary_provider, &prompt)
            .await?;

        if !outcome.is_success()
            && let Some(fallback) = agent.fallback_provider
        {
            self.hooks
                .on_phase_start(TurnPhase::AttemptFallback, request);
            outcome = self.attempt_provider(&session, fallback, &prompt).await?;
        }

        let response = outcome.result.map_err(|error| {
            TurnError::upstream_unavailable(format!(
                "all providers for agent '{}' failed; last error from {}: {error}",
                agent.id, outcome.provider
            ))
        })?;

        self.hooks.on_phase_start(TurnPhase::Finalize, request);
        let cost = self
            .cost_meter
            .cost(response.provider, response.tokens_in, response.tokens_out)?;
        let result = TurnResult::from_response(&response, cost);
        let commit = TurnCommit {
            tenant_id: request.tenant_id.clone(),
            session_id: request.session_id.clone(),
            idempotency_key: request.idempotency_key.clone(),
            claim: token,
            assistant_message: response.text.clone(),
            usage: UsageEvent {
                tenant_id: request.tenant_id.clone(),
                agent_id: agent.id.clone(),
                session_id: request.session_id.clone(),
                provider: response.provider,
                tokens_in: response.tokens_in,
                tokens_out: response.tokens_out,
                cost,
            },
            result: result.clone(),
        };

        match self.store.finalize_turn(commit).await {
            Ok(()) => Ok((TurnPhase::Committed, result)),
            Err(error) => {
                // Rejected when a caller that took over this claim committed first.
                match self
                    .store
                    .find_idempotent(&request.tenant_id, &request.idempotency_key)
                    .await
                {
                    Ok(Some(committed)) => Ok((TurnPhase::Cached, committed)),
                    _ => Err(error),
                }
            }
        }
    }

    async fn load_context(
        &self,
        request: &TurnRequest,
    ) -> Result<(SessionRecord, AgentConfig), TurnError> {
        let session = self
            .store
            .load_session(&request.tenant_id, &request.session_id)
            .await?
            .ok_or_else(|| {
                TurnError::not_found(format!(
                    "session '{}' not found for tenant '{}'",
                    request.session_id, request.tenant_id
                ))
            })?;

        if let Some(agent_id) = &request.agent_id
            && agent_id != &session.agent_id
        {
            return Err(TurnError::not_found(format!(
                "agent '{agent_id}' is not bound to session '{}'",
                session.id
            )));
        }

        let agent = self
            .store
            .load_agent(&request.tenant_id, &session.agent_id)
            .await?
            .ok_or_else(|| {
                TurnError::not_found(format!(
                    "agent '{}' not found for tenant '{}'",
                    session.agent_id, request.tenant_id
                ))
            })?;

        Ok((session, agent))
    }

    /// Runs one provider's full attempt chain and records its single audit event.
    async fn attempt_provider(
        &self,
        session: &SessionRecord,
        provider: ProviderId,
        prompt: &str,
    ) -> Result<AttemptOutcome, TurnError> {
        let client = self.registry.get(provider).ok_or_else(|| {
            TurnError::configuration(format!("provider '{provider}' is not registered"))
        })?;

        let outcome = self
            .executor
            .execute(client.as_ref(), prompt, self.policy_for(provider))
            .await;

        let event = provider_event(session, &outcome);
        self.store.append_provider_event(event.clone()).await?;
        self.hooks.on_provider_event(&event);

        Ok(outcome)
    }
}

fn validate_request(request: &TurnRequest) -> Result<(), TurnError> {
    if request.tenant_id.is_blank() {
        return Err(TurnError::invalid_request("tenant_id must not be empty"));
    }
    if request.session_id.is_blank() {
        return Err(TurnError::invalid_request("session_id must not be empty"));
    }
    if request.idempotency_key.is_blank() {
        return Err(TurnError::invalid_request(
            "idempotency_key must not be empty",
        ));
    }
    if request.user_text.trim().is_empty() {
        return Err(TurnError::invalid_request("user_text must not be empty"));
    }

    Ok(())
}

fn provider_event(session: &SessionRecord, outcome: &AttemptOutcome) -> ProviderEvent {
    let (status, http_code, latency_ms, error_kind) = match &outcome.result {
        Ok(response) => (EventStatus::Success, Some(200), response.latency_ms, None),
        Err(error) => (EventStatus::Fail, error.http_code, None, Some(error.kind)),
    };

    ProviderEvent {
        tenant_id: session.tenant_id.clone(),
        agent_id: session.agent_id.clone(),
        session_id: session.id.clone(),
        provider: outcome.provider,
        attempt: outcome.attempts,
        status,
        http_code,
        latency_ms,
        error_kind,
    }
}

#[cfg(test)]
mod tests {
    use rprovider::{NormalizedResponse, ProviderError, ProviderErrorKind};

    use super::*;

    #[test]
    fn prompt_joins_system_and_user_lines() {
        assert_eq!(
            build_prompt("be brief", "hello"),
            "SYSTEM: be brief\nUSER: hello"
        );
    }

    #[test]
    fn claim_polls_cover_the_whole_wait() {
        let policy = TurnPolicy {
            claim_wait: Duration::from_millis(250),
            claim_poll_interval: Duration::from_millis(100),
            claim_lease: Duration::from_secs(60),
        };
        assert_eq!(policy.max_claim_polls(), 3);

        let no_wait = TurnPolicy {
            claim_wait: Duration::ZERO,
            ..policy.clone()
        };
        assert_eq!(no_wait.max_claim_polls(), 0);

        let zero_interval = TurnPolicy {
            claim_poll_interval: Duration::ZERO,
            ..policy
        };
        assert_eq!(zero_interval.max_claim_polls(), 0);
    }

    #[test]
    fn worst_case_turn_adds_the_two_slowest_chains() {
        let fast = ReliabilityPolicy::new(Duration::from_secs(1), 0);
        let slow = ReliabilityPolicy::new(Duration::from_secs(30), 3);
        let default = ReliabilityPolicy::default();

        let none: [&ReliabilityPolicy; 0] = [];
        assert_eq!(worst_case_turn(none), Duration::ZERO);
        assert_eq!(worst_case_turn([&fast]), Duration::from_secs(1));
        assert_eq!(
            worst_case_turn([&fast, &slow, &default]),
            slow.worst_case_chain() + default.worst_case_chain()
        );
    }

    #[test]
    fn lease_must_be_positive_and_outlast_the_turn() {
        let policy = TurnPolicy::default();
        assert!(policy.check_lease(Duration::from_millis(28_800)).is_ok());

        let error = policy
            .check_lease(Duration::from_secs(60))
            .expect_err("lease equal to the turn");
        assert_eq!(error.kind, crate::TurnErrorKind::Configuration);

        let zero = TurnPolicy {
            claim_lease: Duration::ZERO,
            ..policy
        };
        assert!(zero.check_lease(Duration::ZERO).is_err());
    }

    #[test]
    fn blank_fields_are_rejected_before_any_work() {
        let valid = TurnRequest::new("t1", "s1", "hello", "k1");
        assert!(validate_request(&valid).is_ok());

        let blank_key = TurnRequest::new("t1", "s1", "hello", "  ");
        assert_eq!(
            validate_request(&blank_key).expect_err("blank key").kind,
            crate::TurnErrorKind::InvalidRequest
        );

        let blank_text = TurnRequest::new("t1", "s1", "\n", "k1");
        assert!(validate_request(&blank_text).is_err());
    }

    #[test]
    fn provider_events_summarize_outcomes() {
        let session = SessionRecord::new("s1", "t1", "a1");

        let success = AttemptOutcome::succeeded(
            ProviderId::VendorA,
            2,
            NormalizedResponse::new(ProviderId::VendorA, "ok", 3, 4).with_latency_ms(120),
        );
        let event = provider_event(&session, &success);
        assert_eq!(event.status, EventStatus::Success);
        assert_eq!(event.http_code, Some(200));
        assert_eq!(event.latency_ms, Some(120));
        assert_eq!(event.attempt, 2);
        assert_eq!(event.error_kind, None);

        let failure = AttemptOutcome::failed(ProviderId::VendorB, 4, ProviderError::timeout("slow"));
        let event = provider_event(&session, &failure);
        assert_eq!(event.status, EventStatus::Fail);
        assert_eq!(event.http_code, None);
        assert_eq!(event.error_kind, Some(ProviderErrorKind::Timeout));
        assert_eq!(event.attempt, 4);
    }
}
