//! Turn storage contract and an in-memory implementation.
//!
//! ```rust
//! use rturn::{InMemoryTurnStore, SessionRecord, TurnStore};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let store = InMemoryTurnStore::new();
//! store.insert_session(SessionRecord::new("s1", "t1", "a1")).unwrap();
//!
//! let session = store.load_session(&"t1".into(), &"s1".into()).await.unwrap();
//! assert!(session.is_some());
//! let other_tenant = store.load_session(&"t2".into(), &"s1".into()).await.unwrap();
//! assert!(other_tenant.is_none());
//! # });
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use rcommon::{AgentId, BoxFuture, IdempotencyKey, SessionId, TenantId};

use crate::{
    AgentConfig, ClaimToken, IdempotencyClaim, MessageRole, ProviderEvent, SessionRecord, TranscriptMessage,
    TurnCommit, TurnError, TurnResult, UsageEvent,
};

pub trait TurnStore: Send + Sync {
    fn find_idempotent<'a>(
        &'a self,
        tenant_id: &'a TenantId,
        key: &'a IdempotencyKey,
    ) -> BoxFuture<'a, Result<Option<TurnResult>, TurnError>>;

    /// Atomic insert-if-absent on `(tenant_id, key)`.
    ///
    /// A pending claim older than `lease` is treated as abandoned and may be
    /// taken over; the new holder gets a token that supersedes the old one.
    fn claim_idempotent<'a>(
        &'a self,
        tenant_id: &'a TenantId,
        key: &'a IdempotencyKey,
        lease: Duration,
    ) -> BoxFuture<'a, Result<IdempotencyClaim, TurnError>>;

    /// Drops the pending claim held by `token`. A claim that was taken over
    /// and completed records are left alone.
    fn release_idempotent<'a>(
        &'a self,
        tenant_id: &'a TenantId,
        key: &'a IdempotencyKey,
        token: ClaimToken,
    ) -> BoxFuture<'a, Result<(), TurnError>>;

    fn load_session<'a>(
        &'a self,
        tenant_id: &'a TenantId,
        session_id: &'a SessionId,
    ) -> BoxFuture<'a, Result<Option<SessionRecord>, TurnError>>;

    fn load_agent<'a>(
        &'a self,
        tenant_id: &'a TenantId,
        agent_id: &'a AgentId,
    ) -> BoxFuture<'a, Result<Option<AgentConfig>, TurnError>>;

    fn append_message<'a>(
        &'a self,
        tenant_id: &'a TenantId,
        session_id: &'a SessionId,
        role: MessageRole,
        text: &'a str,
    ) -> BoxFuture<'a, Result<(), TurnError>>;

    fn append_provider_event<'a>(
        &'a self,
        event: ProviderEvent,
    ) -> BoxFuture<'a, Result<(), TurnError>>;

    /// Persists the assistant message, usage event, and idempotency record
    /// as one unit. Fails without writing unless `commit.claim` is the key's
    /// current pending claim.
    fn finalize_turn<'a>(&'a self, commit: TurnCommit) -> BoxFuture<'a, Result<(), TurnError>>;

    fn load_transcript<'a>(
        &'a self,
        tenant_id: &'a TenantId,
        session_id: &'a SessionId,
    ) -> BoxFuture<'a, Result<Vec<TranscriptMessage>, TurnError>>;

    fn list_usage_events<'a>(
        &'a self,
        tenant_id: &'a TenantId,
    ) -> BoxFuture<'a, Result<Vec<UsageEvent>, TurnError>>;

    fn list_provider_events<'a>(
        &'a self,
        tenant_id: &'a TenantId,
    ) -> BoxFuture<'a, Result<Vec<ProviderEvent>, TurnError>>;
}

#[derive(Debug, Clone)]
enum IdempotencyEntry {
    Pending {
        claimed_at: Instant,
        token: ClaimToken,
    },
    /// Kept so the next claim continues the key's token sequence.
    Released { token: ClaimToken },
    Complete(TurnResult),
}

#[derive(Debug, Default)]
struct StoreState {
    sessions: HashMap<(TenantId, SessionId), SessionRecord>,
    agents: HashMap<(TenantId, AgentId), AgentConfig>,
    messages: HashMap<(TenantId, SessionId), Vec<TranscriptMessage>>,
    provider_events: Vec<ProviderEvent>,
    usage_events: Vec<UsageEvent>,
    idempotency: HashMap<(TenantId, IdempotencyKey), IdempotencyEntry>,
}

#[derive(Debug, Default)]
pub struct InMemoryTurnStore {
    state: Mutex<StoreState>,
}

impl InMemoryTurnStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_session(&self, session: SessionRecord) -> Result<(), TurnError> {
        self.state()?
            .sessions
            .insert((session.tenant_id.clone(), session.id.clone()), session);
        Ok(())
    }

    pub fn insert_agent(&self, agent: AgentConfig) -> Result<(), TurnError> {
        self.state()?
            .agents
            .insert((agent.tenant_id.clone(), agent.id.clone()), agent);
        Ok(())
    }

    pub fn remove_session(&self, tenant_id: &TenantId, session_id: &SessionId) -> Result<(), TurnError> {
        self.state()?
            .sessions
            .remove(&(tenant_id.clone(), session_id.clone()));
        Ok(())
    }

    pub fn remove_agent(&self, tenant_id: &TenantId, agent_id: &AgentId) -> Result<(), TurnError> {
        self.state()?
            .agents
            .remove(&(tenant_id.clone(), agent_id.clone()));
        Ok(())
    }

    fn state(&self) -> Result<MutexGuard<'_, StoreState>, TurnError> {
        self.state
            .lock()
            .map_err(|_| TurnError::store("turn store lock poisoned"))
    }
}

impl TurnStore for InMemoryTurnStore {
    fn find_idempotent<'a>(
        &'a self,
        tenant_id: &'a TenantId,
        key: &'a IdempotencyKey,
    ) -> BoxFuture<'a, Result<Option<TurnResult>, TurnError>> {
        Box::pin(async move {
            let state = self.state()?;
            Ok(match state.idempotency.get(&(tenant_id.clone(), key.clone())) {
                Some(IdempotencyEntry::Complete(result)) => Some(result.clone()),
                _ => None,
            })
        })
    }

    fn claim_idempotent<'a>(
        &'a self,
        tenant_id: &'a TenantId,
        key: &'a IdempotencyKey,
        lease: Duration,
    ) -> BoxFuture<'a, Result<IdempotencyClaim, TurnError>> {
        Box::pin(async move {
            let mut state = self.state()?;
            let slot = (tenant_id.clone(), key.clone());

            let token = match state.idempotency.get(&slot) {
                Some(IdempotencyEntry::Complete(result)) => {
                    return Ok(IdempotencyClaim::Completed(result.clone()));
                }
                Some(IdempotencyEntry::Pending { claimed_at, .. })
                    if claimed_at.elapsed() < lease =>
                {
                    return Ok(IdempotencyClaim::InFlight);
                }
                Some(
                    IdempotencyEntry::Pending { token, .. } | IdempotencyEntry::Released { token },
                ) => token.next(),
                None => ClaimToken::FIRST,
            };

            state.idempotency.insert(
                slot,
                IdempotencyEntry::Pending {
                    claimed_at: Instant::now(),
                    token,
                },
            );
            Ok(IdempotencyClaim::Claimed(token))
        })
    }

    fn release_idempotent<'a>(
        &'a self,
        tenant_id: &'a TenantId,
        key: &'a IdempotencyKey,
        token: ClaimToken,
    ) -> BoxFuture<'a, Result<(), TurnError>> {
        Box::pin(async move {
            let mut state = self.state()?;
            let slot = (tenant_id.clone(), key.clone());
            let held_by_caller = matches!(
                state.idempotency.get(&slot),
                Some(IdempotencyEntry::Pending { token: held, .. }) if *held == token
            );
            if held_by_caller {
                state
                    .idempotency
                    .insert(slot, IdempotencyEntry::Released { token });
            }
            Ok(())
        })
    }

    fn load_session<'a>(
        &'a self,
        tenant_id: &'a TenantId,
        session_id: &'a SessionId,
    ) -> BoxFuture<'a, Result<Option<SessionRecord>, TurnError>> {
        Box::pin(async move {
            let state = self.state()?;
            Ok(state
                .sessions
                .get(&(tenant_id.clone(), session_id.clone()))
                .cloned())
        })
    }

    fn load_agent<'a>(
        &'a self,
        tenant_id: &'a TenantId,
        agent_id: &'a AgentId,
    ) -> BoxFuture<'a, Result<Option<AgentConfig>, TurnError>> {
        Box::pin(async move {
            let state = self.state()?;
            Ok(state
                .agents
                .get(&(tenant_id.clone(), agent_id.clone()))
                .cloned())
        })
    }

    fn append_message<'a>(
        &'a self,
        tenant_id: &'a TenantId,
        session_id: &'a SessionId,
        role: MessageRole,
        text: &'a str,
    ) -> BoxFuture<'a, Result<(), TurnError>> {
        Box::pin(async move {
            self.state()?
                .messages
                .entry((tenant_id.clone(), session_id.clone()))
                .or_default()
                .push(TranscriptMessage::new(role, text));
            Ok(())
        })
    }

    fn append_provider_event<'a>(
        &'a self,
        event: ProviderEvent,
    ) -> BoxFuture<'a, Result<(), TurnError>> {
        Box::pin(async move {
            self.state()?.provider_events.push(event);
            Ok(())
        })
    }

    fn finalize_turn<'a>(&'a self, commit: TurnCommit) -> BoxFuture<'a, Result<(), TurnError>> {
        Box::pin(async move {
            let mut state = self.state()?;
            let slot = (commit.tenant_id.clone(), commit.idempotency_key.clone());
            match state.idempotency.get(&slot) {
                Some(IdempotencyEntry::Pending { token, .. }) if *token == commit.claim => {}
                Some(IdempotencyEntry::Complete(_)) => {
                    return Err(TurnError::store(format!(
                        "idempotency key '{}' is already committed",
                        commit.idempotency_key
                    )));
                }
                _ => {
                    return Err(TurnError::store(format!(
                        "idempotency key '{}' is not claimed by {}",
                        commit.idempotency_key, commit.claim
                    )));
                }
            }

            // Every check happens above; the writes below cannot fail.
            state
                .messages
                .entry((commit.tenant_id.clone(), commit.session_id.clone()))
                .or_default()
                .push(TranscriptMessage::new(
                    MessageRole::Assistant,
                    commit.assistant_message,
                ));
            state.usage_events.push(commit.usage);
            state
                .idempotency
                .insert(slot, IdempotencyEntry::Complete(commit.result));
            Ok(())
        })
    }

    fn load_transcript<'a>(
        &'a self,
        tenant_id: &'a TenantId,
        session_id: &'a SessionId,
    ) -> BoxFuture<'a, Result<Vec<TranscriptMessage>, TurnError>> {
        Box::pin(async move {
            let state = self.state()?;
            Ok(state
                .messages
                .get(&(tenant_id.clone(), session_id.clone()))
                .cloned()
                .unwrap_or_default())
        })
    }

    fn list_usage_events<'a>(
        &'a self,
        tenant_id: &'a TenantId,
    ) -> BoxFuture<'a, Result<Vec<UsageEvent>, TurnError>> {
        Box::pin(async move {
            let state = self.state()?;
            Ok(state
                .usage_events
                .iter()
                .filter(|event| &event.tenant_id == tenant_id)
                .cloned()
                .collect())
        })
    }

    fn list_provider_events<'a>(
        &'a self,
        tenant_id: &'a TenantId,
    ) -> BoxFuture<'a, Result<Vec<ProviderEvent>, TurnError>> {
        Box::pin(async move {
            let state = self.state()?;
            Ok(state
                .provider_events
                .iter()
                .filter(|event| &event.tenant_id == tenant_id)
                .cloned()
                .collect())
        })
    }
}
