//! Agent, session, turn, and audit record types.

use rcommon::{AgentId, IdempotencyKey, SessionId, TenantId};
use rprovider::{NormalizedResponse, ProviderErrorKind, ProviderId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: AgentId,
    pub tenant_id: TenantId,
    pub name: String,
    pub primary_provider: ProviderId,
    pub fallback_provider: Option<ProviderId>,
    pub system_prompt: String,
}

impl AgentConfig {
    pub fn new(
        id: impl Into<AgentId>,
        tenant_id: impl Into<TenantId>,
        primary_provider: ProviderId,
        system_prompt: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            tenant_id: tenant_id.into(),
            primary_provider,
            fallback_provider: None,
            system_prompt: system_prompt.into(),
        }
    }

    pub fn with_fallback(mut self, fallback_provider: ProviderId) -> Self {
        self.fallback_provider = Some(fallback_provider);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub tenant_id: TenantId,
    pub agent_id: AgentId,
}

impl SessionRecord {
    pub fn new(
        id: impl Into<SessionId>,
        tenant_id: impl Into<TenantId>,
        agent_id: impl Into<AgentId>,
    ) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            agent_id: agent_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    pub tenant_id: TenantId,
    pub session_id: SessionId,
    /// When present, must name the agent bound to the session.
    pub agent_id: Option<AgentId>,
    pub user_text: String,
    pub idempotency_key: IdempotencyKey,
}

impl TurnRequest {
    pub fn new(
        tenant_id: impl Into<TenantId>,
        session_id: impl Into<SessionId>,
        user_text: impl Into<String>,
        idempotency_key: impl Into<IdempotencyKey>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            session_id: session_id.into(),
            agent_id: None,
            user_text: user_text.into(),
            idempotency_key: idempotency_key.into(),
        }
    }

    pub fn with_agent(mut self, agent_id: impl Into<AgentId>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }
}

/// Externally visible reply, identical whether served fresh or replayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResult {
    pub reply_text: String,
    pub provider_used: ProviderId,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub cost: f64,
    pub latency_ms: Option<u64>,
}

impl TurnResult {
    pub fn from_response(response: &NormalizedResponse, cost: f64) -> Self {
        Self {
            reply_text: response.text.clone(),
            provider_used: response.provider,
            tokens_in: response.tokens_in,
            tokens_out: response.tokens_out,
            cost,
            latency_ms: response.latency_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub role: MessageRole,
    pub content: String,
}

impl TranscriptMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Success,
    Fail,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Fail => "fail",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "success" => Some(Self::Success),
            "fail" => Some(Self::Fail),
            _ => None,
        }
    }
}

/// Append-only summary of one provider's whole attempt chain within a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEvent {
    pub tenant_id: TenantId,
    pub agent_id: AgentId,
    pub session_id: SessionId,
    pub provider: ProviderId,
    pub attempt: u32,
    pub status: EventStatus,
    pub http_code: Option<u16>,
    pub latency_ms: Option<u64>,
    pub error_kind: Option<ProviderErrorKind>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UsageEvent {
    pub tenant_id: TenantId,
    pub agent_id: AgentId,
    pub session_id: SessionId,
    pub provider: ProviderId,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub cost: f64,
}

/// Identifies one holder of a pending idempotency claim.
///
/// Stores hand out a larger generation on every claim of the same key, so a
/// holder whose claim was taken over never matches the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClaimToken(u64);

impl ClaimToken {
    pub const FIRST: Self = Self(1);

    pub fn new(generation: u64) -> Self {
        Self(generation)
    }

    pub fn generation(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl std::fmt::Display for ClaimToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "claim#{}", self.0)
    }
}

/// Writes that make a turn visible; stores apply all of them or none.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnCommit {
    pub tenant_id: TenantId,
    pub session_id: SessionId,
    pub idempotency_key: IdempotencyKey,
    /// Must match the key's current pending claim.
    pub claim: ClaimToken,
    pub assistant_message: String,
    pub usage: UsageEvent,
    pub result: TurnResult,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IdempotencyClaim {
    /// The caller now owns the key and must finalize or release it with this token.
    Claimed(ClaimToken),
    Completed(TurnResult),
    /// Another caller holds an unexpired claim.
    InFlight,
}
