//! Exactly-once turn orchestration over interchangeable providers.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use rprovider::{ProviderId, ProviderRegistry};
//! use rturn::{InMemoryTurnStore, TurnOrchestrator};
//!
//! let store = Arc::new(InMemoryTurnStore::new());
//! let orchestrator = TurnOrchestrator::builder(ProviderRegistry::new(), store)
//!     .build()
//!     .unwrap();
//! assert_eq!(orchestrator.policy_for(ProviderId::VendorA).max_retries, 3);
//! ```

mod error;
mod hooks;
mod metering;
mod orchestrator;
mod store;
mod types;

pub mod prelude {
    pub use crate::{
        AgentConfig, ClaimToken, CostMeter, IdempotencyClaim, InMemoryTurnStore, NoopTurnHooks,
        PriceTable, SessionRecord, TurnError, TurnErrorKind, TurnHooks, TurnOrchestrator,
        TurnOrchestratorBuilder, TurnPhase, TurnPolicy, TurnRequest, TurnResult, TurnStore,
    };
    pub use rcommon::{AgentId, IdempotencyKey, SessionId, TenantId};
}

pub use error::{TurnError, TurnErrorKind};
pub use hooks::{NoopTurnHooks, TurnHooks, TurnPhase};
pub use metering::{CostMeter, PriceTable};
pub use orchestrator::{
    TurnOrchestrator, TurnOrchestratorBuilder, TurnPolicy, build_prompt, worst_case_turn,
};
pub use store::{InMemoryTurnStore, TurnStore};
pub use types::{
    AgentConfig, ClaimToken, EventStatus, IdempotencyClaim, MessageRole, ProviderEvent,
    SessionRecord, TranscriptMessage, TurnCommit, TurnRequest, TurnResult, UsageEvent,
};
pub use rcommon::{AgentId, IdempotencyKey, SessionId, TenantId};
