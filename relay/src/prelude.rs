//! Common imports for relay applications.

pub use crate::{
    AgentConfig, Gateway, GatewayConfig, GatewayError, ManagedTurnStore, PriceTable, ProviderClient,
    ProviderError, ProviderId, ProviderRegistry, ReliabilityPolicy, SessionRecord, TurnError,
    TurnErrorKind, TurnRequest, TurnResult, TurnStore, TurnStoreConfig, build_gateway,
    build_gateway_with, simulated_registry,
};
pub use crate::{AgentId, IdempotencyKey, SessionId, TenantId};
