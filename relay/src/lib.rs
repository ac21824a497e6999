//! Facade over the relay workspace crates.
//!
//! Most applications depend on this crate alone: it re-exports the provider,
//! turn, store, and observability crates and assembles them from a
//! [`GatewayConfig`].
//!
//! ```rust
//! use relay::{AgentConfig, GatewayConfig, ProviderId, SessionRecord, TurnRequest, build_gateway};
//! use relay::rstore::TurnStoreConfig;
//!
//! # #[tokio::main(flavor = "current_thread", start_paused = true)]
//! # async fn main() {
//! let mut config = GatewayConfig::default();
//! config.store = TurnStoreConfig::InMemory;
//! config.simulation.seed = Some(7);
//! config.simulation.vendor_a_failure_rate = Some(0.0);
//!
//! let gateway = build_gateway(&config).expect("gateway should build");
//! gateway
//!     .seed(
//!         &AgentConfig::new("A", "T", ProviderId::VendorA, "be brief"),
//!         &SessionRecord::new("S", "T", "A"),
//!     )
//!     .expect("seed");
//!
//! let result = gateway
//!     .handle_turn(TurnRequest::new("T", "S", "hello", "k1"))
//!     .await
//!     .expect("turn should succeed");
//! assert_eq!(result.provider_used, ProviderId::VendorA);
//! # }
//! ```

mod config;
mod error;

pub mod prelude;
pub mod runtime;

pub use rcommon;
pub use robserve;
pub use rprovider;
pub use rstore;
pub use rturn;

pub use config::{
    ClaimSettings, DATABASE_PATH_ENV, GatewayConfig, HookSelection, MAX_RETRIES_ENV,
    ProviderOverride, ReliabilitySettings, SimulationSettings, VENDOR_TIMEOUT_ENV,
};
pub use error::{GatewayError, GatewayErrorKind};
pub use rcommon::{AgentId, BoxFuture, IdempotencyKey, SessionId, TenantId};
pub use robserve::{
    MetricsObservabilityHooks, SafeProviderHooks, SafeTurnHooks, TracingObservabilityHooks,
};
pub use rprovider::{
    AttemptOutcome, NormalizedResponse, ProviderClient, ProviderError, ProviderErrorKind,
    ProviderFuture, ProviderId, ProviderOperationHooks, ProviderRegistry, ReliabilityExecutor,
    ReliabilityPolicy,
};
pub use rstore::{ManagedTurnStore, SqliteTurnStore, StoreError, TurnStoreConfig, create_turn_store};
pub use rturn::{
    AgentConfig, ClaimToken, CostMeter, EventStatus, IdempotencyClaim, InMemoryTurnStore,
    PriceTable, ProviderEvent, SessionRecord, TranscriptMessage, TurnError, TurnErrorKind,
    TurnHooks, TurnOrchestrator, TurnPhase, TurnPolicy, TurnRequest, TurnResult, TurnStore,
    UsageEvent,
};
pub use runtime::{Gateway, build_gateway, build_gateway_with, simulated_registry};
