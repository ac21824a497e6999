//! Runtime wiring: stores, simulated vendors, hooks, and the orchestrator.

use std::sync::Arc;

use robserve::{MetricsObservabilityHooks, SafeProviderHooks, SafeTurnHooks, TracingObservabilityHooks};
use rprovider::{
    NoopOperationHooks, ProviderId, ProviderOperationHooks, ProviderRegistry, ReliabilityExecutor,
};
use rstore::{ManagedTurnStore, create_turn_store};
use rturn::{
    AgentConfig, CostMeter, NoopTurnHooks, SessionRecord, TurnError, TurnHooks, TurnOrchestrator,
    TurnRequest, TurnResult, TurnStore,
};

#[cfg(any(feature = "vendor-a", feature = "vendor-b"))]
use rprovider::adapters::simulation::{SimulatedUpstream, SimulationProfile};

use crate::config::{GatewayConfig, HookSelection, SimulationSettings};
use crate::error::GatewayError;

/// An orchestrator bound to the store it writes through.
#[derive(Clone)]
pub struct Gateway {
    orchestrator: TurnOrchestrator,
    store: Arc<dyn ManagedTurnStore>,
}

impl Gateway {
    pub fn orchestrator(&self) -> &TurnOrchestrator {
        &self.orchestrator
    }

    pub fn store(&self) -> Arc<dyn ManagedTurnStore> {
        Arc::clone(&self.store)
    }

    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnResult, TurnError> {
        self.orchestrator.handle_turn(request).await
    }

    /// Registers an agent and a session bound to it.
    pub fn seed(&self, agent: &AgentConfig, session: &SessionRecord) -> Result<(), TurnError> {
        self.store.upsert_agent(agent)?;
        self.store.upsert_session(session)
    }
}

#[cfg(any(feature = "vendor-a", feature = "vendor-b"))]
fn simulated_upstream(
    settings: &SimulationSettings,
    provider: ProviderId,
    profile: SimulationProfile,
) -> SimulatedUpstream {
    let profile = match settings.failure_rate(provider) {
        Some(rate) => profile.with_failure_rate(rate),
        None => profile,
    };

    match settings.seed {
        Some(seed) => {
            let offset = match provider {
                ProviderId::VendorA => 0,
                ProviderId::VendorB => 1,
            };
            SimulatedUpstream::seeded(profile, seed.wrapping_add(offset))
        }
        None => SimulatedUpstream::new(profile),
    }
}

/// Registry holding a simulated client for every enabled vendor feature.
#[cfg_attr(
    not(any(feature = "vendor-a", feature = "vendor-b")),
    allow(unused_variables)
)]
pub fn simulated_registry(settings: &SimulationSettings) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();

    #[cfg(feature = "vendor-a")]
    {
        use rprovider::adapters::vendor_a::{SimulatedVendorATransport, VendorAProvider};

        let upstream = simulated_upstream(
            settings,
            ProviderId::VendorA,
            SimulatedVendorATransport::default_profile(),
        );
        registry.register(VendorAProvider::new(SimulatedVendorATransport::with_upstream(
            upstream,
        )));
    }

    #[cfg(feature = "vendor-b")]
    {
        use rprovider::adapters::vendor_b::{SimulatedVendorBTransport, VendorBProvider};

        let upstream = simulated_upstream(
            settings,
            ProviderId::VendorB,
            SimulatedVendorBTransport::default_profile(),
        );
        registry.register(VendorBProvider::new(SimulatedVendorBTransport::with_upstream(
            upstream,
        )));
    }

    registry
}

fn observability_hooks(
    selection: HookSelection,
) -> (Arc<dyn ProviderOperationHooks>, Arc<dyn TurnHooks>) {
    match selection {
        HookSelection::Noop => (Arc::new(NoopOperationHooks), Arc::new(NoopTurnHooks)),
        HookSelection::Tracing => (
            Arc::new(SafeProviderHooks::new(TracingObservabilityHooks)),
            Arc::new(SafeTurnHooks::new(TracingObservabilityHooks)),
        ),
        HookSelection::Metrics => (
            Arc::new(SafeProviderHooks::new(MetricsObservabilityHooks)),
            Arc::new(SafeTurnHooks::new(MetricsObservabilityHooks)),
        ),
    }
}

/// Builds a gateway over the configured store and the simulated vendors.
pub fn build_gateway(config: &GatewayConfig) -> Result<Gateway, GatewayError> {
    config.validate()?;
    let store = create_turn_store(config.store.clone())?;
    build_gateway_with(config, simulated_registry(&config.simulation), store)
}

pub fn build_gateway_with(
    config: &GatewayConfig,
    registry: ProviderRegistry,
    store: Arc<dyn ManagedTurnStore>,
) -> Result<Gateway, GatewayError> {
    config.validate()?;
    let (provider_hooks, turn_hooks) = observability_hooks(config.hooks);
    let turn_store: Arc<dyn TurnStore> = store.clone();

    let mut builder = TurnOrchestrator::builder(registry, turn_store)
        .executor(ReliabilityExecutor::new().with_hooks(provider_hooks))
        .default_policy(config.reliability.to_policy()?)
        .cost_meter(CostMeter::new(config.prices.clone()))
        .hooks(turn_hooks)
        .turn_policy(config.turn_policy());

    for provider in config.provider_overrides.keys() {
        builder = builder.provider_policy(*provider, config.reliability_policy(*provider)?);
    }

    Ok(Gateway {
        orchestrator: builder.build()?,
        store,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstore::TurnStoreConfig;

    use super::*;

    fn in_memory_config() -> GatewayConfig {
        GatewayConfig {
            store: TurnStoreConfig::InMemory,
            hooks: HookSelection::Noop,
            ..GatewayConfig::default()
        }
    }

    #[test]
    fn simulated_registry_holds_both_vendors() {
        let registry = simulated_registry(&SimulationSettings::default());
        assert_eq!(registry.ids(), vec![ProviderId::VendorA, ProviderId::VendorB]);
    }

    #[test]
    fn provider_overrides_reach_the_orchestrator() {
        let mut config = in_memory_config();
        config.provider_overrides.insert(
            ProviderId::VendorB,
            crate::config::ProviderOverride {
                timeout_secs: Some(0.75),
                max_retries: Some(0),
            },
        );

        let gateway = build_gateway(&config).expect("gateway");
        let vendor_b = gateway.orchestrator().policy_for(ProviderId::VendorB);
        assert_eq!(vendor_b.timeout, Duration::from_millis(750));
        assert_eq!(vendor_b.max_retries, 0);
        assert_eq!(
            gateway.orchestrator().policy_for(ProviderId::VendorA).max_retries,
            3
        );
    }

    #[test]
    fn invalid_reliability_settings_fail_the_build() {
        let mut config = in_memory_config();
        config.reliability.timeout_secs = 0.0;
        assert!(build_gateway(&config).is_err());
    }
}
