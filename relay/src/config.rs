//! Gateway configuration.
//!
//! Every field is defaulted, so an empty JSON document is a valid config:
//!
//! ```rust
//! use std::time::Duration;
//!
//! use relay::{GatewayConfig, ProviderId};
//!
//! let config = GatewayConfig::from_json_str(r#"{
//!     "reliability": { "timeout_secs": 1.5 },
//!     "provider_overrides": { "vendorB": { "max_retries": 0 } }
//! }"#)
//! .expect("config should parse");
//!
//! let policy = config.reliability_policy(ProviderId::VendorB).expect("valid policy");
//! assert_eq!(policy.timeout, Duration::from_millis(1500));
//! assert_eq!(policy.max_retries, 0);
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use rprovider::{ProviderId, ReliabilityPolicy};
use rstore::TurnStoreConfig;
use rturn::{PriceTable, TurnPolicy, worst_case_turn};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

pub const VENDOR_TIMEOUT_ENV: &str = "RELAY_VENDOR_TIMEOUT_S";
pub const MAX_RETRIES_ENV: &str = "RELAY_MAX_RETRIES";
pub const DATABASE_PATH_ENV: &str = "RELAY_DATABASE_PATH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliabilitySettings {
    pub timeout_secs: f64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: u32,
}

impl Default for ReliabilitySettings {
    fn default() -> Self {
        Self {
            timeout_secs: 3.0,
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 800,
            backoff_multiplier: 2,
        }
    }
}

impl ReliabilitySettings {
    pub fn to_policy(&self) -> Result<ReliabilityPolicy, GatewayError> {
        let timeout = timeout_from_secs(self.timeout_secs)?;
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(GatewayError::config(format!(
                "initial_backoff_ms ({}) exceeds max_backoff_ms ({})",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }
        if self.backoff_multiplier == 0 {
            return Err(GatewayError::config("backoff_multiplier must be at least 1"));
        }

        Ok(ReliabilityPolicy {
            timeout,
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            backoff_multiplier: self.backoff_multiplier,
        })
    }
}

fn timeout_from_secs(timeout_secs: f64) -> Result<Duration, GatewayError> {
    let timeout = Duration::try_from_secs_f64(timeout_secs)
        .map_err(|error| GatewayError::config(format!("invalid timeout_secs {timeout_secs}: {error}")))?;
    if timeout.is_zero() {
        return Err(GatewayError::config("timeout_secs must be positive"));
    }
    Ok(timeout)
}

/// Per-provider deviations from the default reliability settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderOverride {
    pub timeout_secs: Option<f64>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimSettings {
    pub wait_ms: u64,
    pub poll_interval_ms: u64,
    pub lease_ms: u64,
}

impl Default for ClaimSettings {
    fn default() -> Self {
        let policy = TurnPolicy::default();
        Self {
            wait_ms: duration_ms(policy.claim_wait),
            poll_interval_ms: duration_ms(policy.claim_poll_interval),
            lease_ms: duration_ms(policy.claim_lease),
        }
    }
}

impl ClaimSettings {
    pub fn to_turn_policy(&self) -> TurnPolicy {
        TurnPolicy {
            claim_wait: Duration::from_millis(self.wait_ms),
            claim_poll_interval: Duration::from_millis(self.poll_interval_ms),
            claim_lease: Duration::from_millis(self.lease_ms),
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Knobs for the in-process vendor simulations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Fixed seed for reproducible runs; entropy-seeded when absent.
    pub seed: Option<u64>,
    pub vendor_a_failure_rate: Option<f64>,
    pub vendor_b_failure_rate: Option<f64>,
}

impl SimulationSettings {
    pub fn failure_rate(&self, provider: ProviderId) -> Option<f64> {
        match provider {
            ProviderId::VendorA => self.vendor_a_failure_rate,
            ProviderId::VendorB => self.vendor_b_failure_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookSelection {
    Noop,
    #[default]
    Tracing,
    Metrics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub reliability: ReliabilitySettings,
    pub provider_overrides: BTreeMap<ProviderId, ProviderOverride>,
    pub prices: PriceTable,
    pub claims: ClaimSettings,
    pub store: TurnStoreConfig,
    pub simulation: SimulationSettings,
    pub hooks: HookSelection,
}

impl GatewayConfig {
    pub fn from_json_str(json: &str) -> Result<Self, GatewayError> {
        serde_json::from_str(json)
            .map_err(|error| GatewayError::config(format!("failed to parse gateway config: {error}")))
    }

    pub fn from_env() -> Result<Self, GatewayError> {
        Self::default().with_env()
    }

    /// Applies `RELAY_*` environment overrides on top of this config.
    pub fn with_env(self) -> Result<Self, GatewayError> {
        self.with_lookup(|key| std::env::var(key).ok())
    }

    pub fn with_lookup<F>(mut self, lookup: F) -> Result<Self, GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(VENDOR_TIMEOUT_ENV) {
            let timeout_secs = raw.trim().parse::<f64>().map_err(|error| {
                GatewayError::config(format!("{VENDOR_TIMEOUT_ENV}='{raw}' is not a number: {error}"))
            })?;
            self.reliability.timeout_secs = timeout_secs;
        }

        if let Some(raw) = lookup(MAX_RETRIES_ENV) {
            self.reliability.max_retries = raw.trim().parse::<u32>().map_err(|error| {
                GatewayError::config(format!(
                    "{MAX_RETRIES_ENV}='{raw}' is not a retry count: {error}"
                ))
            })?;
        }

        if let Some(raw) = lookup(DATABASE_PATH_ENV) {
            let path = raw.trim();
            if !path.is_empty() {
                self.store = TurnStoreConfig::Sqlite {
                    path: PathBuf::from(path),
                };
            }
        }

        self.validate()?;
        Ok(self)
    }

    /// Default policy with any override for `provider` applied.
    pub fn reliability_policy(&self, provider: ProviderId) -> Result<ReliabilityPolicy, GatewayError> {
        let mut policy = self.reliability.to_policy()?;
        if let Some(overrides) = self.provider_overrides.get(&provider) {
            if let Some(timeout_secs) = overrides.timeout_secs {
                policy.timeout = timeout_from_secs(timeout_secs)?;
            }
            if let Some(max_retries) = overrides.max_retries {
                policy.max_retries = max_retries;
            }
        }
        Ok(policy)
    }

    pub fn turn_policy(&self) -> TurnPolicy {
        self.claims.to_turn_policy()
    }

    /// Checks policies, prices, and failure rates, and that the claim lease
    /// outlasts a worst-case turn under the configured policies.
    pub fn validate(&self) -> Result<(), GatewayError> {
        let policies = ProviderId::ALL
            .into_iter()
            .map(|provider| self.reliability_policy(provider))
            .collect::<Result<Vec<_>, _>>()?;
        self.turn_policy().check_lease(worst_case_turn(&policies))?;

        for provider in self.prices.providers() {
            let price = self.prices.price(provider).unwrap_or_default();
            if !price.is_finite() || price < 0.0 {
                return Err(GatewayError::config(format!(
                    "price for {provider} must be a non-negative number, got {price}"
                )));
            }
        }

        for provider in ProviderId::ALL {
            if let Some(rate) = self.simulation.failure_rate(provider)
                && !(0.0..=1.0).contains(&rate)
            {
                return Err(GatewayError::config(format!(
                    "failure rate for {provider} must be within 0..=1, got {rate}"
                )));
            }
        }

        Ok(())
    }
}
