//! Per-provider token pricing.
//!
//! ```rust
//! use rprovider::ProviderId;
//! use rturn::{CostMeter, PriceTable};
//!
//! let meter = CostMeter::new(PriceTable::default());
//! let cost = meter.cost(ProviderId::VendorA, 100, 50).unwrap();
//! assert!((cost - 0.0003).abs() < 1e-12);
//! ```

use std::collections::BTreeMap;

use rprovider::ProviderId;
use serde::{Deserialize, Serialize};

use crate::TurnError;

/// Price per 1000 tokens, input and output billed alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceTable {
    prices: BTreeMap<ProviderId, f64>,
}

impl Default for PriceTable {
    fn default() -> Self {
        Self::empty()
            .with_price(ProviderId::VendorA, 0.002)
            .with_price(ProviderId::VendorB, 0.003)
    }
}

impl PriceTable {
    pub fn empty() -> Self {
        Self {
            prices: BTreeMap::new(),
        }
    }

    pub fn with_price(mut self, provider: ProviderId, per_thousand: f64) -> Self {
        self.set_price(provider, per_thousand);
        self
    }

    pub fn set_price(&mut self, provider: ProviderId, per_thousand: f64) {
        self.prices.insert(provider, per_thousand);
    }

    pub fn price(&self, provider: ProviderId) -> Option<f64> {
        self.prices.get(&provider).copied()
    }

    pub fn providers(&self) -> impl Iterator<Item = ProviderId> + '_ {
        self.prices.keys().copied()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CostMeter {
    prices: PriceTable,
}

impl CostMeter {
    pub fn new(prices: PriceTable) -> Self {
        Self { prices }
    }

    pub fn prices(&self) -> &PriceTable {
        &self.prices
    }

    pub fn cost(&self, provider: ProviderId, tokens_in: u32, tokens_out: u32) -> Result<f64, TurnError> {
        let price = self.prices.price(provider).ok_or_else(|| {
            TurnError::configuration(format!("no price configured for provider '{provider}'"))
        })?;
        let total = u64::from(tokens_in) + u64::from(tokens_out);
        Ok(total as f64 / 1000.0 * price)
    }
}
