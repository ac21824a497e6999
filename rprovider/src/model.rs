//! Provider identifiers and the normalized response shape.
//!
//! ```rust
//! use rprovider::{NormalizedResponse, ProviderId};
//!
//! let response = NormalizedResponse::new(ProviderId::VendorA, "hi", 5, 40).with_latency_ms(120);
//! assert_eq!(response.total_tokens(), 45);
//! assert_eq!(ProviderId::VendorA.to_string(), "vendorA");
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProviderId {
    #[serde(rename = "vendorA")]
    VendorA,
    #[serde(rename = "vendorB")]
    VendorB,
}

impl ProviderId {
    pub const ALL: [ProviderId; 2] = [ProviderId::VendorA, ProviderId::VendorB];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::VendorA => "vendorA",
            Self::VendorB => "vendorB",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseProviderIdError {
    pub value: String,
}

impl Display for ParseProviderIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown provider '{}'", self.value)
    }
}

impl Error for ParseProviderIdError {}

impl FromStr for ProviderId {
    type Err = ParseProviderIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "vendora" | "vendor-a" | "vendor_a" | "a" => Ok(Self::VendorA),
            "vendorb" | "vendor-b" | "vendor_b" | "b" => Ok(Self::VendorB),
            _ => Err(ParseProviderIdError {
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedResponse {
    pub provider: ProviderId,
    pub text: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub latency_ms: Option<u64>,
}

impl NormalizedResponse {
    pub fn new(provider: ProviderId, text: impl Into<String>, tokens_in: u32, tokens_out: u32) -> Self {
        Self {
            provider,
            text: text.into(),
            tokens_in,
            tokens_out,
            latency_ms: None,
        }
    }

    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }

    pub fn total_tokens(&self) -> u64 {
        u64::from(self.tokens_in) + u64::from(self.tokens_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_id_display_is_stable() {
        assert_eq!(ProviderId::VendorA.to_string(), "vendorA");
        assert_eq!(ProviderId::VendorB.to_string(), "vendorB");
    }

    #[test]
    fn provider_id_parses_aliases() {
        assert_eq!(" VendorA ".parse::<ProviderId>(), Ok(ProviderId::VendorA));
        assert_eq!("vendor-b".parse::<ProviderId>(), Ok(ProviderId::VendorB));
        assert_eq!("b".parse::<ProviderId>(), Ok(ProviderId::VendorB));

        let error = "vendorC".parse::<ProviderId>().expect_err("unknown must fail");
        assert_eq!(error.value, "vendorC");
    }

    #[test]
    fn provider_id_serializes_with_wire_names() {
        let encoded = serde_json::to_string(&ProviderId::VendorB).expect("serialize");
        assert_eq!(encoded, "\"vendorB\"");
        let decoded: ProviderId = serde_json::from_str("\"vendorA\"").expect("deserialize");
        assert_eq!(decoded, ProviderId::VendorA);
    }
}
