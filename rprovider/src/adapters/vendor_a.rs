//! vendorA adapter.
//!
//! vendorA signals failure with a sentinel `_error` object inside an
//! otherwise ordinary response body.
//!
//! ```rust
//! use rprovider::adapters::vendor_a::VendorABody;
//! use rprovider::ProviderId;
//!
//! let body: VendorABody = serde_json::from_value(serde_json::json!({
//!     "outputText": "hi",
//!     "tokensIn": 3,
//!     "tokensOut": 9,
//!     "latencyMs": 120
//! }))
//! .expect("body should parse");
//!
//! let response = body.normalize().expect("success body");
//! assert_eq!(response.provider, ProviderId::VendorA);
//! assert_eq!(response.latency_ms, Some(120));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::adapters::simulation::{SimulatedUpstream, SimulationProfile, reply_text};
use crate::{NormalizedResponse, ProviderClient, ProviderError, ProviderFuture, ProviderId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorAError {
    pub http_code: u16,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorABody {
    #[serde(rename = "_error", default, skip_serializing_if = "Option::is_none")]
    pub error: Option<VendorAError>,
    #[serde(default)]
    pub output_text: Option<String>,
    #[serde(default)]
    pub tokens_in: Option<u32>,
    #[serde(default)]
    pub tokens_out: Option<u32>,
    #[serde(default)]
    pub latency_ms: Option<u64>,
}

impl VendorABody {
    pub fn normalize(self) -> Result<NormalizedResponse, ProviderError> {
        if let Some(error) = self.error {
            return Err(ProviderError::http(
                error.http_code,
                error.message.unwrap_or_else(|| "vendorA error".to_string()),
            ));
        }

        let (Some(text), Some(tokens_in), Some(tokens_out)) =
            (self.output_text, self.tokens_in, self.tokens_out)
        else {
            return Err(ProviderError::malformed(
                "vendorA response is missing outputText or token counts",
            ));
        };

        let mut response = NormalizedResponse::new(ProviderId::VendorA, text, tokens_in, tokens_out);
        response.latency_ms = self.latency_ms;
        Ok(response)
    }
}

pub trait VendorATransport: Send + Sync {
    fn chat<'a>(&'a self, prompt: &'a str) -> ProviderFuture<'a, Result<Value, ProviderError>>;
}

/// In-process stand-in for the vendorA upstream.
#[derive(Debug)]
pub struct SimulatedVendorATransport {
    upstream: SimulatedUpstream,
}

impl SimulatedVendorATransport {
    pub fn default_profile() -> SimulationProfile {
        SimulationProfile::new(vec![80, 120, 200, 400, 1800, 2500], 0.10)
    }

    pub fn new() -> Self {
        Self {
            upstream: SimulatedUpstream::new(Self::default_profile()),
        }
    }

    pub fn with_upstream(upstream: SimulatedUpstream) -> Self {
        Self { upstream }
    }
}

impl Default for SimulatedVendorATransport {
    fn default() -> Self {
        Self::new()
    }
}

impl VendorATransport for SimulatedVendorATransport {
    fn chat<'a>(&'a self, prompt: &'a str) -> ProviderFuture<'a, Result<Value, ProviderError>> {
        Box::pin(async move {
            let draw = self.upstream.draw(prompt);
            tokio::time::sleep(draw.latency()).await;

            if draw.fails {
                return Ok(json!({
                    "_error": { "http_code": 500, "message": "VendorA internal error" }
                }));
            }

            Ok(json!({
                "outputText": reply_text("VendorA", prompt),
                "tokensIn": draw.tokens_in,
                "tokensOut": draw.tokens_out,
                "latencyMs": draw.latency_ms,
            }))
        })
    }
}

#[derive(Debug)]
pub struct VendorAProvider<T> {
    transport: T,
}

impl<T> VendorAProvider<T>
where
    T: VendorATransport,
{
    pub fn new(transport: T) -> Self {
        Self { transport }
    }
}

impl VendorAProvider<SimulatedVendorATransport> {
    pub fn simulated() -> Self {
        Self::new(SimulatedVendorATransport::new())
    }
}

impl<T> ProviderClient for VendorAProvider<T>
where
    T: VendorATransport,
{
    fn id(&self) -> ProviderId {
        ProviderId::VendorA
    }

    fn call<'a>(
        &'a self,
        prompt: &'a str,
    ) -> ProviderFuture<'a, Result<NormalizedResponse, ProviderError>> {
        Box::pin(async move {
            let raw = self.transport.chat(prompt).await?;
            let body: VendorABody = serde_json::from_value(raw).map_err(|error| {
                ProviderError::malformed(format!("vendorA body did not parse: {error}"))
            })?;
            body.normalize()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_error_maps_to_http_error() {
        let body: VendorABody = serde_json::from_value(json!({
            "_error": { "http_code": 500, "message": "VendorA internal error" }
        }))
        .expect("error body parses");

        let error = body.normalize().expect_err("sentinel must fail");
        assert_eq!(error.http_code, Some(500));
        assert_eq!(error.message, "VendorA internal error");
        assert!(error.is_retryable());
    }

    #[test]
    fn sentinel_error_without_message_gets_default() {
        let body: VendorABody =
            serde_json::from_value(json!({ "_error": { "http_code": 503 } })).expect("parses");
        let error = body.normalize().expect_err("sentinel must fail");
        assert_eq!(error.message, "vendorA error");
        assert!(!error.is_retryable());
    }

    #[test]
    fn missing_fields_are_malformed() {
        let body: VendorABody =
            serde_json::from_value(json!({ "outputText": "partial" })).expect("parses");
        let error = body.normalize().expect_err("partial body must fail");
        assert_eq!(error.http_code, Some(502));
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_transport_produces_normalizable_bodies() {
        let upstream = SimulatedUpstream::seeded(SimulatedVendorATransport::default_profile(), 9);
        let provider = VendorAProvider::new(SimulatedVendorATransport::with_upstream(upstream));

        let mut successes = 0;
        for _ in 0..30 {
            match provider.call("SYSTEM: be brief\nUSER: hello").await {
                Ok(response) => {
                    successes += 1;
                    assert_eq!(response.provider, ProviderId::VendorA);
                    assert!(response.text.starts_with("[VendorA] SYSTEM: be brief"));
                    assert!(response.latency_ms.is_some());
                }
                Err(error) => assert_eq!(error.http_code, Some(500)),
            }
        }
        assert!(successes > 0);
    }
}
