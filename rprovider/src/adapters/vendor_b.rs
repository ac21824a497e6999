//! vendorB adapter.
//!
//! vendorB answers with a chat-completions style body and signals throttling
//! with a structured rate-limit `_error` carrying `retryAfterMs`. It does not
//! report latency.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::adapters::simulation::{SimulatedUpstream, SimulationProfile, reply_text};
use crate::{NormalizedResponse, ProviderClient, ProviderError, ProviderFuture, ProviderId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorBError {
    pub http_code: u16,
    #[serde(rename = "retryAfterMs", default)]
    pub retry_after_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorBMessage {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorBChoice {
    pub message: VendorBMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorBUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VendorBBody {
    #[serde(rename = "_error", default, skip_serializing_if = "Option::is_none")]
    pub error: Option<VendorBError>,
    #[serde(default)]
    pub choices: Vec<VendorBChoice>,
    #[serde(default)]
    pub usage: Option<VendorBUsage>,
}

impl VendorBBody {
    pub fn normalize(self) -> Result<NormalizedResponse, ProviderError> {
        if let Some(error) = self.error {
            let retry_after = error.retry_after_ms.map(Duration::from_millis);
            return Err(match error.http_code {
                429 => ProviderError::rate_limited(retry_after),
                code => ProviderError::http(code, "vendorB error"),
            });
        }

        let usage = self
            .usage
            .ok_or_else(|| ProviderError::malformed("vendorB response is missing usage"))?;
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::malformed("vendorB response has no choices"))?;

        Ok(NormalizedResponse::new(
            ProviderId::VendorB,
            choice.message.content,
            usage.input_tokens,
            usage.output_tokens,
        ))
    }
}

pub trait VendorBTransport: Send + Sync {
    fn chat<'a>(&'a self, prompt: &'a str) -> ProviderFuture<'a, Result<Value, ProviderError>>;
}

/// In-process stand-in for the vendorB upstream.
#[derive(Debug)]
pub struct SimulatedVendorBTransport {
    upstream: SimulatedUpstream,
}

impl SimulatedVendorBTransport {
    pub fn default_profile() -> SimulationProfile {
        SimulationProfile::new(vec![80, 120, 200, 300], 0.15).with_retry_after_ms(vec![200, 400, 800])
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

impl Default for SimulatedVendorBTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl VendorBTransport for SimulatedVendorBTransport {
    fn chat<'a>(&'a self, prompt: &'a str) -> ProviderFuture<'a, Result<Value, ProviderError>> {
        Box::pin(async move {
            let draw = self.upstream.draw(prompt);
            tokio::time::sleep(draw.latency()).await;

            if draw.fails {
                return Ok(json!({
                    "_error": { "http_code": 429, "retryAfterMs": draw.retry_after_ms }
                }));
            }

            Ok(json!({
                "choices": [{ "message": { "content": reply_text("VendorB", prompt) } }],
                "usage": {
                    "input_tokens": draw.tokens_in,
                    "output_tokens": draw.tokens_out,
                },
            }))
        })
    }
}

#[derive(Debug)]
pub struct VendorBProvider<T> {
    transport: T,
}

impl<T> VendorBProvider<T>
where
    T: VendorBTransport,
{
    pub fn new(transport: T) -> Self {
        Self { transport }
    }
}

impl VendorBProvider<SimulatedVendorBTransport> {
    pub fn simulated() -> Self {
        Self::new(SimulatedVendorBTransport::new())
    }
}

impl<T> ProviderClient for VendorBProvider<T>
where
    T: VendorBTransport,
{
    fn id(&self) -> ProviderId {
        ProviderId::VendorB
    }

    fn call<'a>(
        &'a self,
        prompt: &'a str,
    ) -> ProviderFuture<'a, Result<NormalizedResponse, ProviderError>> {
        Box::pin(async move {
            let raw = self.transport.chat(prompt).await?;
            let body: VendorBBody = serde_json::from_value(raw).map_err(|error| {
                ProviderError::malformed(format!("vendorB body did not parse: {error}"))
            })?;
            body.normalize()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_body_normalizes_without_latency() {
        let body: VendorBBody = serde_json::from_value(json!({
            "choices": [{ "message": { "content": "hello there" } }],
            "usage": { "input_tokens": 5, "output_tokens": 40 }
        }))
        .expect("parses");

        let response = body.normalize().expect("success");
        assert_eq!(response.text, "hello there");
        assert_eq!(response.total_tokens(), 45);
        assert_eq!(response.latency_ms, None);
    }

    #[test]
    fn rate_limit_body_carries_retry_after_hint() {
        let body: VendorBBody = serde_json::from_value(json!({
            "_error": { "http_code": 429, "retryAfterMs": 400 }
        }))
        .expect("parses");

        let error = body.normalize().expect_err("rate limited");
        assert_eq!(error.http_code, Some(429));
        assert_eq!(error.retry_after_hint(), Some(Duration::from_millis(400)));
    }

    #[test]
    fn empty_choices_are_malformed() {
        let body: VendorBBody = serde_json::from_value(json!({
            "choices": [],
            "usage": { "input_tokens": 1, "output_tokens": 1 }
        }))
        .expect("parses");

        assert_eq!(body.normalize().expect_err("no choices").http_code, Some(502));
    }
}
