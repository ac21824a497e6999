#![cfg(all(feature = "vendor-a", feature = "vendor-b"))]

use std::sync::Mutex;
use std::time::Duration;

use rprovider::adapters::simulation::{SimulatedUpstream, SimulationProfile};
use rprovider::adapters::vendor_a::{SimulatedVendorATransport, VendorAProvider, VendorATransport};
use rprovider::adapters::vendor_b::{SimulatedVendorBTransport, VendorBProvider, VendorBTransport};
use rprovider::{ProviderClient, ProviderError, ProviderFuture, ProviderId, ProviderRegistry};
use serde_json::{Value, json};

#[derive(Debug)]
struct FakeTransport {
    body: Value,
    captured_prompt: Mutex<Option<String>>,
}

impl FakeTransport {
    fn new(body: Value) -> Self {
        Self {
            body,
            captured_prompt: Mutex::new(None),
        }
    }

    fn exchange(&self, prompt: &str) -> Result<Value, ProviderError> {
        *self.captured_prompt.lock().expect("prompt lock") = Some(prompt.to_string());
        Ok(self.body.clone())
    }
}

impl VendorATransport for FakeTransport {
    fn chat<'a>(&'a self, prompt: &'a str) -> ProviderFuture<'a, Result<Value, ProviderError>> {
        Box::pin(async move { self.exchange(prompt) })
    }
}

impl VendorBTransport for FakeTransport {
    fn chat<'a>(&'a self, prompt: &'a str) -> ProviderFuture<'a, Result<Value, ProviderError>> {
        Box::pin(async move { self.exchange(prompt) })
    }
}

#[tokio::test]
async fn vendor_a_maps_wire_fields_into_normalized_response() {
    let provider = VendorAProvider::new(FakeTransport::new(json!({
        "outputText": "[VendorA] hi ...",
        "tokensIn": 4,
        "tokensOut": 33,
        "latencyMs": 200
    })));

    let response = provider.call("SYSTEM: x\nUSER: hi").await.expect("success");

    assert_eq!(provider.id(), ProviderId::VendorA);
    assert_eq!(response.text, "[VendorA] hi ...");
    assert_eq!((response.tokens_in, response.tokens_out), (4, 33));
    assert_eq!(response.latency_ms, Some(200));
}

#[tokio::test]
async fn vendor_b_maps_rate_limit_body_into_classified_error() {
    let transport = FakeTransport::new(json!({
        "_error": { "http_code": 429, "retryAfterMs": 200 }
    }));
    let provider = VendorBProvider::new(transport);

    let error = provider.call("prompt").await.expect_err("rate limited");

    assert!(error.is_retryable());
    assert_eq!(error.retry_after_hint(), Some(Duration::from_millis(200)));
}

#[tokio::test]
async fn non_object_bodies_are_reported_as_malformed() {
    let provider = VendorBProvider::new(FakeTransport::new(json!("not an object")));
    let error = provider.call("prompt").await.expect_err("malformed");
    assert_eq!(error.http_code, Some(502));
    assert!(!error.is_retryable());
}

#[tokio::test(start_paused = true)]
async fn simulated_vendor_b_throttles_with_hints_from_profile() {
    let profile = SimulatedVendorBTransport::default_profile().with_failure_rate(1.0);
    let provider = VendorBProvider::new(SimulatedVendorBTransport::with_upstream(
        SimulatedUpstream::seeded(profile, 3),
    ));

    for _ in 0..10 {
        let error = provider.call("hello").await.expect_err("always throttled");
        let hint = error.retry_after_hint().expect("hint present");
        assert!([200, 400, 800].contains(&(hint.as_millis() as u64)));
    }
}

#[tokio::test(start_paused = true)]
async fn registry_serves_both_simulated_vendors() {
    let reliable = SimulationProfile::new(vec![80], 0.0);
    let mut registry = ProviderRegistry::new();
    registry.register(VendorAProvider::new(SimulatedVendorATransport::with_upstream(
        SimulatedUpstream::seeded(reliable.clone(), 1),
    )));
    registry.register(VendorBProvider::new(SimulatedVendorBTransport::with_upstream(
        SimulatedUpstream::seeded(reliable, 2),
    )));

    for provider_id in ProviderId::ALL {
        let client = registry.get(provider_id).expect("registered");
        let response = client.call("hello").await.expect("reliable profile");
        assert_eq!(response.provider, provider_id);
        assert_eq!(response.tokens_in, 1);
    }
}
