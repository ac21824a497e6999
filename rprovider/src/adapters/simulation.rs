//! Randomized upstream behavior shared by the simulated vendor transports.
//!
//! ```rust
//! use rprovider::adapters::simulation::{SimulatedUpstream, SimulationProfile};
//!
//! let upstream = SimulatedUpstream::seeded(SimulationProfile::new(vec![80], 0.0), 7);
//! let draw = upstream.draw("hello world");
//! assert_eq!(draw.latency_ms, 80);
//! assert!(!draw.fails);
//! assert_eq!(draw.tokens_in, 2);
//! ```

use std::sync::Mutex;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const PROMPT_PREVIEW_CHARS: usize = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationProfile {
    pub latencies_ms: Vec<u64>,
    pub failure_rate: f64,
    pub retry_after_ms: Vec<u64>,
}

impl SimulationProfile {
    pub fn new(latencies_ms: Vec<u64>, failure_rate: f64) -> Self {
        Self {
            latencies_ms,
            failure_rate: failure_rate.clamp(0.0, 1.0),
            retry_after_ms: Vec::new(),
        }
    }

    pub fn with_retry_after_ms(mut self, retry_after_ms: Vec<u64>) -> Self {
        self.retry_after_ms = retry_after_ms;
        self
    }

    pub fn with_failure_rate(mut self, failure_rate: f64) -> Self {
        self.failure_rate = failure_rate.clamp(0.0, 1.0);
        self
    }
}

/// One sampled upstream exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamDraw {
    pub latency_ms: u64,
    pub fails: bool,
    pub retry_after_ms: Option<u64>,
    pub tokens_in: u32,
    pub tokens_out: u32,
}

impl UpstreamDraw {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

#[derive(Debug)]
pub struct SimulatedUpstream {
    profile: SimulationProfile,
    rng: Mutex<StdRng>,
}

impl SimulatedUpstream {
    pub fn new(profile: SimulationProfile) -> Self {
        Self {
            profile,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(profile: SimulationProfile, seed: u64) -> Self {
        Self {
            profile,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn profile(&self) -> &SimulationProfile {
        &self.profile
    }

    pub fn draw(&self, prompt: &str) -> UpstreamDraw {
        let tokens_in = estimate_prompt_tokens(prompt);
        let mut rng = match self.rng.lock() {
            Ok(rng) => rng,
            Err(poisoned) => poisoned.into_inner(),
        };

        let latency_ms = self
            .profile
            .latencies_ms
            .choose(&mut *rng)
            .copied()
            .unwrap_or_default();
        let fails = rng.gen_bool(self.profile.failure_rate);
        let retry_after_ms = if fails {
            self.profile.retry_after_ms.choose(&mut *rng).copied()
        } else {
            None
        };
        let tokens_out = rng.gen_range(30..=120);

        UpstreamDraw {
            latency_ms,
            fails,
            retry_after_ms,
            tokens_in,
            tokens_out,
        }
    }
}

pub fn estimate_prompt_tokens(prompt: &str) -> u32 {
    let chars = u32::try_from(prompt.chars().count()).unwrap_or(u32::MAX);
    (chars / 4).max(1)
}

pub fn reply_text(label: &str, prompt: &str) -> String {
    let preview: String = prompt.chars().take(PROMPT_PREVIEW_CHARS).collect();
    format!("[{label}] {preview} ...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_tokens_are_a_quarter_of_chars_with_floor_of_one() {
        assert_eq!(estimate_prompt_tokens(""), 1);
        assert_eq!(estimate_prompt_tokens("abc"), 1);
        assert_eq!(estimate_prompt_tokens(&"x".repeat(40)), 10);
    }

    #[test]
    fn reply_text_truncates_prompt_preview() {
        let prompt = "y".repeat(100);
        let text = reply_text("VendorA", &prompt);
        assert_eq!(text, format!("[VendorA] {} ...", "y".repeat(60)));
    }

    #[test]
    fn seeded_upstreams_are_reproducible() {
        let profile = SimulationProfile::new(vec![80, 120, 200], 0.5).with_retry_after_ms(vec![200]);
        let first = SimulatedUpstream::seeded(profile.clone(), 42);
        let second = SimulatedUpstream::seeded(profile, 42);

        for _ in 0..20 {
            let a = first.draw("same prompt");
            let b = second.draw("same prompt");
            assert_eq!(a, b);
            assert!((30..=120).contains(&a.tokens_out));
            assert_eq!(a.retry_after_ms.is_some(), a.fails);
        }
    }

    #[test]
    fn failure_rate_extremes_are_honored() {
        let never = SimulatedUpstream::seeded(SimulationProfile::new(vec![1], 0.0), 1);
        let always = SimulatedUpstream::seeded(SimulationProfile::new(vec![1], 1.0), 1);

        for _ in 0..10 {
            assert!(!never.draw("p").fails);
            assert!(always.draw("p").fails);
        }
    }
}
