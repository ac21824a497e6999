//! Provider-agnostic call contract, reliability executor, and vendor adapters.
//!
//! ```rust
//! use std::time::Duration;
//!
//! use rprovider::{ProviderError, ProviderId, ReliabilityPolicy};
//!
//! let policy = ReliabilityPolicy::default();
//! assert_eq!(policy.timeout, Duration::from_secs(3));
//! assert_eq!(policy.backoff_for_attempt(4), Duration::from_millis(800));
//!
//! assert!(ProviderError::server_error("boom").is_retryable());
//! assert_eq!("vendorB".parse::<ProviderId>(), Ok(ProviderId::VendorB));
//! ```

pub mod adapters;
mod error;
mod model;
mod provider;
mod registry;
mod resilience;

pub mod prelude;

pub use error::{ProviderError, ProviderErrorKind};
pub use model::{NormalizedResponse, ParseProviderIdError, ProviderId};
pub use provider::{ProviderClient, ProviderFuture};
pub use registry::ProviderRegistry;
pub use resilience::{
    AttemptOutcome, NoopOperationHooks, ProviderOperationHooks, ReliabilityExecutor,
    ReliabilityPolicy, Sleeper, TokioSleeper, execute_with_retry,
};
