//! Common `rprovider` imports for downstream crates.

pub use crate::{
    AttemptOutcome, NoopOperationHooks, NormalizedResponse, ProviderClient, ProviderError,
    ProviderErrorKind, ProviderFuture, ProviderId, ProviderOperationHooks, ProviderRegistry,
    ReliabilityExecutor, ReliabilityPolicy, Sleeper, TokioSleeper, execute_with_retry,
};
pub use rcommon::BoxFuture;
