use std::future::Future;
use std::pin::Pin;

use crate::{NormalizedResponse, ProviderError, ProviderId};

pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A single, non-retried call to one upstream provider.
///
/// Implementations translate their vendor wire shape into the shared
/// [`NormalizedResponse`] / [`ProviderError`] contract. Timeouts and retries
/// belong to [`crate::ReliabilityExecutor`], never to a client.
pub trait ProviderClient: Send + Sync {
    fn id(&self) -> ProviderId;

    fn call<'a>(
        &'a self,
        prompt: &'a str,
    ) -> ProviderFuture<'a, Result<NormalizedResponse, ProviderError>>;
}
