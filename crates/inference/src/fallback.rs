//! Ordered failover across inference backends.
//!
//! `FallbackChain` tries each backend in configured order, running the
//! warm-up retry loop on each one, and moves on when a backend is exhausted,
//! unreachable, or returns something unusable. Configuration order is the
//! only priority; nothing is reordered at runtime.

use std::sync::Arc;

use {
    async_trait::async_trait,
    parley_config::ParleyConfig,
    tracing::{debug, info, warn},
};

use crate::{
    backend::{BackendTarget, HttpBackend, InferenceBackend},
    error::Result,
    outcome::{InferenceOutcome, InferenceRequest},
    retry::{RetryPolicy, with_retry},
};

/// Reason reported when the chain has no backends at all.
pub const NO_BACKENDS: &str = "all backends exhausted";

/// Failover chain over a fixed list of backends (primary first).
///
/// Implements [`InferenceBackend`] itself so callers don't need to know about
/// failover.
pub struct FallbackChain {
    backends: Vec<Arc<dyn InferenceBackend>>,
    retry: RetryPolicy,
}

impl FallbackChain {
    pub fn new(backends: Vec<Arc<dyn InferenceBackend>>, retry: RetryPolicy) -> Self {
        Self { backends, retry }
    }

    /// Build HTTP backends for every configured target, sharing one client.
    pub fn from_config(config: &ParleyConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("parley/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let backends = config
            .backends
            .iter()
            .map(|cfg| {
                let target = BackendTarget::from_config(cfg)?;
                debug!(?target, "registered inference backend");
                Ok(Arc::new(HttpBackend::new(target, client.clone())) as Arc<dyn InferenceBackend>)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(backends, RetryPolicy::from(&config.retry)))
    }

    /// Backend ids in priority order.
    #[must_use]
    pub fn backend_ids(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.id().to_string()).collect()
    }

    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Try each backend in order until one succeeds.
    ///
    /// Returns the first success, otherwise the outcome of the last backend
    /// tried, or `Fatal("all backends exhausted")` when the chain is empty.
    pub async fn resolve(&self, request: &InferenceRequest) -> InferenceOutcome {
        let mut last = None;

        for (position, backend) in self.backends.iter().enumerate() {
            let outcome = with_retry(backend.as_ref(), request, &self.retry).await;
            if outcome.is_success() {
                if position > 0 {
                    info!(backend = backend.id(), position, "fallback backend answered");
                }
                return outcome;
            }

            warn!(
                backend = backend.id(),
                outcome = outcome.kind(),
                reason = outcome.detail(),
                remaining = self.backends.len() - position - 1,
                "backend failed, trying next in chain"
            );
            last = Some(outcome);
        }

        last.unwrap_or_else(|| InferenceOutcome::Fatal(NO_BACKENDS.into()))
    }
}

#[async_trait]
impl InferenceBackend for FallbackChain {
    fn id(&self) -> &str {
        self.backends.first().map_or("empty-chain", |b| b.id())
    }

    async fn invoke(&self, request: &InferenceRequest) -> InferenceOutcome {
        self.resolve(request).await
    }
}
