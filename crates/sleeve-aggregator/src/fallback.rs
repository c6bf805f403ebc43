// SPDX-License-Identifier: GPL-3.0-or-later

//! Ordered, strictly sequential provider fallback.

use futures::future::BoxFuture;
use futures::FutureExt;
use sleeve_domain::{HasData, SourcedResult};
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

type AttemptFuture<'a, T> = BoxFuture<'a, anyhow::Result<Option<SourcedResult<T>>>>;

struct Attempt<'a, T> {
    provider: String,
    call: Box<dyn FnOnce() -> AttemptFuture<'a, T> + Send + 'a>,
}

/// Provider calls tried one after another until one yields data.
///
/// Calls are thunks: nothing is sent to a provider until the chain reaches it,
/// so providers after the first hit are never contacted.
pub struct FallbackChain<'a, T> {
    label: &'static str,
    attempts: Vec<Attempt<'a, T>>,
}

impl<'a, T> FallbackChain<'a, T>
where
    T: HasData + Send + 'a,
{
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            attempts: Vec::new(),
        }
    }

    /// Append a provider call. Errors it returns are logged and skipped.
    pub fn attempt<F, Fut>(mut self, provider: impl Into<String>, call: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = anyhow::Result<Option<SourcedResult<T>>>> + Send + 'a,
    {
        self.attempts.push(Attempt {
            provider: provider.into(),
            call: Box::new(move || call().boxed()),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    /// First result carrying data, or `None` once the chain is exhausted or
    /// the token fires. The token is checked before every attempt.
    pub async fn run(self, token: &CancellationToken) -> Option<SourcedResult<T>> {
        let label = self.label;
        let total = self.attempts.len();

        for (position, attempt) in self.attempts.into_iter().enumerate() {
            if token.is_cancelled() {
                debug!(
                    target: "aggregator",
                    chain = label,
                    provider = %attempt.provider,
                    "request cancelled, remaining providers skipped"
                );
                return None;
            }

            match (attempt.call)().await {
                Ok(Some(result)) if result.data().has_data() => {
                    debug!(
                        target: "aggregator",
                        chain = label,
                        provider = %attempt.provider,
                        position,
                        "provider returned data"
                    );
                    return Some(result);
                }
                Ok(_) => {
                    debug!(target: "aggregator", chain = label, provider = %attempt.provider, "provider returned nothing");
                }
                Err(error) => {
                    warn!(target: "aggregator", chain = label, provider = %attempt.provider, error = %error, "provider failed");
                }
            }
        }

        debug!(target: "aggregator", chain = label, attempted = total, "all providers exhausted");
        None
    }
}
