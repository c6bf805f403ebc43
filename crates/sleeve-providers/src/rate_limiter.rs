// SPDX-License-Identifier: GPL-3.0-or-later

//! Per-provider request queues.
//!
//! Every provider gets one FIFO queue and at most one drain task. The drain
//! task dispatches queued requests one at a time, spacing dispatches by the
//! provider's effective interval, and exits once the queue is empty. Queues of
//! different providers never wait on each other.

use futures::future::BoxFuture;
use futures::FutureExt;
use sleeve_domain::{RateLimitConfig, RateLimitTable};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, trace, warn};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queued request for {provider} panicked")]
    TaskAborted { provider: String },
    #[error("queue for {provider} dropped the request")]
    Dropped { provider: String },
}

type Job = BoxFuture<'static, ()>;

/// Registry of provider queues, shared by every adapter.
#[derive(Clone)]
pub struct RequestQueues {
    inner: Arc<QueuesInner>,
}

struct QueuesInner {
    table: RateLimitTable,
    queues: Mutex<HashMap<String, Arc<ProviderQueue>>>,
}

impl RequestQueues {
    pub fn new(table: RateLimitTable) -> Self {
        Self {
            inner: Arc::new(QueuesInner {
                table,
                queues: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Queues with no pacing, for tests against local mock servers.
    pub fn unlimited() -> Self {
        Self::new(RateLimitTable::uniform(RateLimitConfig::unlimited()))
    }

    pub fn config_for(&self, provider: &str) -> RateLimitConfig {
        self.inner.table.get(provider)
    }

    /// Run `task` once every request queued before it for `provider` has been
    /// dispatched and the provider's interval has elapsed. Resolves to the
    /// task's own output; a panicking task only fails its own caller.
    pub async fn enqueue<F, T>(&self, provider: &str, task: F) -> Result<T, QueueError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let queue = self.queue_for(provider);
        let (sender, receiver) = oneshot::channel();

        let job: Job = Box::pin(async move {
            let outcome = AssertUnwindSafe(task).catch_unwind().await;
            // The caller may have stopped waiting; the request still counted.
            let _ = sender.send(outcome.map_err(|_| ()));
        });

        let start_drain = {
            let mut state = queue.lock_state();
            state.pending.push_back(job);
            trace!(target: "rate-limit", provider, pending = state.pending.len(), "request queued");
            !std::mem::replace(&mut state.is_draining, true)
        };

        if start_drain {
            tokio::spawn(queue.clone().drain());
        }

        match receiver.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(())) => {
                warn!(target: "rate-limit", provider, "queued request panicked");
                Err(QueueError::TaskAborted {
                    provider: provider.to_string(),
                })
            }
            Err(_) => Err(QueueError::Dropped {
                provider: provider.to_string(),
            }),
        }
    }

    /// Number of requests waiting (not yet dispatched) for `provider`.
    pub fn pending(&self, provider: &str) -> usize {
        self.lock_queues()
            .get(provider)
            .map(|queue| queue.lock_state().pending.len())
            .unwrap_or(0)
    }

    /// Forget every queue. Drain tasks already running still finish their
    /// backlog, but nothing spaces that backlog against requests queued after
    /// the reset: a provider can briefly see two requests closer than its
    /// interval. Meant for tests and process-wide reconfiguration, not for
    /// use while traffic is flowing.
    pub fn reset(&self) {
        self.lock_queues().clear();
    }

    fn queue_for(&self, provider: &str) -> Arc<ProviderQueue> {
        let mut queues = self.lock_queues();
        queues
            .entry(provider.to_string())
            .or_insert_with(|| {
                let config = self.inner.table.get(provider);
                debug!(
                    target: "rate-limit",
                    provider,
                    requests_per_minute = config.requests_per_minute,
                    min_interval_ms = config.min_interval_ms,
                    "creating provider queue"
                );
                Arc::new(ProviderQueue::new(provider, config))
            })
            .clone()
    }

    fn lock_queues(&self) -> MutexGuard<'_, HashMap<String, Arc<ProviderQueue>>> {
        self.inner.queues.lock().unwrap_or_else(|poisoned| {
            warn!(target: "rate-limit", "queue registry mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl Default for RequestQueues {
    fn default() -> Self {
        Self::new(RateLimitTable::default())
    }
}

impl std::fmt::Debug for RequestQueues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestQueues")
            .field("providers", &self.lock_queues().keys().collect::<Vec<_>>())
            .finish()
    }
}

struct ProviderQueue {
    name: String,
    interval: Duration,
    state: Mutex<QueueState>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Job>,
    is_draining: bool,
    last_request_at: Option<Instant>,
}

impl ProviderQueue {
    fn new(name: &str, config: RateLimitConfig) -> Self {
        Self {
            name: name.to_string(),
            interval: config.effective_interval(),
            state: Mutex::new(QueueState::default()),
        }
    }

    async fn drain(self: Arc<Self>) {
        loop {
            let (job, last_request_at) = {
                let mut state = self.lock_state();
                match state.pending.pop_front() {
                    Some(job) => (job, state.last_request_at),
                    None => {
                        state.is_draining = false;
                        return;
                    }
                }
            };

            if let Some(last) = last_request_at {
                let elapsed = last.elapsed();
                if elapsed < self.interval {
                    let wait = self.interval - elapsed;
                    trace!(target: "rate-limit", provider = %self.name, "rate limiting: waiting {:?}", wait);
                    sleep(wait).await;
                }
            }

            self.lock_state().last_request_at = Some(Instant::now());
            job.await;
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!(target: "rate-limit", provider = %self.name, "queue mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }
}
