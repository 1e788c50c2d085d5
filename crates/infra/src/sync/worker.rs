//! Worker pool draining the request channel.
//!
//! Each worker claims one request at a time, runs it through the
//! [`RequestConsumer`] and acknowledges it once the outcome is settled
//! (completed, or handed to the failure channel). While a request runs its
//! lease is renewed every third of the lease period; a worker that loses the
//! lease abandons the request to whoever claimed it next. A request whose
//! failure could not be published stays unacknowledged and is delivered again
//! when its lease expires. Join handles are tracked and cancellation is
//! explicit.

use std::sync::Arc;
use std::time::Duration;

use eventsync_core::sync::{ProcessOutcome, RequestConsumer, RequestQueue};
use eventsync_domain::{EventSyncError, InboundMessage, WorkerConfig};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::errors::WorkerError;

const MIN_LEASE_RENEWAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    pub workers: usize,
    /// Sleep between polls of an empty channel.
    pub poll_interval: Duration,
    /// Visibility timeout of a claimed request.
    pub lease: Duration,
    /// How long `stop` waits for in-flight requests.
    pub join_timeout: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self::from(&WorkerConfig::default())
    }
}

impl From<&WorkerConfig> for WorkerPoolConfig {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            workers: config.workers.max(1),
            poll_interval: config.poll_interval,
            lease: config.lease,
            join_timeout: config.shutdown_timeout,
        }
    }
}

pub struct SyncWorkerPool {
    queue: Arc<dyn RequestQueue>,
    consumer: Arc<RequestConsumer>,
    config: WorkerPoolConfig,
    cancellation: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl SyncWorkerPool {
    pub fn new(
        queue: Arc<dyn RequestQueue>,
        consumer: Arc<RequestConsumer>,
        config: WorkerPoolConfig,
    ) -> Self {
        Self { queue, consumer, config, cancellation: CancellationToken::new(), handles: Vec::new() }
    }

    #[instrument(skip(self), fields(workers = self.config.workers))]
    pub fn start(&mut self) -> Result<(), WorkerError> {
        if self.is_running() {
            return Err(WorkerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();
        for index in 0..self.config.workers.max(1) {
            let worker = Worker {
                id: format!("worker-{index}"),
                queue: Arc::clone(&self.queue),
                consumer: Arc::clone(&self.consumer),
                poll_interval: self.config.poll_interval,
                lease: self.config.lease,
            };
            let cancel = self.cancellation.clone();
            self.handles.push(tokio::spawn(worker.run(cancel)));
        }

        info!("sync worker pool started");
        Ok(())
    }

    /// Cancel all workers and wait for in-flight requests to settle.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<(), WorkerError> {
        if !self.is_running() {
            return Err(WorkerError::NotRunning);
        }

        info!("stopping sync worker pool");
        self.cancellation.cancel();

        let handles = std::mem::take(&mut self.handles);
        let joined =
            tokio::time::timeout(self.config.join_timeout, futures::future::join_all(handles)).await;

        let result = match joined {
            Ok(results) => {
                let panicked = results.iter().filter(|r| r.is_err()).count();
                if panicked == 0 {
                    Ok(())
                } else {
                    error!(panicked, "worker tasks panicked");
                    Err(WorkerError::Panicked(panicked))
                }
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.config.join_timeout.as_secs(),
                    "worker tasks did not finish in time"
                );
                Err(WorkerError::ShutdownTimeout(self.config.workers))
            }
        };

        self.cancellation = CancellationToken::new();
        info!("sync worker pool stopped");
        result
    }

    pub fn is_running(&self) -> bool {
        !self.handles.is_empty()
    }
}

struct Worker {
    id: String,
    queue: Arc<dyn RequestQueue>,
    consumer: Arc<RequestConsumer>,
    poll_interval: Duration,
    lease: Duration,
}

impl Worker {
    async fn run(self, cancel: CancellationToken) {
        debug!(worker = %self.id, "worker started");
        loop {
            // Cancellation is only observed between requests, so a request
            // in flight always runs to an acknowledged or leased state.
            if cancel.is_cancelled() {
                break;
            }

            let busy = self.poll_once().await;
            if !busy {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(self.poll_interval) => {}
                }
            }
        }
        debug!(worker = %self.id, "worker stopped");
    }

    /// Claim and process one request. Returns whether there was one.
    async fn poll_once(&self) -> bool {
        let message = match self.queue.dequeue(&self.id, self.lease).await {
            Ok(Some(message)) => message,
            Ok(None) => return false,
            Err(e) => {
                warn!(worker = %self.id, error = %e, "request channel unavailable");
                return false;
            }
        };

        let Some(processed) = self.process_under_lease(&message).await else {
            return true;
        };
        match processed {
            Ok(outcome) => {
                if let ProcessOutcome::RoutedToFailureChannel { kind, retryable } = &outcome {
                    debug!(worker = %self.id, message_id = %message.id, kind, retryable, "request parked");
                }
                if let Err(e) = self.queue.acknowledge(&message.id).await {
                    // The lease expires and the request runs again.
                    warn!(worker = %self.id, message_id = %message.id, error = %e, "acknowledge failed");
                }
            }
            Err(e) => {
                error!(
                    worker = %self.id,
                    message_id = %message.id,
                    error = %e,
                    "request left for redelivery"
                );
            }
        }
        true
    }

    /// Run the consumer while renewing the lease. `None` means the lease was
    /// lost and the request was abandoned unacknowledged.
    async fn process_under_lease(
        &self,
        message: &InboundMessage,
    ) -> Option<Result<ProcessOutcome, EventSyncError>> {
        let processing = self.consumer.process(message);
        tokio::pin!(processing);

        let mut renewal = tokio::time::interval((self.lease / 3).max(MIN_LEASE_RENEWAL));
        renewal.set_missed_tick_behavior(MissedTickBehavior::Delay);
        renewal.tick().await;

        loop {
            tokio::select! {
                outcome = &mut processing => return Some(outcome),
                _ = renewal.tick() => {
                    match self.queue.renew_lease(&message.id, &self.id, self.lease).await {
                        Ok(true) => debug!(worker = %self.id, message_id = %message.id, "lease renewed"),
                        Ok(false) => {
                            warn!(worker = %self.id, message_id = %message.id, "lease lost, abandoning request");
                            return None;
                        }
                        // The lease may still be held; the next tick tries again.
                        Err(e) => warn!(worker = %self.id, message_id = %message.id, error = %e, "lease renewal failed"),
                    }
                }
            }
        }
    }
}
