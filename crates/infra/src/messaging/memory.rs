//! In-process request queue and failure channel, for embedding the engine
//! and for tests.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use eventsync_core::sync::{FailureChannel, RequestQueue, SyncFailure};
use eventsync_domain::{DeadLetter, EventSyncError, InboundMessage, Result};
use parking_lot::Mutex;

struct Claimed {
    message: InboundMessage,
    worker_id: String,
    lease_until: Instant,
}

#[derive(Default)]
struct QueueState {
    ready: VecDeque<InboundMessage>,
    claimed: Vec<Claimed>,
}

impl QueueState {
    /// Return requests whose lease ran out to the front of the queue.
    fn reclaim_expired(&mut self, now: Instant) {
        let (expired, live): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.claimed).into_iter().partition(|c| c.lease_until <= now);
        self.claimed = live;
        for claim in expired.into_iter().rev() {
            self.ready.push_front(claim.message);
        }
    }
}

/// FIFO queue with the same lease semantics as the SQLite inbox.
#[derive(Default)]
pub struct InMemoryRequestQueue {
    state: Mutex<QueueState>,
}

impl InMemoryRequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests waiting or in flight.
    pub fn pending_count(&self) -> usize {
        let state = self.state.lock();
        state.ready.len() + state.claimed.len()
    }

    /// Workers currently holding a lease.
    pub fn claimed_by(&self) -> Vec<String> {
        self.state.lock().claimed.iter().map(|c| c.worker_id.clone()).collect()
    }
}

#[async_trait]
impl RequestQueue for InMemoryRequestQueue {
    async fn enqueue(&self, message: &InboundMessage) -> Result<()> {
        self.state.lock().ready.push_back(message.clone());
        Ok(())
    }

    async fn dequeue(&self, worker_id: &str, lease: Duration) -> Result<Option<InboundMessage>> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.reclaim_expired(now);

        let Some(mut message) = state.ready.pop_front() else {
            return Ok(None);
        };
        message.delivery_count += 1;
        state.claimed.push(Claimed {
            message: message.clone(),
            worker_id: worker_id.to_string(),
            lease_until: now + lease,
        });
        Ok(Some(message))
    }

    async fn renew_lease(&self, message_id: &str, worker_id: &str, lease: Duration) -> Result<bool> {
        let mut state = self.state.lock();
        let held = state
            .claimed
            .iter_mut()
            .find(|c| c.message.id == message_id && c.worker_id == worker_id);
        Ok(match held {
            Some(claim) => {
                claim.lease_until = Instant::now() + lease;
                true
            }
            None => false,
        })
    }

    async fn acknowledge(&self, message_id: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.claimed.retain(|c| c.message.id != message_id);
        state.ready.retain(|m| m.id != message_id);
        Ok(())
    }
}

/// Failure channel that keeps dead letters in memory.
#[derive(Default)]
pub struct InMemoryFailureChannel {
    letters: Mutex<Vec<DeadLetter>>,
}

impl InMemoryFailureChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.letters.lock().clone()
    }

    /// Remove a dead letter and put it back on `queue` with a fresh delivery
    /// count.
    pub async fn resubmit(&self, message_id: &str, queue: &dyn RequestQueue) -> Result<()> {
        let letter = {
            let mut letters = self.letters.lock();
            let position = letters
                .iter()
                .position(|l| l.message.id == message_id)
                .ok_or_else(|| EventSyncError::NotFound(format!("dead letter {message_id}")))?;
            letters.remove(position)
        };

        let mut message = letter.message;
        message.delivery_count = 0;
        queue.enqueue(&message).await
    }
}

#[async_trait]
impl FailureChannel for InMemoryFailureChannel {
    async fn publish(&self, message: &InboundMessage, failure: &SyncFailure) -> Result<()> {
        self.letters.lock().push(DeadLetter {
            message: message.clone(),
            failure_kind: failure.label().to_string(),
            failure_reason: failure.to_string(),
            failed_at: Utc::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use eventsync_domain::MessageProperties;

    use super::*;

    fn message(body: &str) -> InboundMessage {
        InboundMessage::new(body, MessageProperties::new())
    }

    #[tokio::test]
    async fn delivers_in_order_and_hides_claimed_requests() {
        let queue = InMemoryRequestQueue::new();
        queue.enqueue(&message("first")).await.unwrap();
        queue.enqueue(&message("second")).await.unwrap();

        let lease = Duration::from_secs(60);
        let first = queue.dequeue("w1", lease).await.unwrap().unwrap();
        let second = queue.dequeue("w2", lease).await.unwrap().unwrap();
        assert_eq!((first.body.as_str(), second.body.as_str()), ("first", "second"));
        assert_eq!(first.delivery_count, 1);
        assert!(queue.dequeue("w3", lease).await.unwrap().is_none());

        queue.acknowledge(&first.id).await.unwrap();
        assert_eq!(queue.pending_count(), 1);
        assert_eq!(queue.claimed_by(), vec!["w2".to_string()]);
    }

    #[tokio::test]
    async fn expired_lease_makes_request_visible_again() {
        let queue = InMemoryRequestQueue::new();
        queue.enqueue(&message("retry me")).await.unwrap();

        let claimed = queue.dequeue("w1", Duration::ZERO).await.unwrap().unwrap();
        let again = queue.dequeue("w2", Duration::from_secs(60)).await.unwrap().unwrap();
        assert_eq!(again.id, claimed.id);
        assert_eq!(again.delivery_count, 2);
    }

    #[tokio::test]
    async fn renewed_lease_keeps_request_hidden() {
        let queue = InMemoryRequestQueue::new();
        queue.enqueue(&message("slow")).await.unwrap();

        let claimed = queue.dequeue("w1", Duration::ZERO).await.unwrap().unwrap();
        assert!(queue.renew_lease(&claimed.id, "w1", Duration::from_secs(60)).await.unwrap());
        assert!(queue.dequeue("w2", Duration::from_secs(60)).await.unwrap().is_none());
        assert!(!queue.renew_lease(&claimed.id, "w2", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn resubmit_moves_letter_back_to_queue() {
        let queue = InMemoryRequestQueue::new();
        let channel = InMemoryFailureChannel::new();
        let mut failed = message("failed");
        failed.delivery_count = 3;
        let failure = SyncFailure::NotFound("organisation 'Mithlond'".into());

        channel.publish(&failed, &failure).await.unwrap();
        let letters = channel.dead_letters();
        assert_eq!(letters[0].failure_kind, "not_found");
        assert_eq!(letters[0].message, failed);

        channel.resubmit(&failed.id, &queue).await.unwrap();
        assert!(channel.dead_letters().is_empty());
        let redelivered = queue.dequeue("w1", Duration::from_secs(60)).await.unwrap().unwrap();
        assert_eq!(redelivered.body, "failed");
        assert_eq!(redelivered.delivery_count, 1);

        let missing = channel.resubmit(&failed.id, &queue).await.unwrap_err();
        assert!(matches!(missing, EventSyncError::NotFound(_)));
    }
}
