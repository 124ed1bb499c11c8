// Event Publisher
//
// Wraps an EventStore. The publisher assigns event_id and timestamp once,
// before the first attempt; the store assigns the version. Because stores
// treat a repeated event_id as a no-op, retrying an append never duplicates
// an event.

use std::sync::Arc;

use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::events::{Event, NewEvent, Payload};
use crate::retry::RetryPolicy;
use crate::store::EventStore;

/// Publishes events to a store with bounded retries
#[derive(Clone)]
pub struct EventPublisher {
    store: Arc<dyn EventStore>,
    retry: RetryPolicy,
}

impl EventPublisher {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The store this publisher appends to
    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    /// Publish an event and return its id
    pub async fn publish(
        &self,
        stream_id: &str,
        event_type: &str,
        payload: Payload,
    ) -> Result<Uuid, StoreError> {
        let event = self
            .publish_event(NewEvent::new(stream_id, event_type, payload))
            .await?;
        Ok(event.event_id)
    }

    /// Publish an event derived from another one by an agent.
    ///
    /// Publishing the same derivation twice returns the first event's id.
    pub async fn publish_derived(
        &self,
        stream_id: &str,
        event_type: &str,
        payload: Payload,
        producer: &str,
        causation_id: Uuid,
    ) -> Result<Uuid, StoreError> {
        let new_event = NewEvent::derived(stream_id, event_type, payload, producer, causation_id);
        let event = self.publish_event(new_event).await?;
        Ok(event.event_id)
    }

    /// Append a prepared event, retrying transient failures.
    ///
    /// Returns the stored event (with its assigned version). Once the retry
    /// policy is exhausted the error is reported as `Unavailable`.
    #[instrument(skip(self, event), fields(stream_id = %event.stream_id, event_type = %event.event_type, event_id = %event.event_id))]
    pub async fn publish_event(&self, event: NewEvent) -> Result<Event, StoreError> {
        event.validate()?;

        let mut attempt = 1;
        loop {
            match self.store.append(event.clone()).await {
                Ok(stored) => {
                    debug!(version = stored.version, attempt, "Event published");
                    return Ok(stored);
                }
                Err(err) if err.is_transient() && self.retry.has_attempts_remaining(attempt) => {
                    attempt += 1;
                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!(error = %err, attempt, delay_ms = delay.as_millis() as u64, "Publish failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(err) if err.is_transient() => {
                    warn!(error = %err, attempt, "Publish failed, retries exhausted");
                    return Err(match err {
                        StoreError::Unavailable(_) => err,
                        other => StoreError::unavailable(other.to_string()),
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl std::fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPublisher")
            .field("store", &self.store.backend_name())
            .field("retry", &self.retry)
            .finish()
    }
}
