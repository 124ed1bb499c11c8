// Event Consumer
//
// Pulls events from the store, deduplicates by per-stream checkpoint and
// hands them to an EventHandler that owns the derived state.
//
// Handler outcomes:
// - Applied / Ignored: checkpoint advances
// - Skipped (malformed payload): logged, checkpoint advances
// - Upstream failure: batch for that stream stops, checkpoint stays, retried next round

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{HandlerError, StoreError};
use crate::events::Event;
use crate::store::{EventStore, DEFAULT_PAGE_SIZE};

// ============================================================================
// EventHandler
// ============================================================================

/// Derived-state builder driven by a consumer
///
/// Handlers keep their state behind interior mutability; `handle` must be
/// idempotent for a given event, the consumer guarantees each version of a
/// stream is offered at most once per checkpoint history.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Whether this handler wants the event
    fn subscribes_to(&self, event: &Event) -> bool;

    /// Apply one event to the derived state
    async fn handle(&self, event: &Event) -> Result<(), HandlerError>;

    /// Called after a consumer round that applied at least one event
    async fn on_batch_complete(&self) -> Result<(), HandlerError> {
        Ok(())
    }
}

// ============================================================================
// Filters, checkpoints, stats
// ============================================================================

/// Selects one stream and optionally restricts event types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFilter {
    pub stream_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_types: Option<Vec<String>>,
}

impl StreamFilter {
    pub fn stream(stream_id: impl Into<String>) -> Self {
        Self {
            stream_id: stream_id.into(),
            event_types: None,
        }
    }

    pub fn with_event_types<I, S>(mut self, event_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.event_types = Some(event_types.into_iter().map(Into::into).collect());
        self
    }

    pub fn matches(&self, event: &Event) -> bool {
        event.stream_id == self.stream_id
            && self
                .event_types
                .as_ref()
                .map_or(true, |types| types.iter().any(|t| *t == event.event_type))
    }
}

/// Highest applied version per stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checkpoints(BTreeMap<String, i64>);

impl Checkpoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checkpoint of a stream (0 when nothing was applied yet)
    pub fn get(&self, stream_id: &str) -> i64 {
        self.0.get(stream_id).copied().unwrap_or(0)
    }

    /// Move a stream checkpoint forward; never moves it back
    pub fn advance(&mut self, stream_id: &str, version: i64) {
        let current = self.0.entry(stream_id.to_string()).or_insert(0);
        if version > *current {
            *current = version;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &i64)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, i64)> for Checkpoints {
    fn from_iter<T: IntoIterator<Item = (String, i64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Result of offering one event to the handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    Applied,
    /// Handler is not subscribed to this event
    Ignored,
    /// Version at or below the checkpoint
    AlreadyApplied,
    /// Malformed payload
    Skipped,
}

/// Counters per outcome
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerStats {
    pub applied: u64,
    pub ignored: u64,
    pub already_applied: u64,
    pub skipped: u64,
    /// Rounds of a stream stopped by an upstream failure
    pub failed: u64,
}

impl ConsumerStats {
    fn record(&mut self, outcome: ApplyOutcome) {
        match outcome {
            ApplyOutcome::Applied => self.applied += 1,
            ApplyOutcome::Ignored => self.ignored += 1,
            ApplyOutcome::AlreadyApplied => self.already_applied += 1,
            ApplyOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Consumer errors
#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Handler(#[from] HandlerError),
}

// ============================================================================
// Configuration
// ============================================================================

/// Paging and polling configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerConfig {
    /// Events per store read
    pub batch_size: usize,
    /// Poll interval while events keep arriving
    pub min_interval: Duration,
    /// Poll interval ceiling when idle
    pub max_interval: Duration,
    pub backoff_multiplier: f64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_PAGE_SIZE,
            min_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(5),
            backoff_multiplier: 1.5,
        }
    }
}

impl ConsumerConfig {
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }
}

// ============================================================================
// EventConsumer
// ============================================================================

/// Consumer that feeds one handler from the store
pub struct EventConsumer<H: EventHandler + ?Sized> {
    store: Arc<dyn EventStore>,
    handler: Arc<H>,
    config: ConsumerConfig,
    checkpoints: Checkpoints,
    stats: ConsumerStats,
}

impl<H: EventHandler + ?Sized> EventConsumer<H> {
    pub fn new(store: Arc<dyn EventStore>, handler: Arc<H>) -> Self {
        Self {
            store,
            handler,
            config: ConsumerConfig::default(),
            checkpoints: Checkpoints::new(),
            stats: ConsumerStats::default(),
        }
    }

    pub fn with_config(mut self, config: ConsumerConfig) -> Self {
        self.config = config;
        self
    }

    /// Resume from previously exported checkpoints
    pub fn with_checkpoints(mut self, checkpoints: Checkpoints) -> Self {
        self.checkpoints = checkpoints;
        self
    }

    pub fn checkpoints(&self) -> &Checkpoints {
        &self.checkpoints
    }

    pub fn stats(&self) -> &ConsumerStats {
        &self.stats
    }

    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    /// Lazily page through a stream from `since_version` (exclusive).
    ///
    /// The stream ends at the head observed by its last page; call again with
    /// the last seen version to continue. A store error is yielded once and
    /// ends the stream.
    pub fn poll(
        &self,
        filter: StreamFilter,
        since_version: i64,
    ) -> BoxStream<'static, Result<Event, StoreError>> {
        poll_store(self.store.clone(), filter, since_version, self.config.batch_size)
    }

    /// Offer one event to the handler, honoring the checkpoint
    pub async fn apply(&mut self, event: &Event) -> Result<ApplyOutcome, HandlerError> {
        if event.version <= self.checkpoints.get(&event.stream_id) {
            trace!(stream_id = %event.stream_id, version = event.version, "Already applied");
            self.stats.record(ApplyOutcome::AlreadyApplied);
            return Ok(ApplyOutcome::AlreadyApplied);
        }

        let outcome = if !self.handler.subscribes_to(event) {
            ApplyOutcome::Ignored
        } else {
            match self.handler.handle(event).await {
                Ok(()) => ApplyOutcome::Applied,
                Err(HandlerError::Malformed(reason)) => {
                    warn!(
                        consumer = self.handler.name(),
                        stream_id = %event.stream_id,
                        version = event.version,
                        event_type = %event.event_type,
                        reason = %reason,
                        "Skipping malformed event"
                    );
                    ApplyOutcome::Skipped
                }
                Err(err) => return Err(err),
            }
        };

        self.checkpoints.advance(&event.stream_id, event.version);
        self.stats.record(outcome);
        Ok(outcome)
    }

    /// Apply every new event of one stream. Returns the number of events
    /// that moved the checkpoint.
    #[instrument(skip(self), fields(consumer = self.handler.name()))]
    pub async fn catch_up(&mut self, stream_id: &str) -> Result<usize, ConsumerError> {
        let since = self.checkpoints.get(stream_id);
        let mut events = self.poll(StreamFilter::stream(stream_id), since);
        let mut processed = 0;

        while let Some(event) = events.next().await {
            let event = event?;
            match self.apply(&event).await {
                Ok(ApplyOutcome::AlreadyApplied) => {}
                Ok(_) => processed += 1,
                Err(err) => {
                    self.stats.failed += 1;
                    warn!(version = event.version, error = %err, "Handler failed, stream will be retried");
                    return Err(err.into());
                }
            }
        }

        if processed > 0 {
            debug!(processed, checkpoint = self.checkpoints.get(stream_id), "Caught up");
        }
        Ok(processed)
    }

    /// One round over every stream the store knows about.
    ///
    /// A failing stream is logged and left for the next round; the other
    /// streams still progress.
    pub async fn run_once(&mut self) -> Result<usize, ConsumerError> {
        let streams = self.store.list_streams().await?;
        let mut processed = 0;

        for stream_id in streams {
            let before = self.checkpoints.get(&stream_id);
            match self.catch_up(&stream_id).await {
                Ok(n) => processed += n,
                Err(ConsumerError::Store(err)) => return Err(err.into()),
                // Versions are gapless, so the checkpoint delta counts the
                // events handled before the failure
                Err(ConsumerError::Handler(_)) => {
                    processed += (self.checkpoints.get(&stream_id) - before).max(0) as usize;
                }
            }
        }

        if processed > 0 {
            self.handler.on_batch_complete().await?;
        }
        Ok(processed)
    }

    /// Poll until `shutdown` flips to true.
    ///
    /// The interval resets to `min_interval` when a round processed events and
    /// grows by `backoff_multiplier` up to `max_interval` while idle or failing.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> ConsumerStats {
        let name = self.handler.name().to_string();
        let mut interval = self.config.min_interval;
        info!(consumer = %name, "Consumer started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.run_once().await {
                Ok(processed) if processed > 0 => interval = self.config.min_interval,
                Ok(_) => interval = self.next_interval(interval),
                Err(err) => {
                    warn!(consumer = %name, error = %err, "Consumer round failed");
                    interval = self.next_interval(interval);
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(consumer = %name, applied = self.stats.applied, "Consumer stopped");
        self.stats.clone()
    }

    fn next_interval(&self, current: Duration) -> Duration {
        let next = Duration::from_secs_f64(current.as_secs_f64() * self.config.backoff_multiplier);
        next.min(self.config.max_interval)
    }
}

fn poll_store(
    store: Arc<dyn EventStore>,
    filter: StreamFilter,
    since_version: i64,
    batch_size: usize,
) -> BoxStream<'static, Result<Event, StoreError>> {
    let stream_id = filter.stream_id.clone();

    let pages = stream::unfold(Some(since_version), move |cursor| {
        let store = store.clone();
        let stream_id = stream_id.clone();
        async move {
            let cursor = cursor?;
            match store.read_stream(&stream_id, cursor, batch_size).await {
                Ok(page) if page.is_empty() => None,
                Ok(page) => {
                    let next = if page.len() < batch_size {
                        None
                    } else {
                        page.last().map(|event| event.version)
                    };
                    Some((Ok(page), next))
                }
                Err(err) => Some((Err(err), None)),
            }
        }
    });

    pages
        .flat_map(|page| {
            let items: Vec<Result<Event, StoreError>> = match page {
                Ok(events) => events.into_iter().map(Ok).collect(),
                Err(err) => vec![Err(err)],
            };
            stream::iter(items)
        })
        .try_filter(move |event| future::ready(filter.matches(event)))
        .boxed()
}
