// In-memory implementations for development and testing
//
// These keep all data in process memory:
// - InMemoryEventStore: event store with atomic per-stream versioning
// - EchoGenerator: content generator that echoes the prompt back

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::events::{Event, NewEvent};
use crate::provider::{ContentGenerator, GenerationRequest, GenerationResponse, TokenUsage};
use crate::store::EventStore;

// ============================================================================
// InMemoryEventStore
// ============================================================================

#[derive(Debug, Default)]
struct StoreState {
    /// Events per stream, index i holds version i + 1
    streams: HashMap<String, Vec<Event>>,
    /// event_id -> (stream_id, index)
    index: HashMap<Uuid, (String, usize)>,
}

/// In-memory event store
///
/// Version assignment and the duplicate-id check happen under one write lock,
/// so concurrent appends to a stream never share a version.
#[derive(Debug, Default, Clone)]
pub struct InMemoryEventStore {
    state: Arc<RwLock<StoreState>>,
    /// Number of upcoming calls that fail with `Unavailable` (test hook)
    failures: Arc<AtomicUsize>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` store calls fail with `StoreError::Unavailable`
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Total number of stored events
    pub fn len(&self) -> usize {
        self.state.read().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All events of a stream, ordered by version
    pub fn events(&self, stream_id: &str) -> Vec<Event> {
        self.state
            .read()
            .streams
            .get(stream_id)
            .cloned()
            .unwrap_or_default()
    }

    fn check_available(&self) -> std::result::Result<(), StoreError> {
        let injected = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match injected {
            Ok(_) => Err(StoreError::unavailable("injected failure")),
            Err(_) => Ok(()),
        }
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, event: NewEvent) -> std::result::Result<Event, StoreError> {
        event.validate()?;
        self.check_available()?;

        let mut state = self.state.write();

        if let Some((stream_id, idx)) = state.index.get(&event.event_id) {
            let existing = state
                .streams
                .get(stream_id)
                .and_then(|events| events.get(*idx))
                .cloned();
            if let Some(existing) = existing {
                return Ok(existing);
            }
        }

        let events = state.streams.entry(event.stream_id.clone()).or_default();
        let idx = events.len();
        let stored = event.into_event(idx as i64 + 1);
        events.push(stored.clone());
        state
            .index
            .insert(stored.event_id, (stored.stream_id.clone(), idx));

        Ok(stored)
    }

    async fn read_stream(
        &self,
        stream_id: &str,
        since_version: i64,
        limit: usize,
    ) -> std::result::Result<Vec<Event>, StoreError> {
        self.check_available()?;

        let state = self.state.read();
        let Some(events) = state.streams.get(stream_id) else {
            return Ok(Vec::new());
        };

        let start = since_version.max(0) as usize;
        Ok(events.iter().skip(start).take(limit).cloned().collect())
    }

    async fn list_streams(&self) -> std::result::Result<Vec<String>, StoreError> {
        self.check_available()?;

        let mut streams: Vec<String> = self.state.read().streams.keys().cloned().collect();
        streams.sort();
        Ok(streams)
    }

    async fn head_version(&self, stream_id: &str) -> std::result::Result<i64, StoreError> {
        self.check_available()?;

        Ok(self
            .state
            .read()
            .streams
            .get(stream_id)
            .map(|events| events.len() as i64)
            .unwrap_or(0))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

// ============================================================================
// EchoGenerator
// ============================================================================

/// Content generator that returns the prompt unchanged.
///
/// Used when no AI provider is configured and in tests.
#[derive(Debug, Clone, Default)]
pub struct EchoGenerator;

impl EchoGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ContentGenerator for EchoGenerator {
    fn provider_name(&self) -> &str {
        "echo"
    }

    async fn generate_content(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        let words = request.prompt.split_whitespace().count() as u32;
        Ok(GenerationResponse {
            text: request.prompt.clone(),
            provider: "echo".to_string(),
            model: request.model.clone().unwrap_or_else(|| "echo".to_string()),
            usage: Some(TokenUsage {
                input_tokens: words,
                output_tokens: words,
            }),
            finish_reason: Some("stop".to_string()),
        })
    }
}
