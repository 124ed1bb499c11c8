//! EventStore trait definition
//!
//! The store is the single externally-owned source of truth. Implementations
//! must assign versions atomically per stream and treat a repeated `event_id`
//! as an idempotent no-op that returns the already-stored event.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::events::{Event, NewEvent};

/// Default page size for reads
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Append-only store of domain events
///
/// Implementations must be thread-safe and support concurrent access.
#[async_trait]
pub trait EventStore: Send + Sync + 'static {
    /// Append an event, assigning the next version of its stream.
    ///
    /// If an event with the same `event_id` already exists, the stored event
    /// is returned unchanged.
    async fn append(&self, event: NewEvent) -> Result<Event, StoreError>;

    /// Read up to `limit` events of a stream with version > `since_version`,
    /// ordered by version ascending
    async fn read_stream(
        &self,
        stream_id: &str,
        since_version: i64,
        limit: usize,
    ) -> Result<Vec<Event>, StoreError>;

    /// List all known stream ids
    async fn list_streams(&self) -> Result<Vec<String>, StoreError>;

    /// Current head version of a stream (0 for an unknown stream)
    async fn head_version(&self, stream_id: &str) -> Result<i64, StoreError> {
        let mut version = 0;
        loop {
            let page = self
                .read_stream(stream_id, version, DEFAULT_PAGE_SIZE)
                .await?;
            match page.last() {
                Some(last) => version = last.version,
                None => return Ok(version),
            }
            if page.len() < DEFAULT_PAGE_SIZE {
                return Ok(version);
            }
        }
    }

    /// Check that the store is reachable
    async fn health_check(&self) -> Result<(), StoreError> {
        self.list_streams().await.map(|_| ())
    }

    /// Short backend name for diagnostics ("memory", "postgres")
    fn backend_name(&self) -> &'static str;
}
