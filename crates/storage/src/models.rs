// Database rows (internal, converted to phoenix_core::Event)

use chrono::{DateTime, Utc};
use phoenix_core::{Event, Payload, StoreError};
use sqlx::FromRow;
use uuid::Uuid;

/// Row of the `phoenix_events` table
#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub event_id: Uuid,
    pub stream_id: String,
    pub version: i64,
    pub event_type: String,
    pub payload: sqlx::types::JsonValue,
    pub producer: Option<String>,
    pub causation_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let payload: Payload = serde_json::from_value(row.payload)?;
        Ok(Event {
            event_id: row.event_id,
            stream_id: row.stream_id,
            timestamp: row.occurred_at,
            event_type: row.event_type,
            payload,
            version: row.version,
            producer: row.producer,
            causation_id: row.causation_id,
        })
    }
}
