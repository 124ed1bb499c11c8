// Event Protocol
//
// This module defines the canonical event envelope shared by every Phoenix app.
// All events follow a consistent structure: event_id, stream_id, timestamp,
// event_type, payload, version. The event store is the source of truth;
// consumers rebuild their derived state by replaying streams.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Event payload: a JSON object (string keys, arbitrary JSON values)
pub type Payload = serde_json::Map<String, serde_json::Value>;

// ============================================================================
// Event Type Constants
// ============================================================================

// Application events
pub const USER_PROFILE_CREATED: &str = "UserProfileCreated";
pub const CV_GENERATED: &str = "CvGenerated";
pub const LETTER_GENERATED: &str = "LetterGenerated";

// Interaction events: the router records InteractionRecorded, apps publish ContentGenerated
pub const INTERACTION_RECORDED: &str = "InteractionRecorded";
pub const CONTENT_GENERATED: &str = "ContentGenerated";

// Derived events (re-published by consumer agents)
pub const THREAT_DETECTED: &str = "ThreatDetected";
pub const FLYWHEEL_SUMMARY: &str = "FlywheelSummary";

/// Event types that describe a user interaction with generated content
pub const INTERACTION_EVENT_TYPES: &[&str] = &[
    INTERACTION_RECORDED,
    CONTENT_GENERATED,
    LETTER_GENERATED,
    CV_GENERATED,
];

// ============================================================================
// Event Envelope
// ============================================================================

/// Stored event.
///
/// - `event_id`: unique UUID v7, assigned by the publisher
/// - `stream_id`: aggregate key (e.g. a user id)
/// - `version`: position within the stream, starting at 1, no gaps
/// - `producer`/`causation_id`: set only on events derived by an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Event {
    /// Unique event identifier
    pub event_id: Uuid,

    /// Stream (aggregate) this event belongs to
    pub stream_id: String,

    /// When the event was published
    pub timestamp: DateTime<Utc>,

    /// Event type tag (e.g. "LetterGenerated")
    pub event_type: String,

    /// Event payload
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub payload: Payload,

    /// Version within the stream
    pub version: i64,

    /// Agent instance that derived this event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,

    /// Event that caused this one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub causation_id: Option<Uuid>,
}

impl Event {
    /// Check if this event was derived by the given producer
    pub fn is_produced_by(&self, producer: &str) -> bool {
        self.producer.as_deref() == Some(producer)
    }

    /// Check if this is an interaction event
    pub fn is_interaction(&self) -> bool {
        INTERACTION_EVENT_TYPES.contains(&self.event_type.as_str())
    }

    /// Get a string field from the payload
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(|v| v.as_str())
    }
}

// ============================================================================
// New (unversioned) events
// ============================================================================

/// An event that has not been appended yet.
///
/// The publisher assigns `event_id` and `timestamp`; the store assigns `version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub event_id: Uuid,
    pub stream_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub payload: Payload,
    pub producer: Option<String>,
    pub causation_id: Option<Uuid>,
}

impl NewEvent {
    /// Create a new event with a fresh id and the current time
    pub fn new(stream_id: impl Into<String>, event_type: impl Into<String>, payload: Payload) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            stream_id: stream_id.into(),
            timestamp: Utc::now(),
            event_type: event_type.into(),
            payload,
            producer: None,
            causation_id: None,
        }
    }

    /// Set the producing agent
    pub fn with_producer(mut self, producer: impl Into<String>) -> Self {
        self.producer = Some(producer.into());
        self
    }

    /// Set the causing event
    pub fn with_causation(mut self, causation_id: Uuid) -> Self {
        self.causation_id = Some(causation_id);
        self
    }

    /// Create an event an agent derives from `causation_id`.
    ///
    /// The id is a UUID v5 of the cause, the producer and the event type, so
    /// replaying the cause after a restart appends nothing new.
    pub fn derived(
        stream_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: Payload,
        producer: impl Into<String>,
        causation_id: Uuid,
    ) -> Self {
        let event_type = event_type.into();
        let producer = producer.into();
        let name = format!("{producer}/{event_type}");
        Self {
            event_id: Uuid::new_v5(&causation_id, name.as_bytes()),
            ..Self::new(stream_id, event_type, payload)
        }
        .with_producer(producer)
        .with_causation(causation_id)
    }

    /// Reject events the store must never see
    pub fn validate(&self) -> std::result::Result<(), crate::error::StoreError> {
        if self.stream_id.trim().is_empty() {
            return Err(crate::error::StoreError::invalid("stream_id must not be empty"));
        }
        if self.event_type.trim().is_empty() {
            return Err(crate::error::StoreError::invalid("event_type must not be empty"));
        }
        Ok(())
    }

    /// Convert to a stored Event at the given version
    pub fn into_event(self, version: i64) -> Event {
        Event {
            event_id: self.event_id,
            stream_id: self.stream_id,
            timestamp: self.timestamp,
            event_type: self.event_type,
            payload: self.payload,
            version,
            producer: self.producer,
            causation_id: self.causation_id,
        }
    }
}

/// Build a payload from a `serde_json::json!` object literal.
///
/// Non-object values yield an empty payload.
pub fn payload(value: serde_json::Value) -> Payload {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Payload::new(),
    }
}

// ============================================================================
// Tests
// ============================================================================
