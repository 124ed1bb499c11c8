// Data Flywheel agent
//
// Consumes interaction events, maintains the pattern table and periodically
// publishes a FlywheelSummary event. Batch-oriented: summaries are checked in
// on_batch_complete, never per event.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use phoenix_core::events::FLYWHEEL_SUMMARY;
use phoenix_core::{Event, EventHandler, EventPublisher, HandlerError, Payload};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::features::FeatureExtractor;
use crate::pattern::{quality_signal, Pattern, PatternTable};

/// Stream that receives FlywheelSummary events
pub const SUMMARY_STREAM: &str = "flywheel";

#[derive(Debug, thiserror::Error)]
pub enum FlywheelError {
    #[error("invalid feature rule: {0}")]
    Rule(#[from] regex::Error),
}

/// Flywheel configuration
#[derive(Debug, Clone)]
pub struct FlywheelConfig {
    /// Agent name used in logs and as event producer
    pub name: String,
    /// Applied interactions between two summaries
    pub summary_interval: u64,
    /// Patterns listed in a summary
    pub top_patterns: usize,
}

impl Default for FlywheelConfig {
    fn default() -> Self {
        Self {
            name: "flywheel".to_string(),
            summary_interval: 50,
            top_patterns: 5,
        }
    }
}

/// Snapshot of what the flywheel has learned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct FlywheelSummary {
    pub total_interactions: u64,
    pub distinct_patterns: usize,
    pub top_patterns: Vec<Pattern>,
    pub summaries_published: u64,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct FlywheelState {
    table: PatternTable,
    since_last_summary: u64,
    summaries_published: u64,
}

/// Consumer agent learning interaction patterns
pub struct FlywheelAgent {
    config: FlywheelConfig,
    extractor: FeatureExtractor,
    state: RwLock<FlywheelState>,
    publisher: Option<EventPublisher>,
}

impl FlywheelAgent {
    pub fn new(config: FlywheelConfig) -> Result<Self, FlywheelError> {
        Ok(Self {
            config,
            extractor: FeatureExtractor::new()?,
            state: RwLock::new(FlywheelState::default()),
            publisher: None,
        })
    }

    /// Publish summaries through this publisher
    pub fn with_publisher(mut self, publisher: EventPublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn config(&self) -> &FlywheelConfig {
        &self.config
    }

    /// Current summary of the pattern table
    pub fn summary(&self) -> FlywheelSummary {
        let state = self.state.read();
        FlywheelSummary {
            total_interactions: state.table.total_interactions(),
            distinct_patterns: state.table.distinct_patterns(),
            top_patterns: state.table.top(self.config.top_patterns),
            summaries_published: state.summaries_published,
            generated_at: Utc::now(),
        }
    }

    /// Look up a pattern by key
    pub fn pattern(&self, key: &str) -> Option<Pattern> {
        self.state.read().table.get(key).cloned()
    }

    fn summary_payload(&self, summary: &FlywheelSummary) -> Result<Payload, HandlerError> {
        match serde_json::to_value(summary) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(_) => Err(HandlerError::upstream("summary did not serialize to an object")),
            Err(e) => Err(HandlerError::upstream(e.to_string())),
        }
    }
}

#[async_trait]
impl EventHandler for FlywheelAgent {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn subscribes_to(&self, event: &Event) -> bool {
        event.is_interaction() && !event.is_produced_by(&self.config.name)
    }

    async fn handle(&self, event: &Event) -> Result<(), HandlerError> {
        let features = self.extractor.extract(&event.payload)?;
        let quality = quality_signal(&event.payload);

        let mut state = self.state.write();
        if state
            .table
            .record(event.event_id, features, quality, event.timestamp)
        {
            state.since_last_summary += 1;
            debug!(stream_id = %event.stream_id, version = event.version, quality, "Interaction recorded");
        }
        Ok(())
    }

    async fn on_batch_complete(&self) -> Result<(), HandlerError> {
        let due = self.state.read().since_last_summary >= self.config.summary_interval.max(1);
        if !due {
            return Ok(());
        }
        let Some(publisher) = &self.publisher else {
            return Ok(());
        };

        let summary = self.summary();
        let payload = self.summary_payload(&summary)?;

        match publisher
            .publish_event(
                phoenix_core::NewEvent::new(SUMMARY_STREAM, FLYWHEEL_SUMMARY, payload)
                    .with_producer(&self.config.name),
            )
            .await
        {
            Ok(event) => {
                let mut state = self.state.write();
                state.since_last_summary = 0;
                state.summaries_published += 1;
                info!(
                    version = event.version,
                    total_interactions = summary.total_interactions,
                    distinct_patterns = summary.distinct_patterns,
                    "Flywheel summary published"
                );
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "Failed to publish flywheel summary");
                Err(err.into())
            }
        }
    }
}
