// Phoenix event layer
//
// Event-sourced communication between the Phoenix apps and their agents.
//
// Key design decisions:
// - The event store is the single source of truth; agents rebuild derived
//   state by replaying streams (EventStore trait, Postgres or in-memory)
// - Publisher assigns event ids, the store assigns per-stream versions
// - Consumers deduplicate by per-stream checkpoint and are restartable
// - AI providers and validators sit behind explicit traits
//   (ContentGenerator, RequestValidator) routed by a static capability table

pub mod consumer;
pub mod error;
pub mod events;
pub mod memory;
pub mod provider;
pub mod publisher;
pub mod retry;
pub mod router;
pub mod security;
pub mod store;
pub mod telemetry;

pub use consumer::{
    ApplyOutcome, Checkpoints, ConsumerConfig, ConsumerError, ConsumerStats, EventConsumer,
    EventHandler, StreamFilter,
};
pub use error::{HandlerError, Result, ServiceError, StoreError};
pub use events::{payload, Event, NewEvent, Payload};
pub use memory::{EchoGenerator, InMemoryEventStore};
pub use provider::{
    ContentGenerator, GenerationRequest, GenerationResponse, RequestValidator, TokenUsage,
    ValidationOutcome, ValidationRequest,
};
pub use publisher::EventPublisher;
pub use retry::RetryPolicy;
pub use router::{
    Agent, AgentReply, Capability, CapabilityInfo, GenerationAgent, Orchestrator, RoutedRequest,
    RoutedResponse, ValidationAgent,
};
pub use security::{ComplianceStatus, Finding, FindingCategory, ThreatLevel};
pub use store::EventStore;
