// Shared application state
// Decision: Components are built once here and injected; no global singletons

use std::sync::Arc;

use anyhow::Context;
use axum::extract::FromRef;
use phoenix_core::{
    Capability, ContentGenerator, EventPublisher, EventStore, GenerationAgent, Orchestrator,
    ValidationAgent,
};
use phoenix_flywheel::{FlywheelAgent, FlywheelConfig};
use phoenix_guardian::{Classifier, GuardianAgent, GuardianConfig, GuardianValidator};

use crate::auth::AuthState;
use crate::config::GatewayConfig;
use crate::services::EventService;

/// App state shared across routes
#[derive(Clone)]
pub struct AppState {
    pub events: Arc<EventService>,
    pub orchestrator: Arc<Orchestrator>,
    pub flywheel: Arc<FlywheelAgent>,
    pub guardian: Arc<GuardianAgent>,
    pub auth: AuthState,
    pub storage_backend: &'static str,
}

impl AppState {
    /// Wire agents, validator and orchestrator around a store and a generator
    pub fn new(
        store: Arc<dyn EventStore>,
        generator: Arc<dyn ContentGenerator>,
        config: &GatewayConfig,
    ) -> anyhow::Result<Self> {
        let publisher = EventPublisher::new(store.clone());
        let classifier = Classifier::new().context("Failed to compile guardian rules")?;

        let flywheel = FlywheelAgent::new(FlywheelConfig {
            summary_interval: config.flywheel_summary_interval,
            ..FlywheelConfig::default()
        })
        .context("Failed to build flywheel agent")?
        .with_publisher(publisher.clone());

        let guardian = GuardianAgent::with_classifier(
            GuardianConfig {
                threat_threshold: config.guardian_publish_level,
                ..GuardianConfig::default()
            },
            classifier.clone(),
        )
        .with_publisher(publisher.clone());

        let validator =
            Arc::new(GuardianValidator::new(classifier).with_block_level(config.guardian_block_level));

        let orchestrator = Orchestrator::new()
            .register(
                Capability::GenerateContent,
                Arc::new(GenerationAgent::new(generator).with_validator(validator.clone())),
            )
            .register(
                Capability::ValidateRequest,
                Arc::new(ValidationAgent::new(validator)),
            )
            .with_publisher(publisher.clone());

        Ok(Self {
            events: Arc::new(EventService::new(publisher)),
            orchestrator: Arc::new(orchestrator),
            flywheel: Arc::new(flywheel),
            guardian: Arc::new(guardian),
            auth: AuthState::new(&config.auth),
            storage_backend: store.backend_name(),
        })
    }

    pub fn store(&self) -> &Arc<dyn EventStore> {
        self.events.store()
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}
