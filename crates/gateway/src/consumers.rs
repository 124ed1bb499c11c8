// Background consumer agents
//
// Each agent runs in its own task with its own EventConsumer (and so its own
// checkpoints). All tasks stop when the shutdown channel flips to true.

use std::sync::Arc;

use phoenix_core::{ConsumerConfig, ConsumerStats, EventConsumer, EventHandler, EventStore};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::GatewayConfig;
use crate::state::AppState;

/// A running consumer task
pub struct ConsumerTask {
    pub name: String,
    pub handle: JoinHandle<ConsumerStats>,
}

pub fn consumer_config(config: &GatewayConfig) -> ConsumerConfig {
    ConsumerConfig::default()
        .with_batch_size(config.consumer_batch_size)
        .with_min_interval(config.consumer_poll_interval)
}

fn spawn_consumer<H: EventHandler>(
    store: Arc<dyn EventStore>,
    handler: Arc<H>,
    config: ConsumerConfig,
    shutdown: watch::Receiver<bool>,
) -> ConsumerTask {
    let name = handler.name().to_string();
    let mut consumer = EventConsumer::new(store, handler).with_config(config);
    let handle = tokio::spawn(async move { consumer.run(shutdown).await });
    ConsumerTask { name, handle }
}

/// Spawn the flywheel and guardian consumers
pub fn spawn_consumers(
    state: &AppState,
    config: &GatewayConfig,
    shutdown: watch::Receiver<bool>,
) -> Vec<ConsumerTask> {
    let consumer_config = consumer_config(config);
    vec![
        spawn_consumer(
            state.store().clone(),
            state.flywheel.clone(),
            consumer_config.clone(),
            shutdown.clone(),
        ),
        spawn_consumer(
            state.store().clone(),
            state.guardian.clone(),
            consumer_config,
            shutdown,
        ),
    ]
}

/// Wait for consumer tasks and log their final stats
pub async fn join_consumers(tasks: Vec<ConsumerTask>) {
    for task in tasks {
        match task.handle.await {
            Ok(stats) => tracing::info!(
                consumer = %task.name,
                applied = stats.applied,
                skipped = stats.skipped,
                failed = stats.failed,
                "Consumer finished"
            ),
            Err(e) => tracing::error!(consumer = %task.name, error = %e, "Consumer task panicked"),
        }
    }
}
