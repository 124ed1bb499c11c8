//! Guardian agent driven by an EventConsumer: ThreatDetected events are
//! re-published to the source stream and never re-consumed.

use std::sync::Arc;

use phoenix_core::events::{INTERACTION_RECORDED, THREAT_DETECTED};
use phoenix_core::{payload, EventConsumer, EventPublisher, InMemoryEventStore, ThreatLevel};
use phoenix_guardian::{GuardianAgent, GuardianConfig};
use serde_json::json;

fn setup() -> (Arc<InMemoryEventStore>, EventPublisher, Arc<GuardianAgent>) {
    let store = Arc::new(InMemoryEventStore::new());
    let publisher = EventPublisher::new(store.clone());
    let agent = GuardianAgent::new(GuardianConfig::default())
        .unwrap()
        .with_publisher(publisher.clone());
    (store, publisher, Arc::new(agent))
}

#[tokio::test]
async fn test_threat_republished_once() {
    let (store, publisher, agent) = setup();
    let source = publisher
        .publish(
            "user-42",
            INTERACTION_RECORDED,
            payload(json!({"request": "x' OR 1=1 --", "response": "no"})),
        )
        .await
        .unwrap();

    let mut consumer = EventConsumer::new(store.clone(), agent.clone());
    consumer.run_once().await.unwrap();

    let events = store.events("user-42");
    assert_eq!(events.len(), 2);
    let derived = &events[1];
    assert_eq!(derived.event_type, THREAT_DETECTED);
    assert_eq!(derived.version, 2);
    assert_eq!(derived.causation_id, Some(source));
    assert!(derived.is_produced_by("guardian"));
    assert_eq!(derived.payload["threat_level"], "critical");
    // Matched text is never copied into the derived event
    assert!(!serde_json::to_string(&derived.payload).unwrap().contains("1=1"));

    // Second and third rounds see the derived event but do not react to it
    consumer.run_once().await.unwrap();
    consumer.run_once().await.unwrap();
    assert_eq!(store.events("user-42").len(), 2);
    assert_eq!(consumer.checkpoints().get("user-42"), 2);

    let threats = agent.threats(10);
    assert_eq!(threats.len(), 1);
    assert_eq!(threats[0].threat_level, ThreatLevel::Critical);
    assert_eq!(threats[0].published_event_id, Some(derived.event_id));
}

#[tokio::test]
async fn test_publish_failure_retried_next_round() {
    let store = Arc::new(InMemoryEventStore::new());
    let publisher =
        EventPublisher::new(store.clone()).with_retry_policy(phoenix_core::RetryPolicy::no_retry());
    let agent = Arc::new(
        GuardianAgent::new(GuardianConfig::default())
            .unwrap()
            .with_publisher(publisher.clone()),
    );
    publisher
        .publish(
            "user-1",
            INTERACTION_RECORDED,
            payload(json!({"request": "<script>steal()</script>"})),
        )
        .await
        .unwrap();
    let source = store.events("user-1").remove(0);

    let mut consumer = EventConsumer::new(store.clone(), agent.clone());

    // The ThreatDetected append fails: checkpoint stays, nothing audited
    store.fail_next(1);
    assert!(consumer.apply(&source).await.is_err());
    assert_eq!(consumer.checkpoints().get("user-1"), 0);
    assert!(agent.audit_records().is_empty());

    // Next round succeeds
    assert_eq!(consumer.catch_up("user-1").await.unwrap(), 1);
    let events = store.events("user-1");
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].event_type, THREAT_DETECTED);
    assert_eq!(agent.threats(10).len(), 1);
}

#[tokio::test]
async fn test_restarted_guardian_does_not_duplicate_threats() {
    let store = Arc::new(InMemoryEventStore::new());
    let publisher = EventPublisher::new(store.clone());
    publisher
        .publish(
            "user-42",
            INTERACTION_RECORDED,
            payload(json!({"request": "x' OR 1=1 --", "response": "no"})),
        )
        .await
        .unwrap();

    // Each pass is a fresh process: new agent, new consumer, no checkpoints
    let mut published = Vec::new();
    for _ in 0..2 {
        let agent = Arc::new(
            GuardianAgent::new(GuardianConfig::default())
                .unwrap()
                .with_publisher(publisher.clone()),
        );
        let mut consumer = EventConsumer::new(store.clone(), agent.clone());
        consumer.run_once().await.unwrap();

        let threats = agent.threats(10);
        assert_eq!(threats.len(), 1);
        published.push(threats[0].published_event_id);
    }

    let derived: Vec<_> = store
        .events("user-42")
        .into_iter()
        .filter(|e| e.event_type == THREAT_DETECTED)
        .collect();
    assert_eq!(derived.len(), 1);
    assert_eq!(published, vec![Some(derived[0].event_id); 2]);
}
