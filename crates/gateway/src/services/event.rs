// Event service
//
// Entry point for event ingestion and polling from the HTTP API. Publishing
// goes through the EventPublisher so HTTP clients get the same id assignment
// and retry behavior as in-process producers.

use std::sync::Arc;

use phoenix_core::{Event, EventPublisher, EventStore, NewEvent, Payload, StoreError};

pub struct EventService {
    publisher: EventPublisher,
}

impl EventService {
    pub fn new(publisher: EventPublisher) -> Self {
        Self { publisher }
    }

    pub fn store(&self) -> &Arc<dyn EventStore> {
        self.publisher.store()
    }

    /// Publish an event and return it with its assigned version
    pub async fn publish(
        &self,
        stream_id: &str,
        event_type: &str,
        payload: Payload,
    ) -> Result<Event, StoreError> {
        self.publisher
            .publish_event(NewEvent::new(stream_id, event_type, payload))
            .await
    }

    /// Events with version > `since_version`, at most `limit`, optionally
    /// restricted to one event type.
    ///
    /// With a type filter, pages are read until `limit` matches are found
    /// or the stream is exhausted.
    pub async fn list(
        &self,
        stream_id: &str,
        since_version: i64,
        limit: usize,
        event_type: Option<&str>,
    ) -> Result<Vec<Event>, StoreError> {
        let store = self.store();
        let Some(event_type) = event_type else {
            return store.read_stream(stream_id, since_version, limit).await;
        };

        let mut events = Vec::new();
        let mut cursor = since_version;
        while events.len() < limit {
            let page = store.read_stream(stream_id, cursor, limit).await?;
            let Some(last) = page.last() else {
                break;
            };
            cursor = last.version;
            let exhausted = page.len() < limit;

            events.extend(page.into_iter().filter(|e| e.event_type == event_type));
            if exhausted {
                break;
            }
        }
        events.truncate(limit);
        Ok(events)
    }

    pub async fn streams(&self) -> Result<Vec<String>, StoreError> {
        self.store().list_streams().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phoenix_core::{payload, InMemoryEventStore};
    use serde_json::json;

    fn service() -> EventService {
        EventService::new(EventPublisher::new(Arc::new(InMemoryEventStore::new())))
    }

    #[tokio::test]
    async fn test_publish_assigns_versions() {
        let service = service();
        let first = service
            .publish("user-42", "LetterGenerated", payload(json!({"tone": "formal"})))
            .await
            .unwrap();
        let second = service
            .publish("user-42", "LetterGenerated", payload(json!({"tone": "creative"})))
            .await
            .unwrap();

        assert_eq!(first.version, 1);
        assert_eq!(second.version, 2);

        let events = service.list("user-42", 0, 10, None).await.unwrap();
        let tones: Vec<_> = events.iter().map(|e| e.payload["tone"].clone()).collect();
        assert_eq!(tones, vec![json!("formal"), json!("creative")]);
    }

    #[tokio::test]
    async fn test_list_filters_across_pages() {
        let service = service();
        for i in 0..7 {
            let event_type = if i % 3 == 0 { "CvGenerated" } else { "LetterGenerated" };
            service
                .publish("user-1", event_type, payload(json!({"i": i})))
                .await
                .unwrap();
        }

        // versions 1, 4, 7 are CvGenerated
        let events = service.list("user-1", 0, 2, Some("CvGenerated")).await.unwrap();
        let versions: Vec<i64> = events.iter().map(|e| e.version).collect();
        assert_eq!(versions, vec![1, 4]);

        let events = service.list("user-1", 4, 10, Some("CvGenerated")).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].version, 7);
    }

    #[tokio::test]
    async fn test_streams() {
        let service = service();
        service.publish("a", "UserProfileCreated", Payload::new()).await.unwrap();
        service.publish("b", "UserProfileCreated", Payload::new()).await.unwrap();

        let mut streams = service.streams().await.unwrap();
        streams.sort();
        assert_eq!(streams, vec!["a", "b"]);
    }
}
