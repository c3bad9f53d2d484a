//! In-memory `EventStore`, used by the integration tests in `tests/` and
//! available as a lightweight store for local development without a
//! Postgres instance. Grounded on the reference's `mockEventStore`
//! pattern (`relay_service_test.go`) generalized into a real (if
//! non-durable) implementation rather than a stub.

use std::collections::HashSet;

use parking_lot::RwLock;

use crate::error::RelayError;
use crate::event::Event;
use crate::subscription::Subscription;

use super::EventStore;

#[derive(Default)]
pub struct MemoryStore {
    events: RwLock<Vec<Event>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl EventStore for MemoryStore {
    async fn save(&self, event: &Event) -> Result<(), RelayError> {
        let mut events = self.events.write();
        if events.iter().any(|e| e.id == event.id) {
            return Ok(());
        }
        events.push(event.clone());
        Ok(())
    }

    async fn query(&self, subscription: &Subscription) -> Result<Vec<Event>, RelayError> {
        let events = self.events.read();
        let mut seen = HashSet::new();
        let mut results: Vec<Event> = Vec::new();

        for filter in &subscription.filters {
            let limit = filter.limit.unwrap_or(u64::MAX) as usize;
            let mut matched = 0usize;
            let mut candidates: Vec<&Event> = events.iter().filter(|e| filter.matches(e)).collect();
            candidates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            for event in candidates {
                if matched >= limit {
                    break;
                }
                if seen.insert(event.id.clone()) {
                    results.push(event.clone());
                    matched += 1;
                }
            }
        }

        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;

    fn event(id: &str, kind: i64, created_at: i64) -> Event {
        Event {
            id: id.to_string(),
            pubkey: "pk".to_string(),
            sig: "sig".to_string(),
            created_at,
            kind,
            tags: vec![],
            content: String::new(),
        }
    }

    #[tokio::test]
    async fn save_is_idempotent_by_id() {
        let store = MemoryStore::new();
        store.save(&event("e1", 1, 1)).await.unwrap();
        store.save(&event("e1", 1, 1)).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn query_dedupes_across_filters_and_respects_limit() {
        let store = MemoryStore::new();
        store.save(&event("e1", 1, 10)).await.unwrap();
        store.save(&event("e2", 1, 20)).await.unwrap();
        store.save(&event("e3", 7, 30)).await.unwrap();

        let sub = Subscription::new(
            "s1".to_string(),
            vec![
                Filter {
                    kinds: Some(vec![1]),
                    ..Default::default()
                },
                Filter {
                    kinds: Some(vec![1, 7]),
                    ..Default::default()
                },
            ],
        );

        let results = store.query(&sub).await.unwrap();
        let ids: HashSet<_> = results.iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(results[0].id, "e3");
    }
}
