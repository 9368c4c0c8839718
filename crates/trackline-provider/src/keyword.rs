use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;
use trackline_schema::{Event, EventId};

use crate::{BatchLoader, SearchProvider};

/// Offline search: every whitespace token of the query must appear in the
/// event's label, description or severity. Case-insensitive.
#[derive(Default)]
pub struct KeywordSearchProvider {
    batches: RwLock<HashMap<String, Vec<(EventId, String)>>>,
}

impl KeywordSearchProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the index for `batch_id`.
    pub async fn index(&self, batch_id: &str, events: &[Event]) {
        let entries = events
            .iter()
            .map(|event| {
                let text = format!(
                    "{} {} {}",
                    event.label,
                    event.description,
                    event.severity().as_str()
                )
                .to_lowercase();
                (event.id().clone(), text)
            })
            .collect();
        self.batches
            .write()
            .await
            .insert(batch_id.to_string(), entries);
    }
}

#[async_trait]
impl SearchProvider for KeywordSearchProvider {
    async fn search(&self, batch_id: &str, query: &str) -> Result<HashSet<EventId>> {
        let batches = self.batches.read().await;
        let entries = batches
            .get(batch_id)
            .ok_or_else(|| anyhow!("batch {batch_id} has not been indexed"))?;

        let tokens: Vec<String> = query
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();
        if tokens.is_empty() {
            return Ok(HashSet::new());
        }

        Ok(entries
            .iter()
            .filter(|(_, text)| tokens.iter().all(|t| text.contains(t.as_str())))
            .map(|(id, _)| id.clone())
            .collect())
    }
}

/// Wraps a loader so every batch it returns is also indexed for keyword search.
pub struct IndexingLoader<L> {
    inner: L,
    index: Arc<KeywordSearchProvider>,
}

impl<L: BatchLoader> IndexingLoader<L> {
    pub fn new(inner: L, index: Arc<KeywordSearchProvider>) -> Self {
        Self { inner, index }
    }
}

#[async_trait]
impl<L: BatchLoader> BatchLoader for IndexingLoader<L> {
    async fn load(&self, batch_id: &str, status_filter: &str) -> Result<Vec<Event>> {
        let events = self.inner.load(batch_id, status_filter).await?;
        self.index.index(batch_id, &events).await;
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackline_schema::{LatLon, Severity, Status};

    fn event(id: &str, label: &str, description: &str, severity: Severity) -> Event {
        Event::new(
            id,
            trackline_schema::Location::Point(LatLon::new(0.0, 0.0)),
            0,
            10,
            severity,
            Status::Unknown,
        )
        .unwrap()
        .with_label(label)
        .with_description(description)
    }

    #[tokio::test]
    async fn all_tokens_must_match() {
        let provider = KeywordSearchProvider::new();
        provider
            .index(
                "b1",
                &[
                    event("1", "Hard brake", "Debris on the road", Severity::High),
                    event("2", "Swerve", "Debris near shoulder", Severity::Low),
                    event("3", "Hard brake", "Pedestrian crossing", Severity::Medium),
                ],
            )
            .await;

        let ids = provider.search("b1", "DEBRIS brake").await.unwrap();
        assert_eq!(ids, HashSet::from([EventId::from("1")]));

        let ids = provider.search("b1", "debris").await.unwrap();
        assert_eq!(ids.len(), 2);

        let ids = provider.search("b1", "medium").await.unwrap();
        assert_eq!(ids, HashSet::from([EventId::from("3")]));
    }

    #[tokio::test]
    async fn unknown_batch_is_an_error() {
        let provider = KeywordSearchProvider::new();
        assert!(provider.search("missing", "x").await.is_err());
    }

    #[tokio::test]
    async fn duplicate_ids_collapse() {
        let provider = KeywordSearchProvider::new();
        let point = event("obs", "Swerve", "", Severity::Low);
        let path = Event::path(
            "obs",
            vec![LatLon::new(0.0, 0.0), LatLon::new(1.0, 1.0)],
            0,
            10,
        )
        .unwrap()
        .with_label("Swerve");
        provider.index("b1", &[point, path]).await;

        let ids = provider.search("b1", "swerve").await.unwrap();
        assert_eq!(ids.len(), 1);
    }

    struct Fixed(Vec<Event>);

    #[async_trait]
    impl BatchLoader for Fixed {
        async fn load(&self, _batch_id: &str, _status_filter: &str) -> Result<Vec<Event>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn indexing_loader_makes_batch_searchable() {
        let index = Arc::new(KeywordSearchProvider::new());
        let loader = IndexingLoader::new(
            Fixed(vec![event("1", "Pothole", "", Severity::Low)]),
            index.clone(),
        );
        assert!(index.search("b9", "pothole").await.is_err());

        loader.load("b9", "all").await.unwrap();
        let ids = index.search("b9", "pothole").await.unwrap();
        assert_eq!(ids, HashSet::from([EventId::from("1")]));
    }
}
