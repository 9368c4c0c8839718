use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use trackline_schema::Event;

use crate::geojson::{decode_feature_collection, FeatureCollection};
use crate::{label_matches, BatchLoader};

/// Reads `<dir>/<batch_id>.geojson` from disk. Used for offline replay.
#[derive(Debug, Clone)]
pub struct FileBatchLoader {
    dir: PathBuf,
}

impl FileBatchLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn batch_path(&self, batch_id: &str) -> PathBuf {
        self.dir.join(format!("{batch_id}.geojson"))
    }
}

#[async_trait]
impl BatchLoader for FileBatchLoader {
    async fn load(&self, batch_id: &str, status_filter: &str) -> Result<Vec<Event>> {
        let path = self.batch_path(batch_id);
        let raw = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading batch file {}", path.display()))?;
        let collection: FeatureCollection = serde_json::from_str(&raw)
            .with_context(|| format!("parsing batch file {}", path.display()))?;

        let decoded = decode_feature_collection(collection);
        let total = decoded.events.len();
        let events: Vec<Event> = decoded
            .events
            .into_iter()
            .filter(|event| label_matches(&event.label, status_filter))
            .collect();
        tracing::info!(
            batch_id,
            events = events.len(),
            filtered_out = total - events.len(),
            skipped = decoded.skipped,
            "batch loaded from file"
        );
        Ok(events)
    }
}
