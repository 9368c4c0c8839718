//! Collaborators that feed the timeline: batch loaders and semantic search.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use trackline_schema::{Event, EventId};

pub mod file;
pub mod geojson;
pub mod http;
pub mod keyword;
pub mod timecode;

pub use file::FileBatchLoader;
pub use geojson::{decode_feature_collection, DecodedBatch, FeatureCollection};
pub use http::{HttpBatchLoader, HttpSearchProvider};
pub use keyword::{IndexingLoader, KeywordSearchProvider};

/// Status filter value that keeps every observation.
pub const ALL_STATUSES: &str = "all";

#[async_trait]
pub trait BatchLoader: Send + Sync {
    /// Events of one batch, in whatever order the source returns them.
    async fn load(&self, batch_id: &str, status_filter: &str) -> Result<Vec<Event>>;
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Ids of the events in `batch_id` that match `query`.
    async fn search(&self, batch_id: &str, query: &str) -> Result<HashSet<EventId>>;
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_status_filter() -> String {
    ALL_STATUSES.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_status_filter")]
    pub status_filter: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            status_filter: default_status_filter(),
        }
    }
}

/// Case-insensitive substring match on the label; [`ALL_STATUSES`] matches everything.
pub fn label_matches(label: &str, filter: &str) -> bool {
    let filter = filter.trim();
    if filter.is_empty() || filter.eq_ignore_ascii_case(ALL_STATUSES) {
        return true;
    }
    label.to_lowercase().contains(&filter.to_lowercase())
}
