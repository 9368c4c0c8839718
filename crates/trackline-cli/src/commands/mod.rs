use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use trackline_provider::{
    timecode::format_epoch_ms, BatchLoader, FileBatchLoader, HttpBatchLoader, HttpSearchProvider,
    IndexingLoader, KeywordSearchProvider, ProviderConfig, SearchProvider,
};
use trackline_schema::{Event, LatLon, Region};

pub mod inspect;
pub mod replay;

/// Where a batch comes from and how it is filtered.
#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    #[arg(
        long,
        help = "Backend URL, or a directory of <batch>.geojson files (defaults to provider.base_url)"
    )]
    pub source: Option<String>,

    #[arg(long, help = "Batch ID to load")]
    pub batch: String,

    #[arg(long, help = "Label filter applied on load (default from config)")]
    pub filter: Option<String>,

    #[arg(long, help = "Free-text search query")]
    pub query: Option<String>,

    #[arg(
        long,
        value_name = "LAT,LON,RADIUS_M",
        conflicts_with = "polygon",
        help = "Keep only events inside a circle"
    )]
    pub circle: Option<String>,

    #[arg(
        long,
        value_name = "LAT,LON;LAT,LON;...",
        help = "Keep only events inside a polygon"
    )]
    pub polygon: Option<String>,
}

impl BatchArgs {
    pub fn status_filter(&self, provider: &ProviderConfig) -> String {
        self.filter
            .clone()
            .unwrap_or_else(|| provider.status_filter.clone())
    }

    pub fn region(&self) -> Result<Option<Region>> {
        match (&self.circle, &self.polygon) {
            (Some(circle), _) => parse_circle(circle).map(Some),
            (None, Some(polygon)) => parse_polygon(polygon).map(Some),
            (None, None) => Ok(None),
        }
    }

    pub fn collaborators(
        &self,
        provider: &ProviderConfig,
    ) -> (Arc<dyn BatchLoader>, Arc<dyn SearchProvider>) {
        let source = self
            .source
            .clone()
            .unwrap_or_else(|| provider.base_url.clone());
        if is_url(&source) {
            tracing::info!(source = %source, "using http backend");
            (
                Arc::new(HttpBatchLoader::new(source.clone())),
                Arc::new(HttpSearchProvider::new(source)),
            )
        } else {
            tracing::info!(source = %source, "using batch files with keyword search");
            let index = Arc::new(KeywordSearchProvider::new());
            let loader = IndexingLoader::new(FileBatchLoader::new(PathBuf::from(source)), index.clone());
            (Arc::new(loader), index)
        }
    }
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn parse_number(raw: &str, what: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .with_context(|| format!("invalid {what}: {raw:?}"))
}

fn parse_lat_lon(raw: &str) -> Result<LatLon> {
    let Some((lat, lon)) = raw.split_once(',') else {
        bail!("expected LAT,LON, got {raw:?}");
    };
    Ok(LatLon::new(
        parse_number(lat, "latitude")?,
        parse_number(lon, "longitude")?,
    ))
}

pub fn parse_circle(raw: &str) -> Result<Region> {
    let parts: Vec<&str> = raw.split(',').collect();
    let [lat, lon, radius] = parts.as_slice() else {
        bail!("expected LAT,LON,RADIUS_M, got {raw:?}");
    };
    let center = LatLon::new(
        parse_number(lat, "latitude")?,
        parse_number(lon, "longitude")?,
    );
    Ok(Region::circle(center, parse_number(radius, "radius")?)?)
}

pub fn parse_polygon(raw: &str) -> Result<Region> {
    let vertices = raw
        .split(';')
        .filter(|v| !v.trim().is_empty())
        .map(parse_lat_lon)
        .collect::<Result<Vec<_>>>()?;
    Region::polygon(vertices).map_err(|err| anyhow!("{err} in {raw:?}"))
}

pub fn print_event(event: &Event, selected: bool) {
    let marker = if selected { '*' } else { ' ' };
    println!(
        "{marker} {:<36} {:<5} {} .. {}  {:<6} {}",
        event.id(),
        format!("{:?}", event.kind()).to_lowercase(),
        format_epoch_ms(event.start_ms()),
        format_epoch_ms(event.end_ms()),
        event.severity().as_str(),
        event.label
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_circle() {
        let region = parse_circle("40.7128, -74.0060, 250").unwrap();
        assert_eq!(
            region,
            Region::circle(LatLon::new(40.7128, -74.006), 250.0).unwrap()
        );
    }

    #[test]
    fn rejects_bad_circle() {
        assert!(parse_circle("40.7,-74.0").is_err());
        assert!(parse_circle("40.7,-74.0,-5").is_err());
        assert!(parse_circle("north,-74.0,5").is_err());
    }

    #[test]
    fn parses_polygon_with_trailing_separator() {
        let region = parse_polygon("0,0;0,1;1,1;").unwrap();
        let Region::Polygon { vertices } = region else {
            panic!("expected polygon");
        };
        assert_eq!(vertices.len(), 3);
        assert_eq!(vertices[1], LatLon::new(0.0, 1.0));
    }

    #[test]
    fn rejects_degenerate_polygon() {
        assert!(parse_polygon("0,0;1,1").is_err());
        assert!(parse_polygon("0,0;1").is_err());
    }

    #[test]
    fn url_sources_are_detected() {
        assert!(is_url("http://localhost:8000"));
        assert!(is_url("https://backend.example"));
        assert!(!is_url("./batches"));
    }
}
