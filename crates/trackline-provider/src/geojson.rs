//! Decoding of the GeoJSON feature collections served by the batch backend.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use trackline_schema::{Event, LatLon, Location, Severity, Status, VideoRef};
use uuid::Uuid;

use crate::timecode::{range_start, timecode_to_epoch_ms, DEFAULT_EVENT_DURATION_SECS};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub geometry: Option<Geometry>,
    /// GeoJSON allows `null` here.
    #[serde(default)]
    pub properties: Option<FeatureProperties>,
}

/// Coordinates are `[lon, lat]`, GeoJSON order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        coordinates: Vec<f64>,
    },
    LineString {
        coordinates: Vec<Vec<f64>>,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureProperties {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub time_str: Option<String>,
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub timestamp_end: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub video_offset: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct DecodedBatch {
    pub events: Vec<Event>,
    /// Features dropped for bad geometry or time range.
    pub skipped: usize,
}

pub fn decode_feature_collection(collection: FeatureCollection) -> DecodedBatch {
    let mut batch = DecodedBatch::default();
    for feature in collection.features {
        match decode_feature(feature) {
            Some(event) => batch.events.push(event),
            None => batch.skipped += 1,
        }
    }
    if batch.skipped > 0 {
        warn!(
            loaded = batch.events.len(),
            skipped = batch.skipped,
            "dropped features with invalid geometry or time range"
        );
    }
    batch
}

fn decode_feature(feature: Feature) -> Option<Event> {
    let props = feature.properties.unwrap_or_default();
    let location = match feature.geometry? {
        Geometry::Point { coordinates } => Location::Point(lon_lat(&coordinates)?),
        Geometry::LineString { coordinates } => Location::Path(
            coordinates
                .iter()
                .map(|pair| lon_lat(pair))
                .collect::<Option<Vec<_>>>()?,
        ),
        Geometry::Unsupported => return None,
    };

    let time_str = props.time_str.as_deref().map(range_start).unwrap_or("0:00");
    let start_ms = props
        .timestamp
        .and_then(finite_ms)
        .unwrap_or_else(|| timecode_to_epoch_ms(time_str, 0));
    let end_ms = props
        .timestamp_end
        .and_then(finite_ms)
        .unwrap_or_else(|| timecode_to_epoch_ms(time_str, DEFAULT_EVENT_DURATION_SECS));

    let label = props.label.unwrap_or_default();
    let severity = match props.severity.as_deref().map(Severity::parse) {
        Some(Some(level)) => level,
        other => {
            if other.is_some() {
                warn!(label = %label, severity = ?props.severity, "unknown severity, using low");
            }
            Severity::Low
        }
    };
    let status = props
        .status
        .as_deref()
        .map(Status::canonicalize)
        .unwrap_or_default();
    let id = props.id.unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut event = match Event::new(id, location, start_ms, end_ms, severity, status) {
        Ok(event) => event,
        Err(err) => {
            debug!(error = %err, "skipping feature");
            return None;
        }
    };
    event = event
        .with_label(label)
        .with_description(props.description.unwrap_or_default());
    if let Some(video_id) = props.video_id {
        event = event.with_video(VideoRef {
            video_id,
            url: props.video_url,
            offset_secs: props.video_offset.unwrap_or_default(),
        });
    }
    Some(event)
}

fn lon_lat(pair: &[f64]) -> Option<LatLon> {
    match pair {
        [lon, lat, ..] if lon.is_finite() && lat.is_finite() => Some(LatLon::new(*lat, *lon)),
        _ => None,
    }
}

fn finite_ms(value: f64) -> Option<i64> {
    value.is_finite().then_some(value as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timecode::REPLAY_BASE_MS;
    use trackline_schema::EventKind;

    fn decode(json: serde_json::Value) -> DecodedBatch {
        decode_feature_collection(serde_json::from_value(json).unwrap())
    }

    #[test]
    fn moving_observation_yields_point_and_path_with_same_id() {
        let batch = decode(serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [-122.4, 37.7]},
                    "properties": {
                        "id": "obs-1", "label": "Hard brake", "severity": "HIGH",
                        "status": "Approved", "timestamp": 1000, "timestamp_end": 16000,
                        "description": "Driving - Hard brake", "video_id": "v1",
                        "video_url": "https://example.test/v1", "video_offset": 12,
                        "type": "point", "is_moving": true
                    }
                },
                {
                    "type": "Feature",
                    "geometry": {"type": "LineString", "coordinates": [[-122.4, 37.7], [-122.5, 37.8]]},
                    "properties": {"id": "obs-1", "label": "Hard brake", "severity": "high",
                                   "timestamp": 1000, "timestamp_end": 16000, "type": "path"}
                }
            ]
        }));

        assert_eq!(batch.skipped, 0);
        assert_eq!(batch.events.len(), 2);
        let point = &batch.events[0];
        assert_eq!(point.kind(), EventKind::Point);
        assert_eq!(point.location().start(), Some(LatLon::new(37.7, -122.4)));
        assert_eq!(point.severity(), Severity::High);
        assert_eq!(point.status(), Status::Approved);
        assert_eq!(point.video.as_ref().unwrap().offset_secs, 12);

        let path = &batch.events[1];
        assert_eq!(path.kind(), EventKind::Path);
        assert_eq!(path.id(), point.id());
        assert_eq!(path.location().end(), Some(LatLon::new(37.8, -122.5)));
    }

    #[test]
    fn missing_timestamps_come_from_time_str() {
        let batch = decode(serde_json::json!({
            "features": [{
                "geometry": {"type": "Point", "coordinates": [0.0, 0.0]},
                "properties": {"id": "a", "time_str": "1:00"}
            }]
        }));
        let event = &batch.events[0];
        assert_eq!(event.start_ms(), REPLAY_BASE_MS + 60_000);
        assert_eq!(event.end_ms(), REPLAY_BASE_MS + 75_000);
    }

    #[test]
    fn time_ranges_use_their_start() {
        let batch = decode(serde_json::json!({
            "features": [{
                "geometry": {"type": "Point", "coordinates": [0.0, 0.0]},
                "properties": {"id": "a", "time_str": "0:12–0:27"}
            }]
        }));
        assert_eq!(batch.events[0].start_ms(), REPLAY_BASE_MS + 12_000);
    }

    #[test]
    fn invalid_features_are_counted_not_fatal() {
        let batch = decode(serde_json::json!({
            "features": [
                {"geometry": null, "properties": {"id": "no-geometry"}},
                {"geometry": {"type": "Point", "coordinates": [1.0]}, "properties": {"id": "short"}},
                {"geometry": {"type": "LineString", "coordinates": [[0.0, 0.0]]}, "properties": {"id": "one-vertex"}},
                {"geometry": {"type": "Polygon", "coordinates": []}, "properties": {"id": "polygon"}},
                {"geometry": {"type": "Point", "coordinates": [0.0, 0.0]},
                 "properties": {"id": "inverted", "timestamp": 10, "timestamp_end": 5}},
                {"geometry": {"type": "Point", "coordinates": [0.0, 0.0]}, "properties": {"id": "ok"}}
            ]
        }));
        assert_eq!(batch.skipped, 5);
        assert_eq!(batch.events.len(), 1);
        assert_eq!(batch.events[0].id().as_str(), "ok");
    }

    #[test]
    fn null_properties_decode_with_defaults() {
        let batch = decode(serde_json::json!({
            "features": [
                {"geometry": {"type": "Point", "coordinates": [0.0, 0.0]}, "properties": null},
                {"geometry": {"type": "Point", "coordinates": [1.0, 1.0]}},
                {"geometry": {"type": "Point", "coordinates": [2.0, 2.0]}, "properties": {"id": "named"}}
            ]
        }));
        assert_eq!(batch.skipped, 0);
        assert_eq!(batch.events.len(), 3);
        assert_eq!(batch.events[0].start_ms(), REPLAY_BASE_MS);
        assert_eq!(batch.events[0].severity(), Severity::Low);
        assert_eq!(batch.events[2].id().as_str(), "named");
    }

    #[test]
    fn huge_time_str_falls_back_to_base_instant() {
        let batch = decode(serde_json::json!({
            "features": [{
                "geometry": {"type": "Point", "coordinates": [0.0, 0.0]},
                "properties": {"id": "a", "time_str": "999999999999999999:00"}
            }]
        }));
        assert_eq!(batch.skipped, 0);
        assert_eq!(batch.events[0].start_ms(), REPLAY_BASE_MS);
        assert_eq!(batch.events[0].end_ms(), REPLAY_BASE_MS + 15_000);
    }

    #[test]
    fn unknown_severity_and_status_fall_back() {
        let batch = decode(serde_json::json!({
            "features": [{
                "geometry": {"type": "Point", "coordinates": [0.0, 0.0]},
                "properties": {"severity": "catastrophic", "status": "escalated"}
            }]
        }));
        let event = &batch.events[0];
        assert_eq!(event.severity(), Severity::Low);
        assert_eq!(event.status(), Status::Unknown);
        assert!(Uuid::parse_str(event.id().as_str()).is_ok());
    }
}
