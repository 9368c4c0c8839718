pub mod region;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use region::{Region, RegionError};

/// Opaque identifier of an event. Unique per kind within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EventId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Point,
    Path,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "coordinates")]
pub enum Location {
    Point(LatLon),
    /// Ordered vertices, at least two.
    Path(Vec<LatLon>),
}

impl Location {
    pub fn kind(&self) -> EventKind {
        match self {
            Location::Point(_) => EventKind::Point,
            Location::Path(_) => EventKind::Path,
        }
    }

    pub fn start(&self) -> Option<LatLon> {
        match self {
            Location::Point(p) => Some(*p),
            Location::Path(vertices) => vertices.first().copied(),
        }
    }

    /// Last vertex of a path; the point itself otherwise.
    pub fn end(&self) -> Option<LatLon> {
        match self {
            Location::Point(p) => Some(*p),
            Location::Path(vertices) => vertices.last().copied(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Case-insensitive parse; `None` for anything outside the three levels.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Approved,
    Rejected,
    Pending,
    Invalid,
    #[default]
    Unknown,
}

impl Status {
    /// Canonicalize review status text. Never fails: unrecognised input is `Unknown`.
    pub fn canonicalize(input: &str) -> Self {
        match input.trim().to_ascii_lowercase().as_str() {
            "approved" => Status::Approved,
            "rejected" => Status::Rejected,
            "pending" => Status::Pending,
            "invalid" => Status::Invalid,
            _ => Status::Unknown,
        }
    }
}

/// Where the footage for an event lives. Opaque to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRef {
    pub video_id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub offset_secs: u32,
}

#[derive(Debug, Error, PartialEq)]
pub enum EventError {
    #[error("event {id}: start {start_ms} is after end {end_ms}")]
    InvertedInterval {
        id: EventId,
        start_ms: i64,
        end_ms: i64,
    },
    #[error("event {id}: path needs at least 2 vertices, got {count}")]
    PathTooShort { id: EventId, count: usize },
    #[error("event {id}: non-finite coordinate")]
    NonFiniteCoordinate { id: EventId },
}

/// One recorded anomaly. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    id: EventId,
    location: Location,
    start_ms: i64,
    end_ms: i64,
    severity: Severity,
    status: Status,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub video: Option<VideoRef>,
}

impl Event {
    pub fn new(
        id: impl Into<EventId>,
        location: Location,
        start_ms: i64,
        end_ms: i64,
        severity: Severity,
        status: Status,
    ) -> Result<Self, EventError> {
        let id = id.into();
        if start_ms > end_ms {
            return Err(EventError::InvertedInterval {
                id,
                start_ms,
                end_ms,
            });
        }
        match &location {
            Location::Point(p) if !p.is_finite() => {
                return Err(EventError::NonFiniteCoordinate { id });
            }
            Location::Path(vertices) if vertices.len() < 2 => {
                return Err(EventError::PathTooShort {
                    id,
                    count: vertices.len(),
                });
            }
            Location::Path(vertices) if vertices.iter().any(|v| !v.is_finite()) => {
                return Err(EventError::NonFiniteCoordinate { id });
            }
            _ => {}
        }

        Ok(Self {
            id,
            location,
            start_ms,
            end_ms,
            severity,
            status,
            label: String::new(),
            description: String::new(),
            video: None,
        })
    }

    pub fn point(
        id: impl Into<EventId>,
        at: LatLon,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Self, EventError> {
        Self::new(
            id,
            Location::Point(at),
            start_ms,
            end_ms,
            Severity::Low,
            Status::Unknown,
        )
    }

    pub fn path(
        id: impl Into<EventId>,
        vertices: Vec<LatLon>,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Self, EventError> {
        Self::new(
            id,
            Location::Path(vertices),
            start_ms,
            end_ms,
            Severity::Low,
            Status::Unknown,
        )
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_video(mut self, video: VideoRef) -> Self {
        self.video = Some(video);
        self
    }

    pub fn id(&self) -> &EventId {
        &self.id
    }

    pub fn kind(&self) -> EventKind {
        self.location.kind()
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn start_ms(&self) -> i64 {
        self.start_ms
    }

    pub fn end_ms(&self) -> i64 {
        self.end_ms
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Inclusive on both ends.
    pub fn is_active_at(&self, time_ms: i64) -> bool {
        self.start_ms <= time_ms && time_ms <= self.end_ms
    }
}

/// Everything a rendering collaborator needs after one recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub batch_id: Option<String>,
    pub start_ms: i64,
    pub end_ms: i64,
    pub current_time_ms: i64,
    pub is_playing: bool,
    pub speed: f64,
    pub selected_id: Option<EventId>,
    pub has_interacted: bool,
    /// Size of the filtered display set before the temporal window.
    pub display_count: usize,
    /// Visible events, time-ascending.
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// One-shot user-visible message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BusMessage {
    SnapshotReady {
        snapshot: Snapshot,
    },
    NoticeRaised {
        notice: Notice,
    },
    PlaybackStopped {
        batch_id: Option<String>,
        rolled_over: bool,
    },
    SearchSettled {
        query: String,
        matches: Option<usize>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_canonicalized_case_insensitively() {
        assert_eq!(Status::canonicalize("APPROVED"), Status::Approved);
        assert_eq!(Status::canonicalize(" Rejected "), Status::Rejected);
        assert_eq!(Status::canonicalize("pEnDiNg"), Status::Pending);
        assert_eq!(Status::canonicalize("invalid"), Status::Invalid);
        assert_eq!(Status::canonicalize("escalated"), Status::Unknown);
        assert_eq!(Status::canonicalize(""), Status::Unknown);
    }

    #[test]
    fn severity_parse_rejects_unknown_levels() {
        assert_eq!(Severity::parse("HIGH"), Some(Severity::High));
        assert_eq!(Severity::parse("Medium"), Some(Severity::Medium));
        assert_eq!(Severity::parse("critical"), None);
    }

    #[test]
    fn event_rejects_inverted_interval() {
        let err = Event::point("e1", LatLon::new(1.0, 2.0), 5_000, 1_000).unwrap_err();
        assert!(matches!(err, EventError::InvertedInterval { .. }));
    }

    #[test]
    fn path_needs_two_vertices() {
        let err = Event::path("p1", vec![LatLon::new(0.0, 0.0)], 0, 10).unwrap_err();
        assert_eq!(
            err,
            EventError::PathTooShort {
                id: EventId::from("p1"),
                count: 1
            }
        );
    }

    #[test]
    fn path_end_location_is_last_vertex() {
        let event = Event::path(
            "p1",
            vec![LatLon::new(0.0, 0.0), LatLon::new(1.0, 1.0), LatLon::new(2.0, 3.0)],
            0,
            10,
        )
        .unwrap();
        assert_eq!(event.kind(), EventKind::Path);
        assert_eq!(event.location().end(), Some(LatLon::new(2.0, 3.0)));
    }

    #[test]
    fn active_window_is_inclusive() {
        let event = Event::point("e1", LatLon::new(0.0, 0.0), 1_000, 2_000).unwrap();
        assert!(event.is_active_at(1_000));
        assert!(event.is_active_at(2_000));
        assert!(!event.is_active_at(999));
        assert!(!event.is_active_at(2_001));
    }

    #[test]
    fn event_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&EventId::from("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }
}
