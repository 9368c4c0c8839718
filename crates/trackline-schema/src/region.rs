use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::LatLon;

#[derive(Debug, Error, PartialEq)]
pub enum RegionError {
    #[error("polygon needs at least 3 vertices, got {0}")]
    DegeneratePolygon(usize),
    #[error("circle radius must be a finite non-negative number of meters, got {0}")]
    InvalidRadius(f64),
    #[error("region has a non-finite coordinate")]
    NonFiniteCoordinate,
}

/// A user-drawn spatial filter. Only one is active per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "shape")]
pub enum Region {
    Circle { center: LatLon, radius_m: f64 },
    /// Vertices form a closed ring; the closing edge is implicit.
    Polygon { vertices: Vec<LatLon> },
}

impl Region {
    pub fn circle(center: LatLon, radius_m: f64) -> Result<Self, RegionError> {
        if !center.is_finite() {
            return Err(RegionError::NonFiniteCoordinate);
        }
        if !radius_m.is_finite() || radius_m < 0.0 {
            return Err(RegionError::InvalidRadius(radius_m));
        }
        Ok(Region::Circle { center, radius_m })
    }

    pub fn polygon(vertices: Vec<LatLon>) -> Result<Self, RegionError> {
        if vertices.len() < 3 {
            return Err(RegionError::DegeneratePolygon(vertices.len()));
        }
        if vertices.iter().any(|v| !v.is_finite()) {
            return Err(RegionError::NonFiniteCoordinate);
        }
        Ok(Region::Polygon { vertices })
    }

    /// Re-run constructor checks on a value that was built or deserialized directly.
    pub fn validate(self) -> Result<Self, RegionError> {
        match self {
            Region::Circle { center, radius_m } => Region::circle(center, radius_m),
            Region::Polygon { vertices } => Region::polygon(vertices),
        }
    }
}
