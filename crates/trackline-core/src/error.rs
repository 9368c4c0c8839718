use thiserror::Error;
use trackline_schema::{EventId, RegionError};

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("invalid clock range: start {start_ms} is after end {end_ms}")]
    InvalidRange { start_ms: i64, end_ms: i64 },
    #[error("batch {batch_id} returned no events")]
    EmptyResult { batch_id: String },
    #[error("no event with id {0} in the loaded batch")]
    UnknownEvent(EventId),
    #[error("speed must be a positive finite multiplier, got {0}")]
    InvalidSpeed(f64),
    #[error(transparent)]
    Region(#[from] RegionError),
}
