pub mod clock;
pub mod config;
pub mod error;
pub mod filter;
pub mod geometry;
pub mod selection;
pub mod session;

pub use clock::{ClockState, PlaybackClock, TickOutcome};
pub use config::EngineConfig;
pub use error::EngineError;
pub use filter::{compute_display_set, visible_at, FilterState};
pub use geometry::{distance_m, point_in_region};
pub use selection::{select_next, SelectionState};
pub use session::{Command, Effect, TimelineSession, Transition};
