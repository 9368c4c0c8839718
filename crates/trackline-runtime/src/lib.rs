pub mod debounce;
pub mod engine;
pub mod ticker;

pub use debounce::SearchDebouncer;
pub use engine::{Engine, EngineHandle, Input};
pub use ticker::PlaybackTicker;
