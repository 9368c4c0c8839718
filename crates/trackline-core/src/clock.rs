use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClockState {
    #[default]
    Stopped,
    Playing,
}

/// What a single tick did to the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The clock was stopped; nothing changed.
    Idle,
    Advanced { current_ms: i64 },
    /// The step would have passed the end: stopped and rewound to start.
    RolledOver,
}

/// Virtual-time cursor over `[start_ms, end_ms]`.
///
/// `start_ms <= current_ms <= end_ms` holds after every operation.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackClock {
    start_ms: i64,
    end_ms: i64,
    current_ms: i64,
    state: ClockState,
    speed: f64,
}

impl PlaybackClock {
    pub fn new(start_ms: i64, end_ms: i64, speed: f64) -> Result<Self, EngineError> {
        if start_ms > end_ms {
            return Err(EngineError::InvalidRange { start_ms, end_ms });
        }
        validate_speed(speed)?;
        Ok(Self {
            start_ms,
            end_ms,
            current_ms: start_ms,
            state: ClockState::Stopped,
            speed,
        })
    }

    pub fn start_ms(&self) -> i64 {
        self.start_ms
    }

    pub fn end_ms(&self) -> i64 {
        self.end_ms
    }

    pub fn current_ms(&self) -> i64 {
        self.current_ms
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == ClockState::Playing
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Clamps into range. Legal while playing or stopped.
    pub fn seek(&mut self, time_ms: i64) -> i64 {
        self.current_ms = time_ms.clamp(self.start_ms, self.end_ms);
        self.current_ms
    }

    /// Returns true on the `Stopped -> Playing` transition.
    pub fn play(&mut self) -> bool {
        if self.is_playing() {
            return false;
        }
        self.state = ClockState::Playing;
        true
    }

    /// Returns true on the `Playing -> Stopped` transition.
    pub fn pause(&mut self) -> bool {
        if !self.is_playing() {
            return false;
        }
        self.state = ClockState::Stopped;
        true
    }

    pub fn reset(&mut self) {
        self.state = ClockState::Stopped;
        self.current_ms = self.start_ms;
    }

    /// Only future tick magnitudes change.
    pub fn set_speed(&mut self, speed: f64) -> Result<(), EngineError> {
        validate_speed(speed)?;
        self.speed = speed;
        Ok(())
    }

    /// Advance by `interval_ms * speed` of virtual time.
    ///
    /// Passing `end_ms` does not clamp: the clock stops and rewinds to
    /// `start_ms`. Landing exactly on `end_ms` is still a normal advance.
    pub fn tick(&mut self, interval_ms: u64) -> TickOutcome {
        if !self.is_playing() {
            return TickOutcome::Idle;
        }

        let step = (interval_ms as f64 * self.speed).round();
        let next = self.current_ms as f64 + step;
        if next > self.end_ms as f64 {
            self.state = ClockState::Stopped;
            self.current_ms = self.start_ms;
            return TickOutcome::RolledOver;
        }

        self.current_ms = next as i64;
        TickOutcome::Advanced {
            current_ms: self.current_ms,
        }
    }
}

fn validate_speed(speed: f64) -> Result<(), EngineError> {
    if speed.is_finite() && speed > 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidSpeed(speed))
    }
}
