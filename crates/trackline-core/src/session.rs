//! Session state and the reducer that applies every input to it.
//!
//! All mutation goes through [`TimelineSession::dispatch`]. Each command
//! runs to completion and reports the side effects the async driver must
//! perform (start/stop the ticker, schedule or cancel a search, notify).
//! Recomputation order is fixed: filters first, then selection.

use std::collections::HashSet;

use tracing::{debug, info, warn};
use trackline_schema::{Event, EventId, Notice, Region, Snapshot};

use crate::clock::{PlaybackClock, TickOutcome};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::filter::{compute_display_set, visible_at, FilterState};
use crate::selection::{select_next, SelectionState};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Load {
        batch_id: String,
        events: Vec<Event>,
    },
    Seek(i64),
    Play,
    Pause,
    Reset,
    SetSpeed(f64),
    CycleSpeed,
    /// Ticks carry the play generation they were started for.
    Tick {
        generation: u64,
    },
    Click(EventId),
    SetQuery(String),
    SearchResolved {
        query: String,
        ids: HashSet<EventId>,
    },
    SearchFailed {
        query: String,
        error: String,
    },
    SetRegion(Option<Region>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    StartTicker { generation: u64 },
    StopTicker,
    ScheduleSearch { batch_id: String, query: String },
    CancelSearch,
    Notify(Notice),
    PlaybackStopped { rolled_over: bool },
    SearchSettled { query: String, matches: Option<usize> },
}

/// Result of one dispatched command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transition {
    /// True when the rendered snapshot may differ.
    pub changed: bool,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn unchanged() -> Self {
        Self::default()
    }

    fn changed() -> Self {
        Self {
            changed: true,
            effects: Vec::new(),
        }
    }

    fn with(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

pub struct TimelineSession {
    config: EngineConfig,
    batch_id: Option<String>,
    raw: Vec<Event>,
    filter: FilterState,
    display: Vec<Event>,
    clock: PlaybackClock,
    selection: SelectionState,
    play_generation: u64,
}

impl TimelineSession {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let clock = PlaybackClock::new(0, 0, config.default_speed)?;
        Ok(Self {
            config,
            batch_id: None,
            raw: Vec::new(),
            filter: FilterState::default(),
            display: Vec::new(),
            clock,
            selection: SelectionState::default(),
            play_generation: 0,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn batch_id(&self) -> Option<&str> {
        self.batch_id.as_deref()
    }

    pub fn raw_events(&self) -> &[Event] {
        &self.raw
    }

    pub fn display(&self) -> &[Event] {
        &self.display
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn play_generation(&self) -> u64 {
        self.play_generation
    }

    pub fn dispatch(&mut self, command: Command) -> Result<Transition, EngineError> {
        match command {
            Command::Load { batch_id, events } => self.load(batch_id, events),
            Command::Seek(time_ms) => Ok(self.seek(time_ms)),
            Command::Play => Ok(self.play()),
            Command::Pause => Ok(self.pause()),
            Command::Reset => Ok(self.reset()),
            Command::SetSpeed(speed) => self.set_speed(speed),
            Command::CycleSpeed => {
                let next = self.config.next_speed(self.clock.speed());
                self.set_speed(next)
            }
            Command::Tick { generation } => Ok(self.tick(generation)),
            Command::Click(id) => self.click(&id),
            Command::SetQuery(query) => Ok(self.set_query(query)),
            Command::SearchResolved { query, ids } => Ok(self.search_resolved(query, ids)),
            Command::SearchFailed { query, error } => Ok(self.search_failed(query, error)),
            Command::SetRegion(region) => Ok(self.set_region(region)),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let current = self.clock.current_ms();
        Snapshot {
            batch_id: self.batch_id.clone(),
            start_ms: self.clock.start_ms(),
            end_ms: self.clock.end_ms(),
            current_time_ms: current,
            is_playing: self.clock.is_playing(),
            speed: self.clock.speed(),
            selected_id: self.selection.selected_id.clone(),
            has_interacted: self.selection.has_interacted,
            display_count: self.display.len(),
            events: visible_at(&self.display, current, self.selection.has_interacted),
        }
    }

    /// Replace the whole batch. An empty batch leaves the session untouched.
    fn load(&mut self, batch_id: String, events: Vec<Event>) -> Result<Transition, EngineError> {
        let Some(start_ms) = events.iter().map(Event::start_ms).min() else {
            return Err(EngineError::EmptyResult { batch_id });
        };
        let end_ms = events.iter().map(Event::end_ms).max().unwrap_or(start_ms);
        let clock = PlaybackClock::new(start_ms, end_ms, self.config.default_speed)?;

        let was_playing = self.clock.is_playing();
        info!(
            batch_id = %batch_id,
            events = events.len(),
            start_ms,
            end_ms,
            "batch loaded"
        );

        self.batch_id = Some(batch_id);
        self.raw = events;
        self.filter = FilterState::default();
        self.clock = clock;
        self.selection.clear();
        self.play_generation += 1;
        self.recompute_display();

        let mut transition = Transition::changed().with(Effect::CancelSearch);
        if was_playing {
            transition = transition
                .with(Effect::StopTicker)
                .with(Effect::PlaybackStopped { rolled_over: false });
        }
        Ok(transition)
    }

    fn seek(&mut self, time_ms: i64) -> Transition {
        self.clock.seek(time_ms);
        self.selection.has_interacted = true;
        self.reselect();
        Transition::changed()
    }

    fn play(&mut self) -> Transition {
        if !self.clock.play() {
            return Transition::unchanged();
        }
        self.play_generation += 1;
        self.selection.has_interacted = true;
        self.reselect();
        debug!(generation = self.play_generation, "playback started");
        Transition::changed().with(Effect::StartTicker {
            generation: self.play_generation,
        })
    }

    fn pause(&mut self) -> Transition {
        if !self.clock.pause() {
            return Transition::unchanged();
        }
        self.reselect();
        Transition::changed()
            .with(Effect::StopTicker)
            .with(Effect::PlaybackStopped { rolled_over: false })
    }

    fn reset(&mut self) -> Transition {
        let was_playing = self.clock.is_playing();
        self.clock.reset();
        self.selection.has_interacted = false;
        self.reselect();
        let transition = Transition::changed();
        if was_playing {
            transition
                .with(Effect::StopTicker)
                .with(Effect::PlaybackStopped { rolled_over: false })
        } else {
            transition
        }
    }

    fn set_speed(&mut self, speed: f64) -> Result<Transition, EngineError> {
        self.clock.set_speed(speed)?;
        Ok(Transition::changed())
    }

    fn tick(&mut self, generation: u64) -> Transition {
        if generation != self.play_generation {
            debug!(
                generation,
                current = self.play_generation,
                "dropping tick from a previous playback"
            );
            return Transition::unchanged();
        }

        match self.clock.tick(self.config.tick_interval_ms) {
            TickOutcome::Idle => Transition::unchanged(),
            TickOutcome::Advanced { .. } => {
                self.reselect();
                Transition::changed()
            }
            TickOutcome::RolledOver => {
                self.reselect();
                debug!("playback reached the end and rewound");
                Transition::changed()
                    .with(Effect::StopTicker)
                    .with(Effect::PlaybackStopped { rolled_over: true })
            }
        }
    }

    /// Explicit selection. Not re-evaluated until the cursor moves again.
    fn click(&mut self, id: &EventId) -> Result<Transition, EngineError> {
        let start_ms = self
            .display
            .iter()
            .find(|event| event.id() == id)
            .map(Event::start_ms)
            .ok_or_else(|| EngineError::UnknownEvent(id.clone()))?;

        self.clock.seek(start_ms);
        self.selection.selected_id = Some(id.clone());
        self.selection.has_interacted = true;
        Ok(Transition::changed())
    }

    fn set_query(&mut self, query: String) -> Transition {
        if query == self.filter.search_query {
            return Transition::unchanged();
        }
        self.filter.search_query = query;

        if self.filter.search_query.trim().is_empty() {
            let had_filter = self.filter.search_result_ids.take().is_some();
            if had_filter {
                self.recompute_display();
                self.reselect();
            }
            return Transition {
                changed: had_filter,
                effects: vec![Effect::CancelSearch],
            };
        }

        // The previous result keeps filtering until the new one lands.
        match self.batch_id.clone() {
            Some(batch_id) => Transition::unchanged().with(Effect::ScheduleSearch {
                batch_id,
                query: self.filter.search_query.clone(),
            }),
            None => Transition::unchanged(),
        }
    }

    fn search_resolved(&mut self, query: String, ids: HashSet<EventId>) -> Transition {
        if query != self.filter.search_query {
            debug!(query = %query, "discarding stale search response");
            return Transition::unchanged();
        }
        let matches = ids.len();
        self.filter.search_result_ids = Some(ids);
        self.recompute_display();
        self.reselect();
        Transition::changed().with(Effect::SearchSettled {
            query,
            matches: Some(matches),
        })
    }

    /// A failed search keeps the previous display set.
    fn search_failed(&mut self, query: String, error: String) -> Transition {
        if query != self.filter.search_query {
            debug!(query = %query, "discarding stale search failure");
            return Transition::unchanged();
        }
        warn!(query = %query, error = %error, "search failed");
        Transition::unchanged()
            .with(Effect::Notify(Notice::error(format!("Search failed: {error}"))))
            .with(Effect::SearchSettled {
                query,
                matches: None,
            })
    }

    /// Replaces the active region. Never re-runs the text search.
    fn set_region(&mut self, region: Option<Region>) -> Transition {
        let mut transition = Transition::changed();
        self.filter.region = match region.map(Region::validate).transpose() {
            Ok(region) => region,
            Err(err) => {
                warn!(error = %err, "ignoring unusable region");
                transition = transition.with(Effect::Notify(Notice::warning(format!(
                    "Region ignored: {err}"
                ))));
                None
            }
        };
        self.recompute_display();
        self.reselect();
        transition
    }

    fn recompute_display(&mut self) {
        self.display = compute_display_set(&self.raw, &self.filter);
    }

    fn reselect(&mut self) {
        self.selection.selected_id = select_next(
            self.clock.current_ms(),
            &self.display,
            self.clock.is_playing(),
            self.selection.selected_id.as_ref(),
        );
    }
}
