//! Which single event is "selected" for popups and log highlighting.
//!
//! While the clock plays, selection follows the most recently begun active
//! event. While it is stopped, a selection the user made sticks; it is only
//! cleared when nothing is active at the cursor.

use trackline_schema::{Event, EventId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub selected_id: Option<EventId>,
    /// False right after a load; set by seeks, clicks and playback.
    pub has_interacted: bool,
}

impl SelectionState {
    pub fn clear(&mut self) {
        self.selected_id = None;
        self.has_interacted = false;
    }
}

/// Events in `display` whose interval contains `time_ms`, in display order.
pub fn candidates_at<'a>(
    display: &'a [Event],
    time_ms: i64,
) -> impl Iterator<Item = &'a Event> + 'a {
    display.iter().filter(move |event| event.is_active_at(time_ms))
}

/// Latest start wins; on a tie the earlier display position wins.
pub fn latest_started<'a>(candidates: impl Iterator<Item = &'a Event>) -> Option<&'a Event> {
    candidates.fold(None::<&'a Event>, |best, event| match best {
        Some(current) if current.start_ms() >= event.start_ms() => Some(current),
        _ => Some(event),
    })
}

/// Re-evaluate the selection after the cursor, display set or play state moved.
pub fn select_next(
    time_ms: i64,
    display: &[Event],
    is_playing: bool,
    current: Option<&EventId>,
) -> Option<EventId> {
    let mut candidates = candidates_at(display, time_ms).peekable();
    if candidates.peek().is_none() {
        return None;
    }

    if is_playing {
        return latest_started(candidates).map(|event| event.id().clone());
    }

    // Paused: keep what the user chose, unless the filters removed it.
    current
        .filter(|id| display.iter().any(|event| event.id() == *id))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackline_schema::LatLon;

    fn event(id: &str, start: i64, end: i64) -> Event {
        Event::point(id, LatLon::new(0.0, 0.0), start, end).unwrap()
    }

    fn overlapping() -> Vec<Event> {
        vec![event("A", 0, 1_000), event("B", 500, 1_500)]
    }

    #[test]
    fn playing_picks_the_later_start() {
        let display = overlapping();
        let selected = select_next(700, &display, true, None);
        assert_eq!(selected, Some(EventId::from("B")));
    }

    #[test]
    fn playing_overrides_a_manual_choice() {
        let display = overlapping();
        let a = EventId::from("A");
        assert_eq!(
            select_next(700, &display, true, Some(&a)),
            Some(EventId::from("B"))
        );
    }

    #[test]
    fn paused_keeps_a_manual_choice() {
        let display = overlapping();
        let a = EventId::from("A");
        assert_eq!(select_next(700, &display, false, Some(&a)), Some(a.clone()));
    }

    #[test]
    fn paused_without_prior_choice_selects_nothing() {
        let display = overlapping();
        assert_eq!(select_next(700, &display, false, None), None);
    }

    #[test]
    fn no_candidates_clears_in_both_modes() {
        let display = overlapping();
        let a = EventId::from("A");
        assert_eq!(select_next(2_000, &display, false, Some(&a)), None);
        assert_eq!(select_next(2_000, &display, true, Some(&a)), None);
    }

    #[test]
    fn paused_choice_filtered_out_of_display_is_dropped() {
        let display = vec![event("B", 500, 1_500)];
        let a = EventId::from("A");
        assert_eq!(select_next(700, &display, false, Some(&a)), None);
    }

    #[test]
    fn equal_starts_prefer_display_order() {
        let display = vec![event("first", 100, 900), event("second", 100, 500)];
        assert_eq!(
            select_next(300, &display, true, None),
            Some(EventId::from("first"))
        );
    }

    #[test]
    fn interval_bounds_are_inclusive() {
        let display = vec![event("A", 100, 200)];
        assert!(select_next(100, &display, true, None).is_some());
        assert!(select_next(200, &display, true, None).is_some());
        assert!(select_next(201, &display, true, None).is_none());
    }
}
