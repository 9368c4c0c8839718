//! Display-set computation: text-search ids ∩ spatial region, time ordered.

use std::collections::HashSet;

use trackline_schema::{Event, EventId, EventKind, Location, Region};

use crate::geometry::point_in_region;

/// Inputs of the filter pipeline that the user controls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    pub search_query: String,
    /// Last resolved search result. Kept across region changes.
    pub search_result_ids: Option<HashSet<EventId>>,
    pub region: Option<Region>,
}

impl FilterState {
    /// An empty query never filters, whatever result is cached.
    pub fn text_filter(&self) -> Option<&HashSet<EventId>> {
        if self.search_query.trim().is_empty() {
            None
        } else {
            self.search_result_ids.as_ref()
        }
    }
}

/// Pure and deterministic: identical inputs give an identical ordered output.
///
/// Events are deduplicated on `(kind, id)` keeping the first occurrence,
/// filtered by the search id set, then by the region, and finally sorted
/// stably by start time so ties keep their raw order.
///
/// The spatial stage works on point membership. A path survives only when
/// the point event carrying the same id is inside the region.
pub fn compute_display_set(raw: &[Event], filter: &FilterState) -> Vec<Event> {
    let mut seen: HashSet<(EventKind, &EventId)> = HashSet::with_capacity(raw.len());
    let mut staged: Vec<&Event> = raw
        .iter()
        .filter(|event| seen.insert((event.kind(), event.id())))
        .collect();

    if let Some(ids) = filter.text_filter() {
        staged.retain(|event| ids.contains(event.id()));
    }

    if let Some(region) = filter.region.as_ref() {
        let inside: HashSet<&EventId> = staged
            .iter()
            .copied()
            .filter_map(|event| match event.location() {
                Location::Point(p) if point_in_region(*p, Some(region)) => Some(event.id()),
                _ => None,
            })
            .collect();
        staged.retain(|event| inside.contains(event.id()));
    }

    staged.sort_by_key(|event| event.start_ms());
    staged.into_iter().cloned().collect()
}

/// Temporal window stage applied to the display set once the user has
/// started scrubbing or playing. Before that, everything is visible.
pub fn visible_at(display: &[Event], time_ms: i64, has_interacted: bool) -> Vec<Event> {
    if !has_interacted {
        return display.to_vec();
    }
    display
        .iter()
        .filter(|event| event.is_active_at(time_ms))
        .cloned()
        .collect()
}
