//! Constraint intersection: candidate windows minus busy intervals.
//!
//! Busy intervals are expanded by the buffer, merge-sorted and coalesced,
//! then subtracted from each candidate window with an interval-difference
//! sweep. What remains are the maximal free sub-windows of at least the
//! requested duration. A candidate that yields nothing simply contributes
//! nothing; the all-candidates-empty case is an outcome the orchestrator
//! handles, not an error here.

use chrono::Duration;

use crate::models::proposal::{BusyInterval, CandidateProposal, FeasibleSlot};
use crate::models::time::TimeWindow;

/// Expand busy intervals by `buffer` and coalesce overlapping or touching
/// ones into a sorted, disjoint list.
pub fn merge_busy(busy: &[BusyInterval], buffer: Duration) -> Vec<TimeWindow> {
    let mut expanded: Vec<TimeWindow> = busy.iter().map(|b| b.window.expand(buffer)).collect();
    expanded.sort_by_key(|w| w.start());

    let mut merged: Vec<TimeWindow> = Vec::with_capacity(expanded.len());
    for window in expanded {
        match merged.last_mut() {
            Some(last) if window.start() <= last.end() => {
                *last = last.span(&window);
            }
            _ => merged.push(window),
        }
    }
    merged
}

/// Maximal sub-windows of `window` disjoint from every interval in
/// `blocked` (which must be sorted and disjoint).
pub fn subtract(window: TimeWindow, blocked: &[TimeWindow]) -> Vec<TimeWindow> {
    let mut free = Vec::new();
    let mut cursor = window.start();
    for b in blocked {
        if b.end() <= cursor {
            continue;
        }
        if b.start() >= window.end() {
            break;
        }
        if b.start() > cursor {
            if let Ok(w) = TimeWindow::new(cursor, b.start().min(window.end())) {
                free.push(w);
            }
        }
        cursor = cursor.max(b.end());
    }
    if cursor < window.end() {
        if let Ok(w) = TimeWindow::new(cursor, window.end()) {
            free.push(w);
        }
    }
    free
}

/// Intersect candidate proposals against busy intervals.
///
/// # Arguments
/// * `proposals` - Candidates; entries without a resolved window are skipped
/// * `busy` - Busy intervals over the relevant horizon
/// * `duration` - Minimum meeting length
/// * `buffer` - Minimum gap kept before/after existing events
///
/// # Returns
/// Feasible slots sorted by start, each carrying the busy intervals it
/// narrowly avoided. Empty when no candidate yields a feasible sub-window.
pub fn feasible_slots(
    proposals: &[CandidateProposal],
    busy: &[BusyInterval],
    duration: Duration,
    buffer: Duration,
) -> Vec<FeasibleSlot> {
    let candidates: Vec<TimeWindow> = proposals.iter().filter_map(|p| p.window).collect();
    feasible_slots_in_windows(&candidates, busy, duration, buffer)
}

/// Same as [`feasible_slots`] but over pre-built candidate windows, used by
/// the orchestrator's widened searches.
pub fn feasible_slots_in_windows(
    candidates: &[TimeWindow],
    busy: &[BusyInterval],
    duration: Duration,
    buffer: Duration,
) -> Vec<FeasibleSlot> {
    let blocked = merge_busy(busy, buffer);
    let mut slots: Vec<FeasibleSlot> = Vec::new();

    for candidate in candidates {
        for free in subtract(*candidate, &blocked) {
            if free.duration() < duration {
                continue;
            }
            if slots.iter().any(|s| s.window == free) {
                continue;
            }
            let mut slot = FeasibleSlot::new(free);
            slot.conflicts = busy
                .iter()
                .filter(|b| b.window.expand(buffer + buffer).overlaps(&free))
                .cloned()
                .collect();
            slots.push(slot);
        }
    }

    slots.sort_by_key(|s| s.window.start());
    slots
}

#[cfg(test)]
#[path = "intersect_tests.rs"]
mod intersect_tests;
