//! Slot ranking and selection.
//!
//! Ordering is deterministic: earliest start first, then smallest deviation
//! from the sender's stated part-of-day preference, then fewest near-
//! conflicts. Remaining ties keep the proposal order the slots were
//! produced in (the sort is stable).

use chrono::{DateTime, Duration, Timelike, Utc};
use chrono_tz::Tz;

use crate::models::proposal::FeasibleSlot;
use crate::services::timezone::PartOfDay;

/// Rank feasible slots by policy. The returned slots carry their ranking
/// penalty in `score` (lower is better).
pub fn rank(
    mut slots: Vec<FeasibleSlot>,
    preference: Option<PartOfDay>,
    tz: Tz,
) -> Vec<FeasibleSlot> {
    for slot in &mut slots {
        slot.score = preference_deviation_minutes(slot.window.start(), preference, tz) as f64
            + slot.conflicts.len() as f64;
    }
    slots.sort_by(|a, b| {
        a.window
            .start()
            .cmp(&b.window.start())
            .then_with(|| {
                let da = preference_deviation_minutes(a.window.start(), preference, tz);
                let db = preference_deviation_minutes(b.window.start(), preference, tz);
                da.cmp(&db)
            })
            .then_with(|| a.conflicts.len().cmp(&b.conflicts.len()))
    });
    slots
}

/// Trim ranked slots to the meeting duration and keep the top `limit`.
///
/// Slots come out of intersection as maximal free windows; the offer made
/// to the sender is the first `duration` of each.
pub fn select(ranked: &[FeasibleSlot], duration: Duration, limit: usize) -> Vec<FeasibleSlot> {
    ranked
        .iter()
        .take(limit)
        .filter_map(|slot| {
            let window = crate::models::time::TimeWindow::from_start(slot.window.start(), duration)
                .ok()?;
            Some(FeasibleSlot {
                window,
                score: slot.score,
                conflicts: slot.conflicts.clone(),
            })
        })
        .collect()
}

/// Minutes between a slot start and the preferred part of day, in local
/// wall-clock terms. Zero when no preference was stated or the start falls
/// inside the preferred range.
fn preference_deviation_minutes(
    start: DateTime<Utc>,
    preference: Option<PartOfDay>,
    tz: Tz,
) -> i64 {
    let Some(part) = preference else {
        return 0;
    };
    let local = start.with_timezone(&tz);
    let minute_of_day = (local.hour() * 60 + local.minute()) as i64;
    let (from_hour, to_hour) = part.local_hours();
    let from = from_hour as i64 * 60;
    let to = to_hour as i64 * 60;
    if minute_of_day < from {
        from - minute_of_day
    } else if minute_of_day >= to {
        minute_of_day - to + 1
    } else {
        0
    }
}

#[cfg(test)]
#[path = "ranking_tests.rs"]
mod ranking_tests;
