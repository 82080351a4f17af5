//! Randomized sweep over the intersection stage using a deterministic
//! linear congruential generator, checking the structural guarantees that
//! must hold for any busy pattern.

use chrono::{Duration, TimeZone, Utc};
use sched_helper::models::proposal::BusyInterval;
use sched_helper::models::time::TimeWindow;
use sched_helper::services::intersect;

struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        // Numerical Recipes constants
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn range(&mut self, bound: u64) -> u64 {
        self.next() % bound
    }
}

#[test]
fn test_feasible_slots_invariants_hold_for_random_busy_patterns() {
    let day_start = Utc.with_ymd_and_hms(2025, 7, 15, 8, 0, 0).unwrap();
    let candidate = TimeWindow::new(
        day_start,
        Utc.with_ymd_and_hms(2025, 7, 15, 20, 0, 0).unwrap(),
    )
    .unwrap();
    let duration = Duration::minutes(30);
    let buffer = Duration::minutes(15);

    let mut rng = Lcg(42);
    for _ in 0..200 {
        let busy: Vec<BusyInterval> = (0..rng.range(8))
            .map(|i| {
                let offset = Duration::minutes(rng.range(11 * 60) as i64);
                let length = Duration::minutes(15 + rng.range(90) as i64);
                BusyInterval {
                    window: TimeWindow::from_start(day_start + offset, length).unwrap(),
                    source: format!("cal-{}", i),
                }
            })
            .collect();

        let slots = intersect::feasible_slots_in_windows(&[candidate], &busy, duration, buffer);

        for (i, slot) in slots.iter().enumerate() {
            // Slots stay inside the candidate window
            assert!(candidate.contains(&slot.window));
            // Slots are at least the requested duration
            assert!(slot.window.duration() >= duration);
            // No slot overlaps any buffered busy interval
            for b in &busy {
                assert!(
                    !b.window.expand(buffer).overlaps(&slot.window),
                    "slot {:?} overlaps buffered busy {:?}",
                    slot.window,
                    b.window
                );
            }
            // Sorted by start, strictly increasing (no duplicates)
            if i > 0 {
                assert!(slots[i - 1].window.start() < slot.window.start());
            }
        }
    }
}

#[test]
fn test_merge_busy_produces_sorted_disjoint_windows() {
    let day_start = Utc.with_ymd_and_hms(2025, 7, 15, 8, 0, 0).unwrap();
    let buffer = Duration::minutes(15);
    let mut rng = Lcg(7);

    for _ in 0..200 {
        let busy: Vec<BusyInterval> = (0..1 + rng.range(10))
            .map(|_| {
                let offset = Duration::minutes(rng.range(11 * 60) as i64);
                let length = Duration::minutes(5 + rng.range(120) as i64);
                BusyInterval {
                    window: TimeWindow::from_start(day_start + offset, length).unwrap(),
                    source: "primary".to_string(),
                }
            })
            .collect();

        let merged = intersect::merge_busy(&busy, buffer);

        for (i, window) in merged.iter().enumerate() {
            if i > 0 {
                // Strictly after the previous window, with a real gap
                assert!(merged[i - 1].end() < window.start());
            }
        }
        // Every buffered busy interval is covered by some merged window
        for b in &busy {
            let expanded = b.window.expand(buffer);
            assert!(merged.iter().any(|m| m.contains(&expanded)));
        }
    }
}
