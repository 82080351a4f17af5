use super::*;
use crate::models::proposal::BusyInterval;
use crate::models::time::TimeWindow;
use chrono::TimeZone;

fn utc(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 15, h, m, 0).unwrap()
}

fn slot(sh: u32, sm: u32, eh: u32, em: u32) -> FeasibleSlot {
    FeasibleSlot::new(TimeWindow::new(utc(sh, sm), utc(eh, em)).unwrap())
}

#[test]
fn test_rank_earliest_first() {
    let ranked = rank(
        vec![slot(15, 0, 16, 0), slot(10, 0, 11, 0), slot(12, 0, 13, 0)],
        None,
        chrono_tz::UTC,
    );
    let starts: Vec<_> = ranked.iter().map(|s| s.window.start()).collect();
    assert_eq!(starts, vec![utc(10, 0), utc(12, 0), utc(15, 0)]);
}

#[test]
fn test_rank_is_deterministic() {
    let slots = vec![slot(15, 0, 16, 0), slot(10, 0, 11, 0), slot(12, 0, 13, 0)];
    let first = rank(slots.clone(), Some(PartOfDay::Afternoon), chrono_tz::UTC);
    let second = rank(slots, Some(PartOfDay::Afternoon), chrono_tz::UTC);
    assert_eq!(first, second);
}

#[test]
fn test_equal_starts_prefer_fewer_conflicts() {
    let mut noisy = slot(10, 0, 11, 0);
    noisy.conflicts.push(BusyInterval {
        window: TimeWindow::new(utc(9, 0), utc(9, 45)).unwrap(),
        source: "primary".to_string(),
    });
    let clean = slot(10, 0, 11, 30);
    let ranked = rank(vec![noisy.clone(), clean.clone()], None, chrono_tz::UTC);
    assert_eq!(ranked[0].window, clean.window);
    assert_eq!(ranked[1].window, noisy.window);
}

#[test]
fn test_score_reflects_preference_deviation() {
    // 10:00 UTC is morning; afternoon preference puts it 120 minutes early.
    let ranked = rank(vec![slot(10, 0, 11, 0)], Some(PartOfDay::Afternoon), chrono_tz::UTC);
    assert_eq!(ranked[0].score, 120.0);
    let ranked = rank(vec![slot(13, 0, 14, 0)], Some(PartOfDay::Afternoon), chrono_tz::UTC);
    assert_eq!(ranked[0].score, 0.0);
}

#[test]
fn test_select_trims_to_duration() {
    let ranked = rank(vec![slot(10, 0, 17, 0)], None, chrono_tz::UTC);
    let selected = select(&ranked, Duration::minutes(30), 3);
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].window.start(), utc(10, 0));
    assert_eq!(selected[0].window.end(), utc(10, 30));
}

#[test]
fn test_select_limits_alternatives() {
    let ranked = rank(
        vec![
            slot(10, 0, 11, 0),
            slot(12, 0, 13, 0),
            slot(14, 0, 15, 0),
            slot(16, 0, 17, 0),
        ],
        None,
        chrono_tz::UTC,
    );
    let selected = select(&ranked, Duration::minutes(30), 3);
    assert_eq!(selected.len(), 3);
    assert_eq!(selected[0].window.start(), utc(10, 0));
    assert_eq!(selected[2].window.start(), utc(14, 0));
}
