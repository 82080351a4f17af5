use super::*;
use crate::api::ThreadId;
use crate::models::proposal::FeasibleSlot;
use crate::models::time::TimeWindow;
use chrono::{Duration, TimeZone, Utc};

fn slot(hour: u32, minute: u32) -> FeasibleSlot {
    let start = Utc.with_ymd_and_hms(2025, 7, 15, hour, minute, 0).unwrap();
    FeasibleSlot::new(TimeWindow::from_start(start, Duration::minutes(30)).unwrap())
}

fn thread() -> ThreadId {
    ThreadId::new("thread-1")
}

#[test]
fn test_confirm_names_sender_and_time() {
    // 18:00 UTC is 2:00 PM EDT in July
    let draft = ReplyDraft::new(ReplyKind::Confirm, thread()).with_slot(slot(18, 0));
    let body = compose(
        &draft,
        "jane.doe@example.com",
        chrono_tz::America::New_York,
        Intent::Available,
    );
    assert!(body.starts_with("Hi Jane,"));
    assert!(body.contains("Tuesday, July 15 at 02:00 PM EDT"));
    assert!(body.contains("confirmed"));
}

#[test]
fn test_counter_lists_alternatives_in_order() {
    let draft = ReplyDraft::new(ReplyKind::Counter, thread())
        .with_slot(slot(18, 45))
        .with_alternatives(vec![slot(18, 45), slot(20, 0)]);
    let body = compose(
        &draft,
        "bob@example.com",
        chrono_tz::America::New_York,
        Intent::Available,
    );
    assert!(body.contains("- Tuesday, July 15 at 02:45 PM EDT"));
    assert!(body.contains("- Tuesday, July 15 at 04:00 PM EDT"));
    let first = body.find("02:45 PM").unwrap();
    let second = body.find("04:00 PM").unwrap();
    assert!(first < second);
}

#[test]
fn test_counter_without_slots_asks_for_wider_availability() {
    let draft = ReplyDraft::new(ReplyKind::Counter, thread());
    let body = compose(
        &draft,
        "bob@example.com",
        chrono_tz::UTC,
        Intent::Available,
    );
    assert!(body.contains("more options"));
    assert!(!body.contains("- "));
}

#[test]
fn test_clarify_quotes_ambiguous_span() {
    let draft =
        ReplyDraft::new(ReplyKind::Clarify, thread()).with_clarify_span("sometime next week");
    let body = compose(
        &draft,
        "bob@example.com",
        chrono_tz::UTC,
        Intent::Available,
    );
    assert!(body.contains("\"sometime next week\""));
}

#[test]
fn test_decline_acknowledges_cancellation() {
    let draft = ReplyDraft::new(ReplyKind::Decline, thread());
    let body = compose(&draft, "bob@example.com", chrono_tz::UTC, Intent::Cancel);
    assert!(body.contains("cancelled"));
}

#[test]
fn test_decline_after_exhausted_rounds() {
    let draft = ReplyDraft::new(ReplyKind::Decline, thread());
    let body = compose(
        &draft,
        "bob@example.com",
        chrono_tz::UTC,
        Intent::Available,
    );
    assert!(body.contains("step back"));
    assert!(!body.contains("cancelled"));
}

#[test]
fn test_calendar_unavailable_wording() {
    let draft = ReplyDraft::new(ReplyKind::CalendarUnavailable, thread());
    let body = compose(
        &draft,
        "bob@example.com",
        chrono_tz::UTC,
        Intent::Available,
    );
    assert!(body.contains("calendar"));
    assert!(body.contains("try again"));
}

#[test]
fn test_name_extraction_variants() {
    assert_eq!(name_from_address("jane.doe@example.com"), "Jane");
    assert_eq!(name_from_address("bob_smith@example.com"), "Bob");
    assert_eq!(name_from_address("carol@example.com"), "Carol");
    assert_eq!(name_from_address("12345@example.com"), "there");
    assert_eq!(name_from_address(""), "there");
}
