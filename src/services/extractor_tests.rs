use super::*;
use chrono::TimeZone;
use serde_json::json;

fn reference() -> DateTime<Utc> {
    // Friday 2025-07-11 12:00 UTC
    Utc.with_ymd_and_hms(2025, 7, 11, 12, 0, 0).unwrap()
}

fn extract(body: &str) -> Extraction {
    Extractor::new().extract(body, None, reference(), &EngineConfig::default())
}

#[test]
fn test_day_at_time_with_zone() {
    let extraction = extract("Can we meet Tuesday at 2pm EST for 30 minutes?");
    assert_eq!(extraction.proposals.len(), 1);
    let p = &extraction.proposals[0];
    // 14:00 America/New_York in July is 18:00 UTC.
    assert_eq!(
        p.window.unwrap().start(),
        Utc.with_ymd_and_hms(2025, 7, 15, 18, 0, 0).unwrap()
    );
    assert_eq!(p.duration_minutes, Some(30));
    assert_eq!(p.source_timezone, "EST");
    assert!(p.confidence > 0.5);
}

#[test]
fn test_time_on_day_order() {
    let extraction = extract("I'm free at 10am on Wednesday.");
    assert_eq!(extraction.proposals.len(), 1);
    assert_eq!(
        extraction.proposals[0].window.unwrap().start(),
        Utc.with_ymd_and_hms(2025, 7, 16, 10, 0, 0).unwrap()
    );
}

#[test]
fn test_multiple_proposals_in_text_order() {
    let extraction = extract("Tuesday at 2pm works, or Wednesday at 10am if that's easier.");
    assert_eq!(extraction.proposals.len(), 2);
    let first = extraction.proposals[0].window.unwrap().start();
    let second = extraction.proposals[1].window.unwrap().start();
    assert_eq!(first, Utc.with_ymd_and_hms(2025, 7, 15, 14, 0, 0).unwrap());
    assert_eq!(second, Utc.with_ymd_and_hms(2025, 7, 16, 10, 0, 0).unwrap());
}

#[test]
fn test_day_pair_with_shared_part_of_day() {
    let extraction = extract("Would Tuesday or Wednesday morning work?");
    assert_eq!(extraction.proposals.len(), 2);
    for p in &extraction.proposals {
        let w = p.window.unwrap();
        // morning windows are 9-12 local (UTC default here)
        assert_eq!(w.duration(), chrono::Duration::hours(3));
    }
    assert_eq!(extraction.preference, Some(PartOfDay::Morning));
}

#[test]
fn test_slash_date() {
    let extraction = extract("How about 7/21 at 3pm?");
    assert_eq!(
        extraction.proposals[0].window.unwrap().start(),
        Utc.with_ymd_and_hms(2025, 7, 21, 15, 0, 0).unwrap()
    );
}

#[test]
fn test_month_name_date() {
    let extraction = extract("Let's meet on July 21st at 3pm UTC.");
    assert_eq!(
        extraction.proposals[0].window.unwrap().start(),
        Utc.with_ymd_and_hms(2025, 7, 21, 15, 0, 0).unwrap()
    );
}

#[test]
fn test_vague_week_yields_confidence_zero() {
    let extraction = extract("I should have time sometime next week.");
    assert_eq!(extraction.proposals.len(), 1);
    let p = &extraction.proposals[0];
    assert_eq!(p.confidence, 0.0);
    assert!(p.window.is_none());
    assert_eq!(p.raw_span, "sometime next week");
}

#[test]
fn test_no_time_expressions() {
    let extraction = extract("Thanks for the update on the project!");
    assert!(extraction.proposals.is_empty());
}

#[test]
fn test_zone_hint_applies_when_text_names_none() {
    let extraction = Extractor::new().extract(
        "Tuesday at 2pm works for me",
        Some("America/Los_Angeles"),
        reference(),
        &EngineConfig::default(),
    );
    // 14:00 Pacific in July is 21:00 UTC.
    assert_eq!(
        extraction.proposals[0].window.unwrap().start(),
        Utc.with_ymd_and_hms(2025, 7, 15, 21, 0, 0).unwrap()
    );
}

#[test]
fn test_duration_hour_phrase() {
    let extraction = extract("Tuesday at 2pm for an hour?");
    assert_eq!(extraction.proposals[0].duration_minutes, Some(60));
}

#[test]
fn test_noon_and_midnight() {
    let extraction = extract("Tuesday at 12pm or Wednesday at 12am");
    let noon = extraction.proposals[0].window.unwrap().start();
    let midnight = extraction.proposals[1].window.unwrap().start();
    assert_eq!(noon, Utc.with_ymd_and_hms(2025, 7, 15, 12, 0, 0).unwrap());
    assert_eq!(midnight, Utc.with_ymd_and_hms(2025, 7, 16, 0, 0, 0).unwrap());
}

#[test]
fn test_intent_cancel_wins_over_available() {
    assert_eq!(
        detect_intent("I'm not available anymore, please cancel"),
        Intent::Cancel
    );
}

#[test]
fn test_intent_variants() {
    assert_eq!(detect_intent("Could we reschedule?"), Intent::Reschedule);
    assert_eq!(detect_intent("Sounds good, see you then"), Intent::Confirm);
    assert_eq!(detect_intent("I'm free Tuesday"), Intent::Available);
    assert_eq!(detect_intent("Hello!"), Intent::Unknown);
}

#[test]
fn test_validate_raw_accepts_schema() {
    let value = json!({
        "window": {"start": "2025-07-15T18:00:00Z", "end": "2025-07-15T18:30:00Z"},
        "duration_minutes": 30,
        "confidence": 0.8,
        "raw_span": "Tuesday at 2pm EST",
        "source_timezone": "EST",
    });
    match validate_raw(&value) {
        Validated::Valid(p) => {
            assert_eq!(p.confidence, 0.8);
            assert_eq!(
                p.window.unwrap().start(),
                Utc.with_ymd_and_hms(2025, 7, 15, 18, 0, 0).unwrap()
            );
        }
        Validated::Invalid { reason } => panic!("expected valid, got {}", reason),
    }
}

#[test]
fn test_validate_raw_rejects_bad_confidence() {
    let value = json!({
        "window": {"start": "2025-07-15T18:00:00Z", "end": "2025-07-15T18:30:00Z"},
        "confidence": 1.7,
        "raw_span": "x",
        "source_timezone": "UTC",
    });
    assert!(matches!(validate_raw(&value), Validated::Invalid { .. }));
}

#[test]
fn test_validate_raw_rejects_inverted_window() {
    let value = json!({
        "window": {"start": "2025-07-15T19:00:00Z", "end": "2025-07-15T18:30:00Z"},
        "confidence": 0.9,
        "raw_span": "x",
        "source_timezone": "UTC",
    });
    assert!(matches!(validate_raw(&value), Validated::Invalid { .. }));
}

#[test]
fn test_validate_raw_rejects_unknown_zone() {
    let value = json!({
        "window": null,
        "confidence": 0.0,
        "raw_span": "x",
        "source_timezone": "Mars/Olympus",
    });
    assert!(matches!(validate_raw(&value), Validated::Invalid { .. }));
}

#[test]
fn test_validate_raw_downgrades_windowless_confidence() {
    let value = json!({
        "window": null,
        "confidence": 0.9,
        "raw_span": "sometime next week",
        "source_timezone": "UTC",
    });
    match validate_raw(&value) {
        Validated::Valid(p) => {
            assert_eq!(p.confidence, 0.0);
            assert!(p.window.is_none());
        }
        Validated::Invalid { reason } => panic!("expected valid, got {}", reason),
    }
}

#[test]
fn test_validate_raw_rejects_non_object() {
    assert!(matches!(
        validate_raw(&json!("just a string")),
        Validated::Invalid { .. }
    ));
}
