//! Timezone normalization.
//!
//! Turns local time expressions into absolute UTC windows. Conversion uses
//! the zone's rules as of the *target* date, not the message's send date, so
//! meetings that cross a DST boundary land on the right instant. Local times
//! that fall inside a fall-back overlap resolve to the earlier UTC instant
//! and are flagged for the caller to disambiguate.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

use crate::models::time::TimeWindow;

/// Common timezone abbreviations mapped to IANA names.
const ZONE_ABBREVIATIONS: &[(&str, &str)] = &[
    ("PST", "America/Los_Angeles"),
    ("PDT", "America/Los_Angeles"),
    ("MST", "America/Denver"),
    ("MDT", "America/Denver"),
    ("CST", "America/Chicago"),
    ("CDT", "America/Chicago"),
    ("EST", "America/New_York"),
    ("EDT", "America/New_York"),
    ("GMT", "GMT"),
    ("BST", "Europe/London"),
    ("CET", "Europe/Paris"),
    ("JST", "Asia/Tokyo"),
    ("IST", "Asia/Kolkata"),
    ("AEST", "Australia/Sydney"),
    ("UTC", "UTC"),
    ("Z", "UTC"),
];

/// Normalization failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    /// The expression under-specifies date or time-of-day.
    #[error("ambiguous time expression: {span:?}")]
    AmbiguousTime { span: String },
    /// The zone name cannot be resolved to timezone rules.
    #[error("unknown timezone: {name:?}")]
    UnknownTimezone { name: String },
}

/// Which day an expression refers to, relative to a reference instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaySpec {
    Today,
    Tomorrow,
    /// Next occurrence of the weekday, always in the future (same weekday
    /// means next week).
    Weekday(Weekday),
    /// Explicit calendar date; `year` defaults to the next occurrence.
    Date {
        month: u32,
        day: u32,
        year: Option<i32>,
    },
    /// "next week" with no specific day.
    NextWeek,
    Unspecified,
}

/// Time-of-day part of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSpec {
    Clock { hour: u32, minute: u32 },
    PartOfDay(PartOfDay),
    Unspecified,
}

/// Coarse time-of-day preference, also used by slot ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl PartOfDay {
    /// Local hour range `[start, end)` the phrase covers.
    pub fn local_hours(&self) -> (u32, u32) {
        match self {
            PartOfDay::Morning => (9, 12),
            PartOfDay::Afternoon => (12, 17),
            PartOfDay::Evening => (17, 20),
        }
    }
}

/// A parsed but not yet normalized time expression.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeExpression {
    pub day: DaySpec,
    pub time: TimeSpec,
    /// Zone named in the expression itself, e.g. `"EST"`.
    pub zone: Option<String>,
    /// Meeting length stated alongside the time, minutes.
    pub duration_minutes: Option<i64>,
    /// Source text the expression was parsed from.
    pub raw: String,
}

/// Result of normalizing an expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedWindow {
    pub window: TimeWindow,
    /// The local time was ambiguous (DST fall-back) and resolved to the
    /// earlier UTC instant.
    pub dst_ambiguous: bool,
}

/// Resolve a zone name (IANA identifier or common abbreviation).
pub fn resolve_zone(name: &str) -> Result<Tz, NormalizeError> {
    let trimmed = name.trim();
    let upper = trimmed.to_uppercase();
    let canonical = ZONE_ABBREVIATIONS
        .iter()
        .find(|(abbr, _)| *abbr == upper)
        .map(|(_, iana)| *iana)
        .unwrap_or(trimmed);
    canonical.parse::<Tz>().map_err(|_| NormalizeError::UnknownTimezone {
        name: name.to_string(),
    })
}

/// Convert a local wall-clock time to UTC under `tz`'s rules.
///
/// Fall-back overlaps resolve to the earlier instant and report `true`;
/// spring-forward gaps are shifted past the transition.
pub fn resolve_local(naive: NaiveDateTime, tz: Tz) -> Result<(DateTime<Utc>, bool), NormalizeError> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok((dt.with_timezone(&Utc), false)),
        LocalResult::Ambiguous(earlier, later) => {
            let earliest = if earlier.with_timezone(&Utc) <= later.with_timezone(&Utc) {
                earlier
            } else {
                later
            };
            Ok((earliest.with_timezone(&Utc), true))
        }
        LocalResult::None => {
            // Inside a spring-forward gap; the wall-clock time never
            // happened, so take the first valid instant after it.
            match tz.from_local_datetime(&(naive + Duration::hours(1))) {
                LocalResult::Single(dt) => Ok((dt.with_timezone(&Utc), false)),
                LocalResult::Ambiguous(dt, _) => Ok((dt.with_timezone(&Utc), true)),
                LocalResult::None => Err(NormalizeError::AmbiguousTime {
                    span: naive.to_string(),
                }),
            }
        }
    }
}

/// Normalize a time expression to an absolute UTC window.
///
/// # Arguments
/// * `expr` - Parsed expression
/// * `reference` - Instant the relative parts are resolved against
///   (normally the message's `received_at`)
/// * `default_zone` - Zone assumed when the expression names none
/// * `default_duration` - Meeting length assumed for clock times without a
///   stated duration
pub fn normalize(
    expr: &TimeExpression,
    reference: DateTime<Utc>,
    default_zone: &str,
    default_duration: Duration,
) -> Result<NormalizedWindow, NormalizeError> {
    let zone_name = expr.zone.as_deref().unwrap_or(default_zone);
    let tz = resolve_zone(zone_name)?;
    let today = reference.with_timezone(&tz).date_naive();

    let date = match expr.day {
        DaySpec::Today => today,
        DaySpec::Tomorrow => today + Duration::days(1),
        DaySpec::Weekday(target) => {
            let mut ahead = target.num_days_from_monday() as i64
                - today.weekday().num_days_from_monday() as i64;
            if ahead <= 0 {
                ahead += 7;
            }
            today + Duration::days(ahead)
        }
        DaySpec::Date { month, day, year } => {
            let year = year.unwrap_or_else(|| {
                let candidate = NaiveDate::from_ymd_opt(today.year(), month, day);
                match candidate {
                    Some(d) if d >= today => today.year(),
                    _ => today.year() + 1,
                }
            });
            NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
                NormalizeError::AmbiguousTime {
                    span: expr.raw.clone(),
                }
            })?
        }
        // A week is a range, not a day; without a specific day there is
        // nothing to anchor a window on.
        DaySpec::NextWeek | DaySpec::Unspecified => {
            return Err(NormalizeError::AmbiguousTime {
                span: expr.raw.clone(),
            })
        }
    };

    match expr.time {
        TimeSpec::Clock { hour, minute } => {
            let naive = date.and_hms_opt(hour, minute, 0).ok_or_else(|| {
                NormalizeError::AmbiguousTime {
                    span: expr.raw.clone(),
                }
            })?;
            let (start, dst_ambiguous) = resolve_local(naive, tz)?;
            let duration = expr
                .duration_minutes
                .map(Duration::minutes)
                .unwrap_or(default_duration);
            let window = TimeWindow::from_start(start, duration).map_err(|_| {
                NormalizeError::AmbiguousTime {
                    span: expr.raw.clone(),
                }
            })?;
            Ok(NormalizedWindow {
                window,
                dst_ambiguous,
            })
        }
        TimeSpec::PartOfDay(part) => {
            let (from, to) = part.local_hours();
            let start_naive = date.and_hms_opt(from, 0, 0).unwrap();
            let end_naive = date.and_hms_opt(to, 0, 0).unwrap();
            let (start, start_amb) = resolve_local(start_naive, tz)?;
            let (end, end_amb) = resolve_local(end_naive, tz)?;
            let window =
                TimeWindow::new(start, end).map_err(|_| NormalizeError::AmbiguousTime {
                    span: expr.raw.clone(),
                })?;
            Ok(NormalizedWindow {
                window,
                dst_ambiguous: start_amb || end_amb,
            })
        }
        TimeSpec::Unspecified => Err(NormalizeError::AmbiguousTime {
            span: expr.raw.clone(),
        }),
    }
}

/// Project a UTC window back into wall-clock time in `tz`.
pub fn denormalize(window: &TimeWindow, tz: Tz) -> (NaiveDateTime, NaiveDateTime) {
    (
        window.start().with_timezone(&tz).naive_local(),
        window.end().with_timezone(&tz).naive_local(),
    )
}

/// Rebuild a UTC window from wall-clock endpoints in `tz`.
pub fn window_from_local(
    start: NaiveDateTime,
    end: NaiveDateTime,
    tz: Tz,
) -> Result<NormalizedWindow, NormalizeError> {
    let (start_utc, start_amb) = resolve_local(start, tz)?;
    let (end_utc, end_amb) = resolve_local(end, tz)?;
    let window = TimeWindow::new(start_utc, end_utc).map_err(|_| NormalizeError::AmbiguousTime {
        span: format!("{} .. {}", start, end),
    })?;
    Ok(NormalizedWindow {
        window,
        dst_ambiguous: start_amb || end_amb,
    })
}

/// Human-readable local rendering, e.g. "Tuesday, July 15 at 02:00 PM EDT".
pub fn format_human(instant: DateTime<Utc>, tz: Tz) -> String {
    instant
        .with_timezone(&tz)
        .format("%A, %B %d at %I:%M %p %Z")
        .to_string()
}

/// Working-hours window for the local day containing `date` in `tz`.
pub fn working_hours_window(
    date: NaiveDate,
    start_hour: u32,
    end_hour: u32,
    tz: Tz,
) -> Result<TimeWindow, NormalizeError> {
    let (start, _) = resolve_local(date.and_hms_opt(start_hour, 0, 0).unwrap(), tz)?;
    let (end, _) = resolve_local(date.and_hms_opt(end_hour, 0, 0).unwrap(), tz)?;
    TimeWindow::new(start, end).map_err(|_| NormalizeError::AmbiguousTime {
        span: format!("working hours {}..{} on {}", start_hour, end_hour, date),
    })
}

#[cfg(test)]
#[path = "timezone_tests.rs"]
mod timezone_tests;
