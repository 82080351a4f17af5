//! Availability extraction from raw email text.
//!
//! This is the engine's sole boundary for untrusted, free-form input. Regex
//! extraction produces time expressions that are resolved through the
//! timezone normalizer; anything that fails to normalize is kept as a
//! confidence-0 proposal so the reply composer can ask for clarification.
//! Structured output from an external language-understanding step enters
//! through [`validate_raw`] and is never trusted without a schema check.

use chrono::{DateTime, Utc, Weekday};
use log::debug;
use regex::Regex;

use crate::config::EngineConfig;
use crate::models::proposal::{CandidateProposal, Intent};
use crate::models::time::TimeWindow;
use crate::services::timezone::{self, DaySpec, PartOfDay, TimeExpression, TimeSpec};

const ZONE_GROUP: &str =
    r"(?:\s*(?P<zone>pst|pdt|mst|mdt|cst|cdt|est|edt|gmt|bst|cet|jst|ist|aest|utc))?";

/// Result of parsing one email body.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Proposals in order of appearance in the text.
    pub proposals: Vec<CandidateProposal>,
    pub intent: Intent,
    /// Part-of-day preference stated anywhere in the email, used by the
    /// ranking stage.
    pub preference: Option<PartOfDay>,
}

/// Tagged outcome of validating an untyped extraction result.
#[derive(Debug, Clone)]
pub enum Validated {
    Valid(CandidateProposal),
    Invalid { reason: String },
}

/// Compiled pattern set for availability extraction.
pub struct Extractor {
    day_time: Regex,
    time_on_day: Regex,
    slash_date_time: Regex,
    month_date_time: Regex,
    day_pair_part: Regex,
    day_part: Regex,
    vague_week: Regex,
    duration: Regex,
    part_words: Regex,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    pub fn new() -> Self {
        let day = r"(?P<day>today|tomorrow|monday|tuesday|wednesday|thursday|friday|saturday|sunday)";
        let clock = r"(?P<hour>\d{1,2})(?::(?P<minute>\d{2}))?\s*(?P<ampm>am|pm)";
        Self {
            day_time: compile(&format!(r"(?i)\b{day}\s+(?:at\s+)?{clock}{ZONE_GROUP}\b")),
            time_on_day: compile(&format!(r"(?i)\b{clock}{ZONE_GROUP}\s+on\s+{day}\b")),
            slash_date_time: compile(&format!(
                r"(?i)\b(?P<month>\d{{1,2}})/(?P<dom>\d{{1,2}})(?:/(?P<year>\d{{4}}))?\s+at\s+{clock}{ZONE_GROUP}\b"
            )),
            month_date_time: compile(&format!(
                r"(?i)\b(?P<monthname>january|february|march|april|may|june|july|august|september|october|november|december)\s+(?P<dom>\d{{1,2}})(?:st|nd|rd|th)?\s+at\s+{clock}{ZONE_GROUP}\b"
            )),
            day_pair_part: compile(&format!(
                r"(?i)\b{day}\s+or\s+(?P<day2>monday|tuesday|wednesday|thursday|friday|saturday|sunday)\s+(?P<part>morning|afternoon|evening)\b"
            )),
            day_part: compile(&format!(
                r"(?i)\b{day}\s+(?P<part>morning|afternoon|evening)\b"
            )),
            vague_week: compile(r"(?i)\b(?:sometime\s+)?(?:next|this)\s+week\b"),
            duration: compile(
                r"(?i)\bfor\s+(?:(?P<n>\d{1,3})\s*(?P<unit>minutes|mins|min|hours|hrs|hour|hr)|an?\s+hour)\b",
            ),
            part_words: compile(r"(?i)\b(morning|afternoon|evening)\b"),
        }
    }

    /// Extract candidate proposals, intent and preference from an email body.
    ///
    /// # Arguments
    /// * `body` - Raw email text
    /// * `zone_hint` - Recipient/sender timezone hint from message metadata
    /// * `reference` - Instant relative expressions resolve against
    /// * `config` - Policy (default timezone, default meeting duration)
    pub fn extract(
        &self,
        body: &str,
        zone_hint: Option<&str>,
        reference: DateTime<Utc>,
        config: &EngineConfig,
    ) -> Extraction {
        let default_zone = zone_hint.unwrap_or(&config.default_timezone);
        let duration_minutes = self.stated_duration(body);
        let mut found: Vec<(usize, TimeExpression)> = Vec::new();
        let mut claimed: Vec<(usize, usize)> = Vec::new();

        self.collect_day_time(body, duration_minutes, &mut found, &mut claimed);
        self.collect_time_on_day(body, duration_minutes, &mut found, &mut claimed);
        self.collect_dates(body, duration_minutes, &mut found, &mut claimed);
        self.collect_day_parts(body, &mut found, &mut claimed);
        self.collect_vague(body, &mut found, &mut claimed);

        found.sort_by_key(|(pos, _)| *pos);

        let mut proposals = Vec::new();
        for (_, expr) in found {
            let proposal = self.resolve(&expr, reference, default_zone, config);
            let duplicate = proposal.window.is_some()
                && proposals
                    .iter()
                    .any(|p: &CandidateProposal| p.window == proposal.window);
            if !duplicate {
                proposals.push(proposal);
            }
        }

        let intent = detect_intent(body);
        let preference = self
            .part_words
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|m| part_of_day(m.as_str()));

        debug!(
            "extracted {} proposal(s), intent {:?}, preference {:?}",
            proposals.len(),
            intent,
            preference
        );

        Extraction {
            proposals,
            intent,
            preference,
        }
    }

    fn resolve(
        &self,
        expr: &TimeExpression,
        reference: DateTime<Utc>,
        default_zone: &str,
        config: &EngineConfig,
    ) -> CandidateProposal {
        let zone_used = expr
            .zone
            .clone()
            .unwrap_or_else(|| default_zone.to_string());
        match timezone::normalize(expr, reference, default_zone, config.default_duration()) {
            Ok(normalized) => CandidateProposal {
                window: Some(normalized.window),
                duration_minutes: expr.duration_minutes,
                confidence: expression_confidence(expr),
                raw_span: expr.raw.clone(),
                source_timezone: zone_used,
                dst_ambiguous: normalized.dst_ambiguous,
            },
            Err(err) => {
                debug!("normalization failed for {:?}: {}", expr.raw, err);
                CandidateProposal::unresolved(expr.raw.clone(), zone_used)
            }
        }
    }

    fn collect_day_time(
        &self,
        body: &str,
        duration_minutes: Option<i64>,
        found: &mut Vec<(usize, TimeExpression)>,
        claimed: &mut Vec<(usize, usize)>,
    ) {
        for caps in self.day_time.captures_iter(body) {
            let m = caps.get(0).unwrap();
            if claim(claimed, m.start(), m.end()) {
                let (hour, minute) = match clock_from(&caps) {
                    Some(hm) => hm,
                    None => continue,
                };
                found.push((
                    m.start(),
                    TimeExpression {
                        day: day_spec(&caps["day"]),
                        time: TimeSpec::Clock { hour, minute },
                        zone: caps.name("zone").map(|z| z.as_str().to_string()),
                        duration_minutes,
                        raw: m.as_str().to_string(),
                    },
                ));
            }
        }
    }

    fn collect_time_on_day(
        &self,
        body: &str,
        duration_minutes: Option<i64>,
        found: &mut Vec<(usize, TimeExpression)>,
        claimed: &mut Vec<(usize, usize)>,
    ) {
        for caps in self.time_on_day.captures_iter(body) {
            let m = caps.get(0).unwrap();
            if claim(claimed, m.start(), m.end()) {
                let (hour, minute) = match clock_from(&caps) {
                    Some(hm) => hm,
                    None => continue,
                };
                found.push((
                    m.start(),
                    TimeExpression {
                        day: day_spec(&caps["day"]),
                        time: TimeSpec::Clock { hour, minute },
                        zone: caps.name("zone").map(|z| z.as_str().to_string()),
                        duration_minutes,
                        raw: m.as_str().to_string(),
                    },
                ));
            }
        }
    }

    fn collect_dates(
        &self,
        body: &str,
        duration_minutes: Option<i64>,
        found: &mut Vec<(usize, TimeExpression)>,
        claimed: &mut Vec<(usize, usize)>,
    ) {
        for caps in self.slash_date_time.captures_iter(body) {
            let m = caps.get(0).unwrap();
            if claim(claimed, m.start(), m.end()) {
                let (hour, minute) = match clock_from(&caps) {
                    Some(hm) => hm,
                    None => continue,
                };
                let month: u32 = caps["month"].parse().unwrap_or(0);
                let dom: u32 = caps["dom"].parse().unwrap_or(0);
                let year: Option<i32> = caps.name("year").and_then(|y| y.as_str().parse().ok());
                found.push((
                    m.start(),
                    TimeExpression {
                        day: DaySpec::Date {
                            month,
                            day: dom,
                            year,
                        },
                        time: TimeSpec::Clock { hour, minute },
                        zone: caps.name("zone").map(|z| z.as_str().to_string()),
                        duration_minutes,
                        raw: m.as_str().to_string(),
                    },
                ));
            }
        }
        for caps in self.month_date_time.captures_iter(body) {
            let m = caps.get(0).unwrap();
            if claim(claimed, m.start(), m.end()) {
                let (hour, minute) = match clock_from(&caps) {
                    Some(hm) => hm,
                    None => continue,
                };
                let month = month_number(&caps["monthname"]);
                let dom: u32 = caps["dom"].parse().unwrap_or(0);
                found.push((
                    m.start(),
                    TimeExpression {
                        day: DaySpec::Date {
                            month,
                            day: dom,
                            year: None,
                        },
                        time: TimeSpec::Clock { hour, minute },
                        zone: caps.name("zone").map(|z| z.as_str().to_string()),
                        duration_minutes,
                        raw: m.as_str().to_string(),
                    },
                ));
            }
        }
    }

    fn collect_day_parts(
        &self,
        body: &str,
        found: &mut Vec<(usize, TimeExpression)>,
        claimed: &mut Vec<(usize, usize)>,
    ) {
        // "Tuesday or Wednesday morning" yields one proposal per day.
        for caps in self.day_pair_part.captures_iter(body) {
            let m = caps.get(0).unwrap();
            if claim(claimed, m.start(), m.end()) {
                let part = part_of_day(&caps["part"]);
                for (offset, day) in [(0usize, &caps["day"]), (1, &caps["day2"])] {
                    found.push((
                        m.start() + offset,
                        TimeExpression {
                            day: day_spec(day),
                            time: TimeSpec::PartOfDay(part),
                            zone: None,
                            duration_minutes: None,
                            raw: m.as_str().to_string(),
                        },
                    ));
                }
            }
        }
        for caps in self.day_part.captures_iter(body) {
            let m = caps.get(0).unwrap();
            if claim(claimed, m.start(), m.end()) {
                found.push((
                    m.start(),
                    TimeExpression {
                        day: day_spec(&caps["day"]),
                        time: TimeSpec::PartOfDay(part_of_day(&caps["part"])),
                        zone: None,
                        duration_minutes: None,
                        raw: m.as_str().to_string(),
                    },
                ));
            }
        }
    }

    fn collect_vague(
        &self,
        body: &str,
        found: &mut Vec<(usize, TimeExpression)>,
        claimed: &mut Vec<(usize, usize)>,
    ) {
        for m in self.vague_week.find_iter(body) {
            if claim(claimed, m.start(), m.end()) {
                found.push((
                    m.start(),
                    TimeExpression {
                        day: DaySpec::NextWeek,
                        time: TimeSpec::Unspecified,
                        zone: None,
                        duration_minutes: None,
                        raw: m.as_str().to_string(),
                    },
                ));
            }
        }
    }

    fn stated_duration(&self, body: &str) -> Option<i64> {
        let caps = self.duration.captures(body)?;
        match caps.name("n") {
            Some(n) => {
                let value: i64 = n.as_str().parse().ok()?;
                let unit = caps.name("unit").map(|u| u.as_str().to_lowercase());
                match unit.as_deref() {
                    Some("hours") | Some("hour") | Some("hrs") | Some("hr") => Some(value * 60),
                    _ => Some(value),
                }
            }
            // "for an hour"
            None => Some(60),
        }
    }
}

/// Validate a structured extraction result from an external
/// language-understanding step against the CandidateProposal schema.
///
/// Malformed or schema-violating output never crosses into the pipeline as
/// a trusted value: it is either rejected outright or downgraded to a
/// confidence-0 proposal.
pub fn validate_raw(value: &serde_json::Value) -> Validated {
    let obj = match value.as_object() {
        Some(obj) => obj,
        None => {
            return Validated::Invalid {
                reason: "extraction result is not an object".to_string(),
            }
        }
    };

    let raw_span = match obj.get("raw_span").and_then(|v| v.as_str()) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => {
            return Validated::Invalid {
                reason: "missing or empty raw_span".to_string(),
            }
        }
    };

    let source_timezone = match obj.get("source_timezone").and_then(|v| v.as_str()) {
        Some(s) => s.to_string(),
        None => {
            return Validated::Invalid {
                reason: "missing source_timezone".to_string(),
            }
        }
    };
    if timezone::resolve_zone(&source_timezone).is_err() {
        return Validated::Invalid {
            reason: format!("unresolvable source_timezone {:?}", source_timezone),
        };
    }

    let confidence = match obj.get("confidence").and_then(|v| v.as_f64()) {
        Some(c) if (0.0..=1.0).contains(&c) => c,
        Some(c) => {
            return Validated::Invalid {
                reason: format!("confidence {} outside [0, 1]", c),
            }
        }
        None => {
            return Validated::Invalid {
                reason: "missing confidence".to_string(),
            }
        }
    };

    let duration_minutes = match obj.get("duration_minutes") {
        None | Some(serde_json::Value::Null) => None,
        Some(v) => match v.as_i64() {
            Some(mins) if mins > 0 => Some(mins),
            _ => {
                return Validated::Invalid {
                    reason: "duration_minutes must be a positive integer".to_string(),
                }
            }
        },
    };

    let window = match obj.get("window") {
        None | Some(serde_json::Value::Null) => None,
        Some(v) => {
            let start = v.get("start").and_then(|s| s.as_str()).and_then(parse_rfc3339);
            let end = v.get("end").and_then(|s| s.as_str()).and_then(parse_rfc3339);
            match (start, end) {
                (Some(start), Some(end)) => match TimeWindow::new(start, end) {
                    Ok(w) => Some(w),
                    Err(e) => {
                        return Validated::Invalid {
                            reason: e.to_string(),
                        }
                    }
                },
                _ => {
                    return Validated::Invalid {
                        reason: "window start/end are not RFC 3339 timestamps".to_string(),
                    }
                }
            }
        }
    };

    // A windowless proposal is only meaningful as a clarification request.
    let confidence = if window.is_none() { 0.0 } else { confidence };

    Validated::Valid(CandidateProposal {
        window,
        duration_minutes,
        confidence,
        raw_span,
        source_timezone,
        dst_ambiguous: false,
    })
}

/// Keyword-based intent classification, checked most-specific first.
pub fn detect_intent(body: &str) -> Intent {
    let text = body.to_lowercase();
    const CANCEL: &[&str] = &[
        "cancel",
        "cannot make it",
        "can't make it",
        "not available",
        "unavailable",
    ];
    const RESCHEDULE: &[&str] = &[
        "reschedule",
        "change",
        "move",
        "different time",
        "another time",
    ];
    const CONFIRM: &[&str] = &["confirm", "sounds good", "works for me", "see you then"];
    const AVAILABLE: &[&str] = &["available", "free", "open", "can do", "works"];

    if CANCEL.iter().any(|k| text.contains(k)) {
        Intent::Cancel
    } else if RESCHEDULE.iter().any(|k| text.contains(k)) {
        Intent::Reschedule
    } else if CONFIRM.iter().any(|k| text.contains(k)) {
        Intent::Confirm
    } else if AVAILABLE.iter().any(|k| text.contains(k)) {
        Intent::Available
    } else {
        Intent::Unknown
    }
}

/// Confidence assigned to a successfully normalized expression. Explicit
/// dates score highest; part-of-day windows are usable but soft.
fn expression_confidence(expr: &TimeExpression) -> f64 {
    match expr.time {
        TimeSpec::Clock { .. } => match expr.day {
            DaySpec::Date { .. } => 0.9,
            DaySpec::Weekday(_) | DaySpec::Today | DaySpec::Tomorrow => 0.85,
            DaySpec::NextWeek | DaySpec::Unspecified => 0.0,
        },
        TimeSpec::PartOfDay(_) => 0.6,
        TimeSpec::Unspecified => 0.0,
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("hard-coded extraction pattern must compile")
}

/// Reserve `[start, end)` unless it overlaps an already-claimed span.
fn claim(claimed: &mut Vec<(usize, usize)>, start: usize, end: usize) -> bool {
    if claimed.iter().any(|&(s, e)| start < e && s < end) {
        return false;
    }
    claimed.push((start, end));
    true
}

fn clock_from(caps: &regex::Captures<'_>) -> Option<(u32, u32)> {
    let mut hour: u32 = caps.name("hour")?.as_str().parse().ok()?;
    let minute: u32 = match caps.name("minute") {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    if hour > 12 || minute > 59 {
        return None;
    }
    let pm = caps.name("ampm")?.as_str().eq_ignore_ascii_case("pm");
    if pm && hour != 12 {
        hour += 12;
    } else if !pm && hour == 12 {
        hour = 0;
    }
    Some((hour, minute))
}

fn day_spec(word: &str) -> DaySpec {
    match word.to_lowercase().as_str() {
        "today" => DaySpec::Today,
        "tomorrow" => DaySpec::Tomorrow,
        "monday" => DaySpec::Weekday(Weekday::Mon),
        "tuesday" => DaySpec::Weekday(Weekday::Tue),
        "wednesday" => DaySpec::Weekday(Weekday::Wed),
        "thursday" => DaySpec::Weekday(Weekday::Thu),
        "friday" => DaySpec::Weekday(Weekday::Fri),
        "saturday" => DaySpec::Weekday(Weekday::Sat),
        "sunday" => DaySpec::Weekday(Weekday::Sun),
        _ => DaySpec::Unspecified,
    }
}

fn part_of_day(word: &str) -> PartOfDay {
    match word.to_lowercase().as_str() {
        "morning" => PartOfDay::Morning,
        "evening" => PartOfDay::Evening,
        _ => PartOfDay::Afternoon,
    }
}

fn month_number(name: &str) -> u32 {
    match name.to_lowercase().as_str() {
        "january" => 1,
        "february" => 2,
        "march" => 3,
        "april" => 4,
        "may" => 5,
        "june" => 6,
        "july" => 7,
        "august" => 8,
        "september" => 9,
        "october" => 10,
        "november" => 11,
        _ => 12,
    }
}

fn parse_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
#[path = "extractor_tests.rs"]
mod extractor_tests;
