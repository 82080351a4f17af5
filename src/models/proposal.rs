//! Proposal and slot types flowing through the negotiation pipeline.

use serde::{Deserialize, Serialize};

use super::time::TimeWindow;

/// Intent detected from the email body.
///
/// Keyword-driven classification; drives reply tone and decline handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Sender is sharing availability or proposing times.
    Available,
    /// Sender wants to move an already-discussed meeting.
    Reschedule,
    /// Sender is calling the meeting off.
    Cancel,
    /// Sender is accepting a previously offered slot.
    Confirm,
    Unknown,
}

/// A time window extracted from email text, not yet validated against the
/// calendar.
///
/// `window` is `None` when normalization failed; such proposals carry
/// `confidence == 0.0` and keep `raw_span` so the reply composer can ask a
/// clarifying question. Proposals live only for the pipeline invocation that
/// produced them (plus the session's history log).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProposal {
    pub window: Option<TimeWindow>,
    /// Meeting length asked for in the email, minutes.
    pub duration_minutes: Option<i64>,
    /// Extraction confidence in `[0, 1]`.
    pub confidence: f64,
    /// Source text excerpt this proposal was extracted from.
    pub raw_span: String,
    /// IANA timezone the expression was interpreted in.
    pub source_timezone: String,
    /// Set when the local time fell in a DST fall-back overlap and was
    /// resolved to the earlier UTC instant.
    #[serde(default)]
    pub dst_ambiguous: bool,
}

impl CandidateProposal {
    /// Proposal that could not be normalized; kept for clarification.
    pub fn unresolved(raw_span: impl Into<String>, source_timezone: impl Into<String>) -> Self {
        Self {
            window: None,
            duration_minutes: None,
            confidence: 0.0,
            raw_span: raw_span.into(),
            source_timezone: source_timezone.into(),
            dst_ambiguous: false,
        }
    }

    /// Synthetic proposal recorded in history when the engine counters.
    pub fn synthetic(window: TimeWindow, note: impl Into<String>) -> Self {
        Self {
            window: Some(window),
            duration_minutes: None,
            confidence: 1.0,
            raw_span: note.into(),
            source_timezone: "UTC".to_string(),
            dst_ambiguous: false,
        }
    }
}

/// Busy interval reported by a calendar backend. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub window: TimeWindow,
    /// Identifier of the calendar the interval came from.
    pub source: String,
}

/// A window proven free of conflicts and long enough for the meeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeasibleSlot {
    pub window: TimeWindow,
    /// Ranking penalty; lower is better. Filled in by the ranking stage.
    pub score: f64,
    /// Busy intervals this slot narrowly avoided, for explainability.
    pub conflicts: Vec<BusyInterval>,
}

impl FeasibleSlot {
    pub fn new(window: TimeWindow) -> Self {
        Self {
            window,
            score: 0.0,
            conflicts: Vec::new(),
        }
    }
}
