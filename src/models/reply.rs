//! Reply payload types consumed by the external send step.

use serde::{Deserialize, Serialize};

use super::proposal::FeasibleSlot;
use crate::api::ThreadId;

/// What kind of answer the engine decided to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    /// Accept a proposed time.
    Confirm,
    /// Offer alternative slots.
    Counter,
    /// Ask the sender to disambiguate a vague time expression.
    Clarify,
    /// No feasible slot within the negotiation limits.
    Decline,
    /// The calendar backend could not be reached; ask to retry later.
    CalendarUnavailable,
}

/// Structured reply payload. Ephemeral: rendered once and handed to the
/// external transport, never persisted beyond the session's replay cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyDraft {
    pub kind: ReplyKind,
    /// The slot being confirmed (`Confirm`) or the best offer (`Counter`).
    pub slot: Option<FeasibleSlot>,
    /// Ranked alternatives for `Counter` replies, best first.
    pub alternatives: Vec<FeasibleSlot>,
    /// Ambiguous source excerpt quoted back in `Clarify` replies.
    pub clarify_span: Option<String>,
    pub session_ref: ThreadId,
}

impl ReplyDraft {
    pub fn new(kind: ReplyKind, session_ref: ThreadId) -> Self {
        Self {
            kind,
            slot: None,
            alternatives: Vec::new(),
            clarify_span: None,
            session_ref,
        }
    }

    pub fn with_slot(mut self, slot: FeasibleSlot) -> Self {
        self.slot = Some(slot);
        self
    }

    pub fn with_alternatives(mut self, alternatives: Vec<FeasibleSlot>) -> Self {
        self.alternatives = alternatives;
        self
    }

    pub fn with_clarify_span(mut self, span: impl Into<String>) -> Self {
        self.clarify_span = Some(span.into());
        self
    }
}
