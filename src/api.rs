//! Public API surface for the scheduling engine.
//!
//! This file consolidates the identifier newtypes and the DTOs exchanged
//! with the external transport collaborators. All types derive
//! Serialize/Deserialize for JSON serialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::models::proposal::{BusyInterval, CandidateProposal, FeasibleSlot, Intent};
pub use crate::models::reply::{ReplyDraft, ReplyKind};
pub use crate::models::session::{NegotiationSession, SessionState};
pub use crate::models::time::TimeWindow;

/// Email thread identifier (opaque to the engine).
///
/// Terminal sessions are never reopened; a late message on a finished
/// thread gets a derived sub-identifier via [`ThreadId::sub`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn new(value: impl Into<String>) -> Self {
        ThreadId(value.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }

    /// Identifier of the thread this one was derived from, stripping any
    /// `#n` suffix.
    pub fn base(&self) -> &str {
        self.0.split('#').next().unwrap_or(&self.0)
    }

    /// Derived sub-identifier for restarting negotiation after a terminal
    /// session, e.g. `"thread-1#2"`.
    pub fn sub(&self, n: u32) -> ThreadId {
        ThreadId(format!("{}#{}", self.base(), n))
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Calendar identifier passed through to the calendar backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalendarId(String);

impl CalendarId {
    pub fn new(value: impl Into<String>) -> Self {
        CalendarId(value.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

/// Inbound message handed to the engine by the email transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub thread_id: ThreadId,
    pub sender_address: String,
    /// Preferred timezone of the recipient, e.g. `"America/New_York"` or
    /// `"PST"`. Falls back to the configured default when absent.
    pub recipient_timezone_hint: Option<String>,
    pub body_text: String,
    pub received_at: DateTime<Utc>,
}

/// Outbound reply event produced per processed message, handed to the
/// external send collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyEvent {
    pub thread_id: ThreadId,
    pub kind: ReplyKind,
    pub rendered_body: String,
    /// Structured payload backing the rendered body.
    pub draft: ReplyDraft,
}
