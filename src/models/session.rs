//! Per-thread negotiation session and its state machine.
//!
//! Sessions are the only shared mutable state in the engine. Transitions
//! follow a fixed graph; terminal sessions reject mutation and the
//! orchestrator opens a fresh sub-session instead, so the recorded history
//! of a finished negotiation is never rewritten.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::proposal::{CandidateProposal, FeasibleSlot};
use super::reply::ReplyDraft;
use crate::api::ThreadId;

/// Negotiation lifecycle state.
///
/// ```text
/// Proposed ──► Countered ──► Confirmed
///    │            │  ▲  │
///    │            │  └──┘ (further rounds)
///    ├──► Confirmed / Declined / Expired
///    │            ├──► Declined
///    └──► Expired └──► Expired
/// ```
///
/// `Confirmed`, `Declined` and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Proposed,
    Countered,
    Confirmed,
    Declined,
    Expired,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Confirmed | SessionState::Declined | SessionState::Expired
        )
    }
}

/// Error raised when a transition leaves the defined graph.
///
/// Never fatal: the orchestrator logs it and redirects the message to a new
/// sub-session.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid session transition from {from:?} to {to:?} (thread {thread})")]
pub struct InvalidSessionTransition {
    pub from: SessionState,
    pub to: SessionState,
    pub thread: String,
}

/// The per-email-thread record of a scheduling conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiationSession {
    pub thread_id: ThreadId,
    pub state: SessionState,
    /// Every proposal that drove a turn, in order, including synthetic
    /// system proposals for counter-offers. The full negotiation is
    /// reconstructible from this log.
    pub proposal_history: Vec<CandidateProposal>,
    /// Set if and only if `state == Confirmed`.
    pub chosen_slot: Option<FeasibleSlot>,
    /// Slots the engine has offered in counter replies, used to detect a
    /// matching acceptance on a later turn.
    pub offered_slots: Vec<FeasibleSlot>,
    /// Counter rounds consumed so far.
    pub counter_rounds: u32,
    /// Fingerprints of processed inbound messages, for idempotent retries.
    pub message_fingerprints: Vec<String>,
    /// Replay cache: the last reply sent on this session.
    pub last_reply: Option<ReplyDraft>,
    pub last_reply_body: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl NegotiationSession {
    /// Fresh session in `Proposed` state, created on the first inbound
    /// message of a thread.
    pub fn new(thread_id: ThreadId, now: DateTime<Utc>) -> Self {
        Self {
            thread_id,
            state: SessionState::Proposed,
            proposal_history: Vec::new(),
            chosen_slot: None,
            offered_slots: Vec::new(),
            counter_rounds: 0,
            message_fingerprints: Vec::new(),
            last_reply: None,
            last_reply_body: None,
            created_at: now,
            last_updated: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// True when this message was already processed on this session.
    pub fn has_fingerprint(&self, fingerprint: &str) -> bool {
        self.message_fingerprints.iter().any(|f| f == fingerprint)
    }

    pub fn record_fingerprint(&mut self, fingerprint: String) {
        if !self.has_fingerprint(&fingerprint) {
            self.message_fingerprints.push(fingerprint);
        }
    }

    /// Append the proposals that triggered the current turn.
    pub fn record_proposals<I>(&mut self, proposals: I, now: DateTime<Utc>)
    where
        I: IntoIterator<Item = CandidateProposal>,
    {
        self.proposal_history.extend(proposals);
        self.last_updated = now;
    }

    /// Offered slot whose start lies within `tolerance` of `start`, if any.
    pub fn matching_offer(
        &self,
        start: DateTime<Utc>,
        tolerance: Duration,
    ) -> Option<&FeasibleSlot> {
        self.offered_slots
            .iter()
            .find(|s| (s.window.start() - start).abs() <= tolerance)
    }

    fn guard(&self, to: SessionState) -> Result<(), InvalidSessionTransition> {
        let allowed = match (self.state, to) {
            (SessionState::Proposed, SessionState::Countered)
            | (SessionState::Proposed, SessionState::Confirmed)
            | (SessionState::Proposed, SessionState::Declined)
            | (SessionState::Proposed, SessionState::Expired)
            | (SessionState::Countered, SessionState::Countered)
            | (SessionState::Countered, SessionState::Confirmed)
            | (SessionState::Countered, SessionState::Declined)
            | (SessionState::Countered, SessionState::Expired) => true,
            _ => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(InvalidSessionTransition {
                from: self.state,
                to,
                thread: self.thread_id.value().to_string(),
            })
        }
    }

    /// Move to `Countered` after offering `offered` as alternatives.
    ///
    /// Records a synthetic system proposal per offered slot so the history
    /// shows both sides of the negotiation.
    pub fn counter(
        &mut self,
        offered: Vec<FeasibleSlot>,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidSessionTransition> {
        self.guard(SessionState::Countered)?;
        for slot in &offered {
            self.proposal_history
                .push(CandidateProposal::synthetic(slot.window, "engine counter-offer"));
        }
        self.offered_slots.extend(offered);
        self.counter_rounds += 1;
        self.state = SessionState::Countered;
        self.last_updated = now;
        Ok(())
    }

    /// Terminal: the meeting is booked.
    pub fn confirm(
        &mut self,
        slot: FeasibleSlot,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidSessionTransition> {
        self.guard(SessionState::Confirmed)?;
        self.state = SessionState::Confirmed;
        self.chosen_slot = Some(slot);
        self.last_updated = now;
        Ok(())
    }

    /// Terminal: negotiation gave up or the sender cancelled.
    pub fn decline(&mut self, now: DateTime<Utc>) -> Result<(), InvalidSessionTransition> {
        self.guard(SessionState::Declined)?;
        self.state = SessionState::Declined;
        self.last_updated = now;
        Ok(())
    }

    /// Terminal: inactivity timeout.
    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<(), InvalidSessionTransition> {
        self.guard(SessionState::Expired)?;
        self.state = SessionState::Expired;
        self.last_updated = now;
        Ok(())
    }
}

/// SHA-256 fingerprint of an inbound message, for retry deduplication.
pub fn message_fingerprint(thread_id: &str, body: &str, received_at: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(thread_id.as_bytes());
    hasher.update(b"\x00");
    hasher.update(body.as_bytes());
    hasher.update(b"\x00");
    hasher.update(received_at.to_rfc3339().as_bytes());
    hex::encode(hasher.finalize())
}
