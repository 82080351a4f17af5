//! Negotiation orchestrator.
//!
//! Drives one inbound message through the full pipeline: session lookup,
//! idempotency check, extraction, calendar intersection, widening, ranking,
//! decision, rendering and persistence. Messages on the same thread are
//! serialized with a per-thread async lock; different threads proceed
//! concurrently.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::api::{CalendarId, InboundMessage, ReplyEvent, ThreadId};
use crate::calendar::CalendarProvider;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::proposal::{BusyInterval, CandidateProposal, FeasibleSlot, Intent};
use crate::models::reply::{ReplyDraft, ReplyKind};
use crate::models::session::{message_fingerprint, NegotiationSession};
use crate::models::time::TimeWindow;
use crate::services::extractor::{Extraction, Extractor};
use crate::services::{composer, intersect, ranking, timezone};
use crate::store::SessionStore;

/// Outcome of resolving an inbound message to a session.
enum Resolved {
    /// The live session the message should negotiate against.
    Session(NegotiationSession),
    /// The message is a duplicate; send the recorded reply again.
    Replay(ReplyEvent),
}

/// The scheduling negotiation engine.
pub struct Orchestrator {
    store: Arc<dyn SessionStore>,
    calendar: Arc<dyn CalendarProvider>,
    calendar_id: CalendarId,
    extractor: Extractor,
    config: EngineConfig,
    /// Per-thread serialization locks, keyed by base thread id.
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        calendar: Arc<dyn CalendarProvider>,
        calendar_id: CalendarId,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            calendar,
            calendar_id,
            extractor: Extractor::new(),
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Process one inbound message and produce the reply to send.
    ///
    /// Exactly one reply event comes back per processed message; a retried
    /// duplicate replays the reply recorded on the first processing instead
    /// of negotiating twice.
    pub async fn handle_message(&self, message: &InboundMessage) -> EngineResult<ReplyEvent> {
        let never = AtomicBool::new(false);
        self.handle_message_with_cancel(message, &never).await
    }

    /// Like [`handle_message`](Self::handle_message), but abandons the
    /// message if `cancel` is set before the session would be persisted.
    /// A cancelled message leaves no trace: no state change, no reply.
    pub async fn handle_message_with_cancel(
        &self,
        message: &InboundMessage,
        cancel: &AtomicBool,
    ) -> EngineResult<ReplyEvent> {
        let lock = self.thread_lock(&message.thread_id);
        let outcome = {
            let _guard = lock.lock().await;
            self.process(message, cancel).await
        };
        drop(lock);
        self.release_thread_lock(message.thread_id.base());
        outcome
    }

    async fn process(
        &self,
        message: &InboundMessage,
        cancel: &AtomicBool,
    ) -> EngineResult<ReplyEvent> {
        let mut session = match self.active_session(message).await? {
            Resolved::Session(session) => session,
            // Idempotent retries: replay the recorded reply without
            // reprocessing, even when the session has since closed.
            Resolved::Replay(event) => return Ok(event),
        };
        let thread = session.thread_id.clone();
        let fingerprint =
            message_fingerprint(thread.value(), &message.body_text, message.received_at);

        let extraction =
            self.extractor
                .extract(&message.body_text, message.recipient_timezone_hint.as_deref(),
                    message.received_at, &self.config);
        let tz = self.reply_timezone(message);

        let draft = self
            .decide(&mut session, message, &extraction, tz)
            .await?;

        // Calendar outages leave the session untouched so a retry gets a
        // full reprocessing once the backend recovers.
        if draft.kind == ReplyKind::CalendarUnavailable {
            let rendered = composer::compose(&draft, &message.sender_address, tz, extraction.intent);
            return Ok(ReplyEvent {
                thread_id: thread,
                kind: draft.kind,
                rendered_body: rendered,
                draft,
            });
        }

        let rendered = composer::compose(&draft, &message.sender_address, tz, extraction.intent);
        session.record_fingerprint(fingerprint);
        session.last_reply = Some(draft.clone());
        session.last_reply_body = Some(rendered.clone());

        if cancel.load(Ordering::SeqCst) {
            info!("cancelled before persist, discarding work on {}", thread);
            return Err(EngineError::Cancelled(thread.value().to_string()));
        }
        self.store.save(&session).await?;

        info!(
            "thread {}: {:?} reply, session now {:?}",
            thread, draft.kind, session.state
        );
        Ok(ReplyEvent {
            thread_id: thread,
            kind: draft.kind,
            rendered_body: rendered,
            draft,
        })
    }

    /// Expire sessions idle longer than the configured expiry.
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of sessions transitioned to `Expired`
    pub async fn expire_stale(&self, now: DateTime<Utc>) -> EngineResult<usize> {
        let cutoff = now - self.config.session_expiry();
        Ok(self.store.expire_stale(cutoff).await?)
    }

    /// Run the decision pipeline, mutating `session` to its next state and
    /// returning the reply payload.
    async fn decide(
        &self,
        session: &mut NegotiationSession,
        message: &InboundMessage,
        extraction: &Extraction,
        tz: Tz,
    ) -> EngineResult<ReplyDraft> {
        let thread = session.thread_id.clone();
        let now = message.received_at;
        session.record_proposals(extraction.proposals.iter().cloned(), now);

        if extraction.intent == Intent::Cancel {
            session.decline(now)?;
            return Ok(ReplyDraft::new(ReplyKind::Decline, thread));
        }

        // An acceptance of a slot we already offered closes the negotiation
        // without touching the calendar again.
        if extraction.intent == Intent::Confirm {
            if let Some(slot) = self.accepted_offer(session, &extraction.proposals) {
                session.confirm(slot.clone(), now)?;
                return Ok(ReplyDraft::new(ReplyKind::Confirm, thread).with_slot(slot));
            }
        }

        // Any under-specified proposal halts the turn with a question; the
        // ambiguous span is quoted back for disambiguation.
        let ambiguous = extraction
            .proposals
            .iter()
            .find(|p| p.confidence < self.config.clarify_confidence_threshold);
        if extraction.proposals.is_empty() || ambiguous.is_some() {
            let mut draft = ReplyDraft::new(ReplyKind::Clarify, thread);
            if let Some(p) = ambiguous {
                draft = draft.with_clarify_span(p.raw_span.clone());
            }
            return Ok(draft);
        }

        let duration = extraction
            .proposals
            .iter()
            .find_map(|p| p.duration_minutes)
            .map(Duration::minutes)
            .unwrap_or_else(|| self.config.default_duration());
        let proposal_windows: Vec<TimeWindow> =
            extraction.proposals.iter().filter_map(|p| p.window).collect();
        let same_day = self.same_day_windows(&proposal_windows, tz);
        let next_week = self.next_week_windows(now, tz);

        let horizon = match query_horizon(
            &proposal_windows,
            &same_day,
            &next_week,
            self.config.buffer(),
        ) {
            Some(h) => h,
            None => {
                let mut draft = ReplyDraft::new(ReplyKind::Clarify, thread);
                if let Some(p) = extraction.proposals.first() {
                    draft = draft.with_clarify_span(p.raw_span.clone());
                }
                return Ok(draft);
            }
        };
        let busy = match self.query_busy_with_retry(&horizon).await {
            Ok(busy) => busy,
            Err(err) => {
                warn!("calendar unavailable for {}: {}", thread, err);
                return Ok(ReplyDraft::new(ReplyKind::CalendarUnavailable, thread));
            }
        };

        let buffer = self.config.buffer();
        let mut slots =
            intersect::feasible_slots_in_windows(&proposal_windows, &busy, duration, buffer);
        if slots.is_empty() {
            debug!("no feasible slot in proposed windows, widening same-day");
            slots = intersect::feasible_slots_in_windows(&same_day, &busy, duration, buffer);
        }
        if slots.is_empty() {
            debug!("no feasible slot same-day, widening to next business week");
            slots = intersect::feasible_slots_in_windows(&next_week, &busy, duration, buffer);
        }

        let ranked = ranking::rank(slots, extraction.preference, tz);
        let selected = ranking::select(&ranked, duration, self.config.max_alternatives);

        if let Some(best) = selected.first() {
            let tolerance = self.config.confirm_tolerance();
            let accepts_proposal = proposal_windows
                .iter()
                .any(|w| (w.start() - best.window.start()).abs() <= tolerance);
            if accepts_proposal {
                session.confirm(best.clone(), now)?;
                return Ok(ReplyDraft::new(ReplyKind::Confirm, thread).with_slot(best.clone()));
            }
        }

        if session.counter_rounds < self.config.max_counter_rounds {
            session.counter(selected.clone(), now)?;
            let mut draft =
                ReplyDraft::new(ReplyKind::Counter, thread).with_alternatives(selected.clone());
            if let Some(best) = selected.first() {
                draft = draft.with_slot(best.clone());
            }
            return Ok(draft);
        }

        session.decline(now)?;
        Ok(ReplyDraft::new(ReplyKind::Decline, thread))
    }

    /// Session the message belongs to. Terminal sessions stay closed; a late
    /// message on a finished thread gets a fresh sub-session instead. A
    /// duplicate found anywhere along the sub-session chain short-circuits
    /// into a replay of the reply recorded for it.
    async fn active_session(&self, message: &InboundMessage) -> EngineResult<Resolved> {
        let mut candidate = message.thread_id.clone();
        let mut suffix = 0u32;
        loop {
            match self.store.load(&candidate).await? {
                Some(session) => {
                    let fingerprint = message_fingerprint(
                        candidate.value(),
                        &message.body_text,
                        message.received_at,
                    );
                    if session.has_fingerprint(&fingerprint) {
                        if let (Some(draft), Some(body)) =
                            (&session.last_reply, &session.last_reply_body)
                        {
                            info!("replaying cached reply for duplicate message on {}", candidate);
                            return Ok(Resolved::Replay(ReplyEvent {
                                thread_id: candidate.clone(),
                                kind: draft.kind,
                                rendered_body: body.clone(),
                                draft: draft.clone(),
                            }));
                        }
                    }
                    if session.is_terminal() {
                        suffix += 1;
                        warn!(
                            "thread {} is {:?}, redirecting to sub-session {}",
                            candidate,
                            session.state,
                            message.thread_id.sub(suffix)
                        );
                        candidate = message.thread_id.sub(suffix);
                    } else {
                        return Ok(Resolved::Session(session));
                    }
                }
                None => {
                    return Ok(Resolved::Session(NegotiationSession::new(
                        candidate,
                        message.received_at,
                    )))
                }
            }
        }
    }

    /// Offered slot the sender is accepting, if their message pins one down.
    fn accepted_offer(
        &self,
        session: &NegotiationSession,
        proposals: &[CandidateProposal],
    ) -> Option<FeasibleSlot> {
        let tolerance = self.config.confirm_tolerance();
        for proposal in proposals {
            if let Some(window) = proposal.window {
                if let Some(slot) = session.matching_offer(window.start(), tolerance) {
                    return Some(slot.clone());
                }
            }
        }
        // A bare "sounds good" with no time accepts the best slot of the
        // last counter reply.
        if proposals.iter().all(|p| p.window.is_none()) {
            if let Some(last) = &session.last_reply {
                if last.kind == ReplyKind::Counter {
                    return last.slot.clone();
                }
            }
        }
        None
    }

    /// Forward-only widening within each proposal's local day: from the
    /// proposed start to the end of working hours.
    fn same_day_windows(&self, proposals: &[TimeWindow], tz: Tz) -> Vec<TimeWindow> {
        let mut windows = Vec::new();
        for proposal in proposals {
            let day = proposal.start().with_timezone(&tz).date_naive();
            let hours = timezone::working_hours_window(
                day,
                self.config.working_hours_start,
                self.config.working_hours_end,
                tz,
            );
            if let Ok(hours) = hours {
                let start = proposal.start().max(hours.start());
                if let Ok(w) = TimeWindow::new(start, hours.end()) {
                    windows.push(w);
                }
            }
        }
        windows
    }

    /// Working-hours windows for Monday through Friday of the week after
    /// `reference`.
    fn next_week_windows(&self, reference: DateTime<Utc>, tz: Tz) -> Vec<TimeWindow> {
        use chrono::Datelike;
        let today = reference.with_timezone(&tz).date_naive();
        // 1..=7 days ahead: a Monday reference points at next Monday
        let ahead = 7 - today.weekday().num_days_from_monday() as i64;
        let monday = today + Duration::days(ahead);
        (0..5)
            .filter_map(|offset| {
                timezone::working_hours_window(
                    monday + Duration::days(offset),
                    self.config.working_hours_start,
                    self.config.working_hours_end,
                    tz,
                )
                .ok()
            })
            .collect()
    }

    /// Query busy intervals with timeout and exponential backoff.
    async fn query_busy_with_retry(
        &self,
        window: &TimeWindow,
    ) -> Result<Vec<BusyInterval>, EngineError> {
        let timeout = std::time::Duration::from_secs(self.config.calendar_timeout_secs);
        let mut delay = std::time::Duration::from_millis(self.config.calendar_retry_delay_ms);
        let mut last_err = None;
        for attempt in 0..=self.config.calendar_max_retries {
            if attempt > 0 {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            match tokio::time::timeout(timeout, self.calendar.query_busy(window, &self.calendar_id))
                .await
            {
                Ok(Ok(busy)) => return Ok(busy),
                Ok(Err(err)) => {
                    debug!("calendar attempt {} failed: {}", attempt + 1, err);
                    last_err = Some(EngineError::Calendar(err));
                }
                Err(_) => {
                    debug!("calendar attempt {} timed out", attempt + 1);
                    last_err = Some(EngineError::Calendar(
                        crate::calendar::CalendarError::Unavailable(format!(
                            "timed out after {:?}",
                            timeout
                        )),
                    ));
                }
            }
        }
        Err(last_err.unwrap_or(EngineError::Calendar(
            crate::calendar::CalendarError::Unavailable("no attempts made".to_string()),
        )))
    }

    fn reply_timezone(&self, message: &InboundMessage) -> Tz {
        message
            .recipient_timezone_hint
            .as_deref()
            .and_then(|hint| timezone::resolve_zone(hint).ok())
            .or_else(|| timezone::resolve_zone(&self.config.default_timezone).ok())
            .unwrap_or(chrono_tz::UTC)
    }

    fn thread_lock(&self, thread_id: &ThreadId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        locks
            .entry(thread_id.base().to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Drop a thread's lock entry once no message holds a handle to it.
    /// Keeps the registry bounded by the number of threads in flight rather
    /// than every thread ever seen. The strong count check is race-free:
    /// `thread_lock` hands out clones only while holding the same map mutex.
    fn release_thread_lock(&self, base: &str) {
        let mut locks = self.locks.lock();
        if let Some(entry) = locks.get(base) {
            if Arc::strong_count(entry) == 1 {
                locks.remove(base);
            }
        }
    }
}

#[cfg(all(test, feature = "local-store"))]
#[path = "orchestrator_tests.rs"]
mod orchestrator_tests;

/// Single calendar query span covering every candidate window, padded by the
/// buffer on both sides.
fn query_horizon(
    proposals: &[TimeWindow],
    same_day: &[TimeWindow],
    next_week: &[TimeWindow],
    buffer: Duration,
) -> Option<TimeWindow> {
    proposals
        .iter()
        .chain(same_day)
        .chain(next_week)
        .copied()
        .reduce(|acc, w| acc.span(&w))
        .map(|w| w.expand(buffer))
}
