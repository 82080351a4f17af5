//! In-memory session store for unit testing and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use parking_lot::RwLock;

use super::{ErrorContext, SessionStore, StoreError, StoreResult};
use crate::api::ThreadId;
use crate::models::session::NegotiationSession;

/// HashMap-backed store. Read-your-writes holds trivially: all operations
/// go through one process-local map.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, NegotiationSession>>,
    /// Remaining operations that fail before the backend "recovers".
    fail_remaining: RwLock<u32>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions currently held, terminal ones included.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Make the next `n` operations fail with a retryable backend error.
    pub fn fail_next(&self, n: u32) {
        *self.fail_remaining.write() = n;
    }

    fn check_injected_failure(
        &self,
        operation: &str,
        thread_id: Option<&str>,
    ) -> StoreResult<()> {
        let mut remaining = self.fail_remaining.write();
        if *remaining == 0 {
            return Ok(());
        }
        *remaining -= 1;
        let mut context = ErrorContext::new(operation)
            .with_details("injected failure")
            .retryable();
        if let Some(id) = thread_id {
            context = context.with_thread_id(id);
        }
        Err(StoreError::BackendError {
            message: "session store unavailable".to_string(),
            context,
        })
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, thread_id: &ThreadId) -> StoreResult<Option<NegotiationSession>> {
        self.check_injected_failure("load", Some(thread_id.value()))?;
        Ok(self.sessions.read().get(thread_id.value()).cloned())
    }

    async fn save(&self, session: &NegotiationSession) -> StoreResult<()> {
        self.check_injected_failure("save", Some(session.thread_id.value()))?;
        self.sessions
            .write()
            .insert(session.thread_id.value().to_string(), session.clone());
        Ok(())
    }

    async fn expire_stale(&self, before: DateTime<Utc>) -> StoreResult<usize> {
        self.check_injected_failure("expire_stale", None)?;
        let mut sessions = self.sessions.write();
        let mut expired = 0;
        for session in sessions.values_mut() {
            if !session.is_terminal() && session.last_updated < before {
                // Transition is infallible from any non-terminal state.
                if session.expire(before).is_ok() {
                    expired += 1;
                }
            }
        }
        if expired > 0 {
            debug!("expired {} stale session(s)", expired);
        }
        Ok(expired)
    }
}
