//! Calendar availability adapter contract.
//!
//! The engine only consumes free/busy data; fetching it (Google, Outlook,
//! CalDAV, ...) is an external collaborator implementing
//! [`CalendarProvider`]. A mock backend lives in [`mock`] for tests and
//! local development.

pub mod mock;

use async_trait::async_trait;

use crate::api::CalendarId;
use crate::models::proposal::BusyInterval;
use crate::models::time::TimeWindow;

pub use mock::MockCalendarProvider;

/// Calendar backend failure.
///
/// Treated as transient by the orchestrator: retried with backoff, then
/// surfaced as a calendar-unavailable reply instead of guessing
/// feasibility.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CalendarError {
    #[error("calendar unavailable: {0}")]
    Unavailable(String),
}

/// Free/busy source for a calendar over a query window.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Busy intervals overlapping `window` for `calendar_id`.
    ///
    /// # Returns
    /// * `Ok(Vec<BusyInterval>)` - May be empty
    /// * `Err(CalendarError)` - Timeout, auth or transport failure
    async fn query_busy(
        &self,
        window: &TimeWindow,
        calendar_id: &CalendarId,
    ) -> Result<Vec<BusyInterval>, CalendarError>;
}
