//! Crate-level error taxonomy.
//!
//! Each pipeline stage keeps its own error type; [`EngineError`] aggregates
//! them at the orchestrator boundary. Only truly fatal conditions surface
//! here; extraction misses, infeasible calendars and invalid transitions
//! are negotiation outcomes, not errors.

use crate::calendar::CalendarError;
use crate::config::ConfigError;
use crate::models::session::InvalidSessionTransition;
use crate::store::StoreError;

/// Top-level engine failure.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("session store error: {0}")]
    Store(#[from] StoreError),

    #[error("calendar error: {0}")]
    Calendar(#[from] CalendarError),

    #[error("session transition error: {0}")]
    Session(#[from] InvalidSessionTransition),

    /// Processing was cancelled before the session was persisted; no reply
    /// was sent and no state changed.
    #[error("processing cancelled for thread {0}")]
    Cancelled(String),
}

/// Result alias used by the orchestrator.
pub type EngineResult<T> = Result<T, EngineError>;
