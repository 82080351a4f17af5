//! Session store abstraction.
//!
//! The engine requires only three operations (load, save, expire) with
//! read-your-writes consistency per thread. Storage technology is an
//! external choice behind the [`SessionStore`] trait; an in-memory backend
//! ships behind the `local-store` feature.

pub mod factory;
#[cfg(feature = "local-store")]
pub mod memory;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::api::ThreadId;
use crate::models::session::NegotiationSession;

#[cfg(feature = "local-store")]
pub use memory::InMemorySessionStore;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Structured context for store errors.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation being performed (e.g. "load", "save", "expire_stale")
    pub operation: Option<String>,
    /// The thread id involved, if applicable
    pub thread_id: Option<String>,
    /// Additional details about the error
    pub details: Option<String>,
    /// Whether this error is retryable
    pub retryable: bool,
}

impl ErrorContext {
    /// Create a new error context with an operation name.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    pub fn with_thread_id(mut self, id: impl ToString) -> Self {
        self.thread_id = Some(id.to_string());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Mark this error as retryable.
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(ref id) = self.thread_id {
            parts.push(format!("thread={}", id));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        if self.retryable {
            parts.push("retryable=true".to_string());
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend connection or I/O failure.
    #[error("Backend error: {message} {context}")]
    BackendError {
        message: String,
        context: ErrorContext,
    },
    /// Configuration or initialization error.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::BackendError { context, .. } => context.retryable,
            StoreError::ConfigurationError(_) => false,
        }
    }
}

/// Persistence contract for negotiation sessions.
///
/// Implementations must provide read-your-writes consistency per
/// `thread_id`: a `load` following a `save` on the same thread observes
/// that save.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the session for a thread, if one exists.
    async fn load(&self, thread_id: &ThreadId) -> StoreResult<Option<NegotiationSession>>;

    /// Persist a session, overwriting any previous version.
    async fn save(&self, session: &NegotiationSession) -> StoreResult<()>;

    /// Expire non-terminal sessions not updated since `before`.
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of sessions transitioned to `Expired`
    async fn expire_stale(&self, before: DateTime<Utc>) -> StoreResult<usize>;
}
