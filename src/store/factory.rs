//! Store factory for dependency injection.

use std::str::FromStr;
use std::sync::Arc;

#[cfg(feature = "local-store")]
use super::InMemorySessionStore;
#[cfg(not(feature = "local-store"))]
use super::StoreError;
use super::{SessionStore, StoreResult};

/// Session store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreType {
    /// Process-local in-memory store
    Memory,
}

impl FromStr for StoreType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "mem" | "local" => Ok(Self::Memory),
            _ => Err(format!("Unknown store type: {}", s)),
        }
    }
}

impl StoreType {
    /// Get store type from the `SESSION_STORE` environment variable,
    /// defaulting to the in-memory backend.
    pub fn from_env() -> Self {
        std::env::var("SESSION_STORE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Self::Memory)
    }
}

/// Factory for creating session store instances.
pub struct StoreFactory;

impl StoreFactory {
    /// Create a store instance based on type.
    ///
    /// # Returns
    /// * `Ok(Arc<dyn SessionStore>)` - Boxed store instance
    /// * `Err(StoreError)` - If the backend feature is not enabled
    pub fn create(store_type: StoreType) -> StoreResult<Arc<dyn SessionStore>> {
        match store_type {
            StoreType::Memory => {
                #[cfg(feature = "local-store")]
                {
                    Ok(Arc::new(InMemorySessionStore::new()))
                }
                #[cfg(not(feature = "local-store"))]
                {
                    Err(StoreError::ConfigurationError(
                        "in-memory store requires the local-store feature".to_string(),
                    ))
                }
            }
        }
    }
}
