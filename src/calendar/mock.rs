//! In-memory mock calendar backend.
//!
//! Serves configured busy intervals and can inject failures, which is
//! enough to exercise every orchestrator path without a real calendar
//! account.

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{CalendarError, CalendarProvider};
use crate::api::CalendarId;
use crate::models::proposal::BusyInterval;
use crate::models::time::TimeWindow;

#[derive(Default)]
pub struct MockCalendarProvider {
    busy: RwLock<Vec<BusyInterval>>,
    /// Remaining calls that fail before the backend "recovers".
    fail_remaining: RwLock<u32>,
    calls: RwLock<u32>,
}

impl MockCalendarProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_busy(busy: Vec<BusyInterval>) -> Self {
        Self {
            busy: RwLock::new(busy),
            ..Self::default()
        }
    }

    pub fn push_busy(&self, interval: BusyInterval) {
        self.busy.write().push(interval);
    }

    pub fn set_busy(&self, busy: Vec<BusyInterval>) {
        *self.busy.write() = busy;
    }

    /// Make the next `n` calls fail with `CalendarError::Unavailable`.
    pub fn fail_next(&self, n: u32) {
        *self.fail_remaining.write() = n;
    }

    /// Number of `query_busy` calls seen, including failed ones.
    pub fn call_count(&self) -> u32 {
        *self.calls.read()
    }
}

#[async_trait]
impl CalendarProvider for MockCalendarProvider {
    async fn query_busy(
        &self,
        window: &TimeWindow,
        _calendar_id: &CalendarId,
    ) -> Result<Vec<BusyInterval>, CalendarError> {
        *self.calls.write() += 1;
        {
            let mut remaining = self.fail_remaining.write();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(CalendarError::Unavailable(
                    "injected mock failure".to_string(),
                ));
            }
        }
        Ok(self
            .busy
            .read()
            .iter()
            .filter(|b| b.window.overlaps(window))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn window() -> TimeWindow {
        TimeWindow::from_start(
            Utc.with_ymd_and_hms(2025, 7, 15, 14, 0, 0).unwrap(),
            Duration::hours(4),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_returns_overlapping_busy_only() {
        let inside = BusyInterval {
            window: TimeWindow::from_start(
                Utc.with_ymd_and_hms(2025, 7, 15, 15, 0, 0).unwrap(),
                Duration::hours(1),
            )
            .unwrap(),
            source: "primary".to_string(),
        };
        let outside = BusyInterval {
            window: TimeWindow::from_start(
                Utc.with_ymd_and_hms(2025, 7, 16, 9, 0, 0).unwrap(),
                Duration::hours(1),
            )
            .unwrap(),
            source: "primary".to_string(),
        };
        let provider = MockCalendarProvider::with_busy(vec![inside.clone(), outside]);
        let busy = provider
            .query_busy(&window(), &CalendarId::new("primary"))
            .await
            .unwrap();
        assert_eq!(busy, vec![inside]);
    }

    #[tokio::test]
    async fn test_fail_next_then_recover() {
        let provider = MockCalendarProvider::new();
        provider.fail_next(2);
        let id = CalendarId::new("primary");
        assert!(provider.query_busy(&window(), &id).await.is_err());
        assert!(provider.query_busy(&window(), &id).await.is_err());
        assert!(provider.query_busy(&window(), &id).await.is_ok());
        assert_eq!(provider.call_count(), 3);
    }
}
