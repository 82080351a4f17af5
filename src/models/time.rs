use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Half-open UTC time interval `[start, end)`.
///
/// Every window that crosses the timezone normalizer is absolute UTC;
/// nothing downstream reasons in local time. The `start < end` invariant
/// is enforced at construction and the fields are immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// Error returned when a window would be empty or inverted.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid time window: start {start} is not before end {end}")]
pub struct InvalidTimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a new window.
    ///
    /// # Returns
    /// * `Ok(TimeWindow)` if `start < end`
    /// * `Err(InvalidTimeWindow)` otherwise
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, InvalidTimeWindow> {
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(InvalidTimeWindow { start, end })
        }
    }

    /// Window starting at `start` and lasting `duration`.
    pub fn from_start(start: DateTime<Utc>, duration: Duration) -> Result<Self, InvalidTimeWindow> {
        Self::new(start, start + duration)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// True when the two half-open intervals share at least one instant.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True when `other` lies entirely inside this window.
    pub fn contains(&self, other: &TimeWindow) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn contains_instant(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Overlapping portion of the two windows, if any.
    pub fn intersect(&self, other: &TimeWindow) -> Option<TimeWindow> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        TimeWindow::new(start, end).ok()
    }

    /// Window grown by `margin` on both sides.
    pub fn expand(&self, margin: Duration) -> TimeWindow {
        TimeWindow {
            start: self.start - margin,
            end: self.end + margin,
        }
    }

    /// Smallest window covering both inputs.
    pub fn span(&self, other: &TimeWindow) -> TimeWindow {
        TimeWindow {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 15, h, m, 0).unwrap()
    }

    fn win(start_h: u32, start_m: u32, end_h: u32, end_m: u32) -> TimeWindow {
        TimeWindow::new(utc(start_h, start_m), utc(end_h, end_m)).unwrap()
    }

    #[test]
    fn test_new_rejects_inverted_window() {
        assert!(TimeWindow::new(utc(15, 0), utc(14, 0)).is_err());
    }

    #[test]
    fn test_new_rejects_empty_window() {
        assert!(TimeWindow::new(utc(14, 0), utc(14, 0)).is_err());
    }

    #[test]
    fn test_from_start() {
        let w = TimeWindow::from_start(utc(14, 0), Duration::minutes(30)).unwrap();
        assert_eq!(w.end(), utc(14, 30));
        assert_eq!(w.duration(), Duration::minutes(30));
    }

    #[test]
    fn test_overlaps() {
        assert!(win(14, 0, 15, 0).overlaps(&win(14, 30, 15, 30)));
        assert!(!win(14, 0, 15, 0).overlaps(&win(15, 0, 16, 0)));
        assert!(!win(14, 0, 15, 0).overlaps(&win(12, 0, 13, 0)));
    }

    #[test]
    fn test_contains() {
        assert!(win(14, 0, 16, 0).contains(&win(14, 30, 15, 0)));
        assert!(win(14, 0, 16, 0).contains(&win(14, 0, 16, 0)));
        assert!(!win(14, 0, 16, 0).contains(&win(15, 30, 16, 30)));
    }

    #[test]
    fn test_contains_instant_half_open() {
        let w = win(14, 0, 15, 0);
        assert!(w.contains_instant(utc(14, 0)));
        assert!(!w.contains_instant(utc(15, 0)));
    }

    #[test]
    fn test_intersect() {
        let i = win(14, 0, 15, 0).intersect(&win(14, 30, 15, 30)).unwrap();
        assert_eq!(i.start(), utc(14, 30));
        assert_eq!(i.end(), utc(15, 0));
        assert!(win(14, 0, 15, 0).intersect(&win(15, 0, 16, 0)).is_none());
    }

    #[test]
    fn test_expand() {
        let w = win(14, 0, 15, 0).expand(Duration::minutes(15));
        assert_eq!(w.start(), utc(13, 45));
        assert_eq!(w.end(), utc(15, 15));
    }

    #[test]
    fn test_span() {
        let s = win(14, 0, 15, 0).span(&win(16, 0, 17, 0));
        assert_eq!(s.start(), utc(14, 0));
        assert_eq!(s.end(), utc(17, 0));
    }
}
