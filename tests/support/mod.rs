#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};
use sched_helper::api::{InboundMessage, ThreadId};
use sched_helper::models::proposal::BusyInterval;
use sched_helper::models::time::TimeWindow;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// This is panic-safe (restores variables on unwind) and also serializes access to
/// process-global env vars to avoid flaky tests when Rust runs tests in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().expect("ENV_LOCK poisoned");
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

/// Friday 2025-07-11 12:00 UTC, the reference instant most fixtures use.
pub fn friday_noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 11, 12, 0, 0).unwrap()
}

/// Inbound message fixture with a New York timezone hint.
pub fn message(thread: &str, body: &str, received_at: DateTime<Utc>) -> InboundMessage {
    InboundMessage {
        thread_id: ThreadId::new(thread),
        sender_address: "jane.doe@example.com".to_string(),
        recipient_timezone_hint: Some("America/New_York".to_string()),
        body_text: body.to_string(),
        received_at,
    }
}

/// Busy interval on the primary calendar.
pub fn busy(start: DateTime<Utc>, minutes: i64) -> BusyInterval {
    BusyInterval {
        window: TimeWindow::from_start(start, Duration::minutes(minutes)).unwrap(),
        source: "primary".to_string(),
    }
}
