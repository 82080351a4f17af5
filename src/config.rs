//! Engine configuration.
//!
//! All negotiation policy constants (round limits, buffers, working hours,
//! retry settings) live here explicitly rather than being inferred at call
//! sites. Configuration can come from defaults, environment variables or a
//! TOML file.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Error loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(String),
    #[error("failed to parse config file: {0}")]
    Parse(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Negotiation policy and resource limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Timezone assumed when neither the email nor the message metadata
    /// names one.
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    /// Local hour meetings may start at, inclusive.
    #[serde(default = "default_working_hours_start")]
    pub working_hours_start: u32,
    /// Local hour meetings must end by, exclusive.
    #[serde(default = "default_working_hours_end")]
    pub working_hours_end: u32,
    /// Minimum gap kept before and after existing events, minutes.
    #[serde(default = "default_buffer_minutes")]
    pub buffer_minutes: i64,
    /// Meeting length assumed when the email does not state one, minutes.
    #[serde(default = "default_duration_minutes")]
    pub default_duration_minutes: i64,
    /// Proposals below this confidence trigger a clarification reply.
    #[serde(default = "default_clarify_threshold")]
    pub clarify_confidence_threshold: f64,
    /// Counter-offer rounds permitted before declining.
    #[serde(default = "default_max_counter_rounds")]
    pub max_counter_rounds: u32,
    /// Alternative slots presented in a counter reply.
    #[serde(default = "default_max_alternatives")]
    pub max_alternatives: usize,
    /// Slack allowed when matching an acceptance against an offered slot,
    /// minutes.
    #[serde(default = "default_confirm_tolerance_minutes")]
    pub confirm_tolerance_minutes: i64,
    /// Sessions idle longer than this are expired, days.
    #[serde(default = "default_session_expiry_days")]
    pub session_expiry_days: i64,
    /// Upper bound on a single calendar backend call, seconds.
    #[serde(default = "default_calendar_timeout_secs")]
    pub calendar_timeout_secs: u64,
    /// Transient calendar failures retried this many times.
    #[serde(default = "default_calendar_max_retries")]
    pub calendar_max_retries: u32,
    /// Base retry delay, doubled per attempt, milliseconds.
    #[serde(default = "default_calendar_retry_delay_ms")]
    pub calendar_retry_delay_ms: u64,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_working_hours_start() -> u32 {
    9
}

fn default_working_hours_end() -> u32 {
    18
}

fn default_buffer_minutes() -> i64 {
    15
}

fn default_duration_minutes() -> i64 {
    30
}

fn default_clarify_threshold() -> f64 {
    0.5
}

fn default_max_counter_rounds() -> u32 {
    3
}

fn default_max_alternatives() -> usize {
    3
}

fn default_confirm_tolerance_minutes() -> i64 {
    0
}

fn default_session_expiry_days() -> i64 {
    14
}

fn default_calendar_timeout_secs() -> u64 {
    10
}

fn default_calendar_max_retries() -> u32 {
    3
}

fn default_calendar_retry_delay_ms() -> u64 {
    250
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timezone: default_timezone(),
            working_hours_start: default_working_hours_start(),
            working_hours_end: default_working_hours_end(),
            buffer_minutes: default_buffer_minutes(),
            default_duration_minutes: default_duration_minutes(),
            clarify_confidence_threshold: default_clarify_threshold(),
            max_counter_rounds: default_max_counter_rounds(),
            max_alternatives: default_max_alternatives(),
            confirm_tolerance_minutes: default_confirm_tolerance_minutes(),
            session_expiry_days: default_session_expiry_days(),
            calendar_timeout_secs: default_calendar_timeout_secs(),
            calendar_max_retries: default_calendar_max_retries(),
            calendar_retry_delay_ms: default_calendar_retry_delay_ms(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(EngineConfig)` if successful
    /// * `Err(ConfigError)` if the file cannot be read, parsed or validated
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: EngineConfig =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// Recognized variables: `DEFAULT_TIMEZONE` plus `SCHED_*` overrides
    /// for each policy field (`SCHED_BUFFER_MINUTES`,
    /// `SCHED_MAX_COUNTER_ROUNDS`, ...).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = EngineConfig::default();
        if let Ok(tz) = std::env::var("DEFAULT_TIMEZONE") {
            config.default_timezone = tz;
        }
        read_env("SCHED_WORKING_HOURS_START", &mut config.working_hours_start)?;
        read_env("SCHED_WORKING_HOURS_END", &mut config.working_hours_end)?;
        read_env("SCHED_BUFFER_MINUTES", &mut config.buffer_minutes)?;
        read_env(
            "SCHED_DEFAULT_DURATION_MINUTES",
            &mut config.default_duration_minutes,
        )?;
        read_env(
            "SCHED_CLARIFY_CONFIDENCE_THRESHOLD",
            &mut config.clarify_confidence_threshold,
        )?;
        read_env("SCHED_MAX_COUNTER_ROUNDS", &mut config.max_counter_rounds)?;
        read_env("SCHED_MAX_ALTERNATIVES", &mut config.max_alternatives)?;
        read_env(
            "SCHED_CONFIRM_TOLERANCE_MINUTES",
            &mut config.confirm_tolerance_minutes,
        )?;
        read_env("SCHED_SESSION_EXPIRY_DAYS", &mut config.session_expiry_days)?;
        read_env("SCHED_CALENDAR_TIMEOUT_SECS", &mut config.calendar_timeout_secs)?;
        read_env("SCHED_CALENDAR_MAX_RETRIES", &mut config.calendar_max_retries)?;
        read_env(
            "SCHED_CALENDAR_RETRY_DELAY_MS",
            &mut config.calendar_retry_delay_ms,
        )?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.working_hours_start >= self.working_hours_end || self.working_hours_end > 24 {
            return Err(ConfigError::Invalid(format!(
                "working hours {}..{} are not a valid local range",
                self.working_hours_start, self.working_hours_end
            )));
        }
        if !(0.0..=1.0).contains(&self.clarify_confidence_threshold) {
            return Err(ConfigError::Invalid(format!(
                "clarify_confidence_threshold {} outside [0, 1]",
                self.clarify_confidence_threshold
            )));
        }
        if self.default_duration_minutes <= 0 {
            return Err(ConfigError::Invalid(
                "default_duration_minutes must be positive".to_string(),
            ));
        }
        if self.buffer_minutes < 0 {
            return Err(ConfigError::Invalid(
                "buffer_minutes must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn buffer(&self) -> Duration {
        Duration::minutes(self.buffer_minutes)
    }

    pub fn default_duration(&self) -> Duration {
        Duration::minutes(self.default_duration_minutes)
    }

    pub fn confirm_tolerance(&self) -> Duration {
        Duration::minutes(self.confirm_tolerance_minutes)
    }

    pub fn session_expiry(&self) -> Duration {
        Duration::days(self.session_expiry_days)
    }
}

fn read_env<T: FromStr>(key: &str, target: &mut T) -> Result<(), ConfigError> {
    if let Ok(raw) = std::env::var(key) {
        *target = raw
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("cannot parse {} value {:?}", key, raw)))?;
    }
    Ok(())
}
