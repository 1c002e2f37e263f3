//! Engine configuration
//!
//! Loaded from the `[engine]` table of a TOML file, or built in code with the
//! `with_*` builders. Unknown tables (e.g. `[http]`) are ignored here.

use crate::error::AttendanceError;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of history entries considered per student
pub const DEFAULT_HISTORY_WINDOW: usize = 100;

/// Default per-operation timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Attendance engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Most-recent history entries used for the absence rate
    pub history_window: usize,
    /// Timeout applied to each individual remote call
    pub request_timeout_secs: u64,
    /// Upper bound on concurrently dispatched calls (`None` = unbounded)
    pub max_in_flight: Option<usize>,
    /// Wall-clock offset used to render session times (`None` = timestamp's own)
    pub display_offset_minutes: Option<i32>,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With history window
    #[inline]
    #[must_use]
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    /// With per-request timeout
    #[inline]
    #[must_use]
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// With bounded fan-out
    #[inline]
    #[must_use]
    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = Some(max);
        self
    }

    /// With fixed display offset
    #[inline]
    #[must_use]
    pub fn with_display_offset_minutes(mut self, minutes: i32) -> Self {
        self.display_offset_minutes = Some(minutes);
        self
    }

    /// Per-request timeout as a `Duration`
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Display offset, if configured and in range
    #[inline]
    #[must_use]
    pub fn display_offset(&self) -> Option<FixedOffset> {
        self.display_offset_minutes
            .and_then(|minutes| FixedOffset::east_opt(minutes.checked_mul(60)?))
    }

    /// Check invariants
    ///
    /// # Errors
    /// `AttendanceError::Config` naming the first invalid field.
    pub fn validate(&self) -> Result<(), AttendanceError> {
        if self.history_window == 0 {
            return Err(AttendanceError::Config(
                "history_window must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(AttendanceError::Config(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.max_in_flight == Some(0) {
            return Err(AttendanceError::Config(
                "max_in_flight must be at least 1 when set".to_string(),
            ));
        }
        if self.display_offset_minutes.is_some() && self.display_offset().is_none() {
            return Err(AttendanceError::Config(format!(
                "display_offset_minutes out of range: {:?}",
                self.display_offset_minutes
            )));
        }
        Ok(())
    }

    /// Parse and validate the `[engine]` table of a TOML document
    ///
    /// # Errors
    /// `AttendanceError::Config` on syntax errors or invalid values.
    pub fn from_toml_str(source: &str) -> Result<Self, AttendanceError> {
        #[derive(Deserialize)]
        struct Document {
            #[serde(default)]
            engine: EngineConfig,
        }

        let doc: Document =
            toml::from_str(source).map_err(|e| AttendanceError::Config(e.to_string()))?;
        doc.engine.validate()?;
        Ok(doc.engine)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_window: DEFAULT_HISTORY_WINDOW,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_in_flight: None,
            display_offset_minutes: None,
        }
    }
}
