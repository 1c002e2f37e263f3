//! Core types for Rollcall
//!
//! Defines the value-shaped entities the attendance workflow passes around:
//! - Session and student identifiers
//! - Canonical attendance and lifecycle statuses
//! - Attendance marks, summaries, and history entries
//! - The display-ready lesson descriptor

use crate::error::AttendanceError;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Identifier of one class meeting instance
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Create new session ID
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifier of one student
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub String);

impl StudentId {
    /// Create new student ID
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StudentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StudentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Canonical attendance status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    /// Attended on time
    Present,
    /// Attended, arrived late
    Late,
    /// Did not attend
    Absent,
    /// No information yet
    #[default]
    Unmarked,
}

impl AttendanceStatus {
    /// All canonical values
    pub const ALL: [AttendanceStatus; 4] = [
        AttendanceStatus::Present,
        AttendanceStatus::Late,
        AttendanceStatus::Absent,
        AttendanceStatus::Unmarked,
    ];

    /// Check if a status has been set
    #[inline]
    #[must_use]
    pub fn is_marked(self) -> bool {
        !matches!(self, AttendanceStatus::Unmarked)
    }

    /// Check if the status counts towards the present-equivalent total
    #[inline]
    #[must_use]
    pub fn is_present_equivalent(self) -> bool {
        matches!(self, AttendanceStatus::Present | AttendanceStatus::Late)
    }

    /// Lowercase canonical name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Unmarked => "unmarked",
        }
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a class session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Planned, not held yet
    Scheduled,
    /// Held
    Completed,
    /// Called off
    Cancelled,
    /// Replacement for a missed session
    Makeup,
}

impl SessionStatus {
    /// Decode a lifecycle status, case-insensitively
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Some(SessionStatus::Scheduled),
            "completed" => Some(SessionStatus::Completed),
            "cancelled" | "canceled" => Some(SessionStatus::Cancelled),
            "makeup" | "make_up" | "make-up" => Some(SessionStatus::Makeup),
            _ => None,
        }
    }
}

/// One student's attendance state for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceMark {
    /// Student identifier
    pub student_id: StudentId,
    /// Display name, when the roster supplies one
    #[serde(default)]
    pub student_name: Option<String>,
    /// Canonical status
    #[serde(default)]
    pub status: AttendanceStatus,
    /// Free-text note
    #[serde(default)]
    pub note: String,
    /// Trailing absence rate in [0, 1]
    #[serde(default)]
    pub absence_rate: f64,
}

impl AttendanceMark {
    /// Create an empty mark for a student
    #[inline]
    #[must_use]
    pub fn new(student_id: StudentId) -> Self {
        Self {
            student_id,
            student_name: None,
            status: AttendanceStatus::Unmarked,
            note: String::new(),
            absence_rate: 0.0,
        }
    }

    /// With display name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.student_name = Some(name.into());
        self
    }

    /// With status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: AttendanceStatus) -> Self {
        self.status = status;
        self
    }

    /// With note
    #[inline]
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// With absence rate (clamped to [0, 1])
    #[inline]
    #[must_use]
    pub fn with_absence_rate(mut self, rate: f64) -> Self {
        self.absence_rate = if rate.is_finite() { rate.clamp(0.0, 1.0) } else { 0.0 };
        self
    }

    /// Set the status from the caller side.
    ///
    /// # Errors
    /// `AttendanceError::InvalidTransition` when clearing an already-set status.
    pub fn set_status(&mut self, status: AttendanceStatus) -> Result<(), AttendanceError> {
        if self.status.is_marked() && !status.is_marked() {
            return Err(AttendanceError::InvalidTransition {
                student_id: self.student_id.clone(),
                from: self.status,
                to: status,
            });
        }
        self.status = status;
        Ok(())
    }

    /// Replace the note
    #[inline]
    pub fn set_note(&mut self, note: impl Into<String>) {
        self.note = note.into();
    }

    /// Note with surrounding whitespace removed, `None` when blank
    #[inline]
    #[must_use]
    pub fn trimmed_note(&self) -> Option<&str> {
        let note = self.note.trim();
        (!note.is_empty()).then_some(note)
    }

    /// A mark is dirty once it carries a status or a non-blank note
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.status.is_marked() || self.trimmed_note().is_some()
    }
}

/// Aggregate counts for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    /// Roster size
    pub total: usize,
    /// Present plus late
    pub present_equivalent: usize,
    /// Absent
    pub absent: usize,
    /// Not marked yet
    pub not_marked: usize,
}

/// One past attendance outcome for a student
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Recorded status
    pub status: AttendanceStatus,
}

/// Half-open display window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Wall-clock start
    pub start: NaiveDateTime,
    /// Wall-clock end
    pub end: NaiveDateTime,
}

impl TimeWindow {
    /// Window starting at `start` lasting `minutes`
    #[inline]
    #[must_use]
    pub fn starting_at(start: NaiveDateTime, minutes: u32) -> Self {
        Self {
            start,
            end: start + Duration::minutes(i64::from(minutes)),
        }
    }

    /// `HH:MM–HH:MM`
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}–{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

/// Display-ready projection of a class session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonDescriptor {
    /// Session identifier
    pub id: SessionId,
    /// Course/class label
    pub course_label: String,
    /// Lesson title, if any
    pub lesson_label: Option<String>,
    /// Display window; `None` when no valid start time exists
    pub window: Option<TimeWindow>,
    /// Duration in minutes (60 when absent or invalid)
    pub duration_minutes: u32,
    /// `YYYY-MM-DD` or the not-scheduled placeholder
    pub date_label: String,
    /// `HH:MM–HH:MM` or the not-scheduled placeholder
    pub time_label: String,
    /// Room, actual preferred over planned
    pub room: Option<String>,
    /// Teacher, actual preferred over planned
    pub teacher: Option<String>,
    /// Roster size as reported by the session directory
    pub student_count: u32,
    /// Branch
    pub branch: Option<String>,
    /// Lifecycle status, `None` if unknown
    pub status: Option<SessionStatus>,
    /// Participation mode (e.g. offline, online)
    pub participation_mode: Option<String>,
}

impl LessonDescriptor {
    /// Check whether the session has a valid start time
    #[inline]
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.window.is_some()
    }
}
