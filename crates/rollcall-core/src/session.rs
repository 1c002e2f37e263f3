//! Session mapper
//!
//! Projects a raw session descriptor into a `LessonDescriptor`:
//! - actual values preferred over planned ones (time, room, teacher)
//! - the start time is rebuilt from wall-clock components so the rendered
//!   date never drifts across a day boundary
//! - no valid start time renders as the `NOT_SCHEDULED` placeholder
//!
//! Mapping never fails. A record without an identifier yields `None`, which
//! the caller reports as "record not found".

use crate::envelope::{first_i64, first_id, SessionEnvelope};
use crate::types::{LessonDescriptor, SessionId, SessionStatus, TimeWindow};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde_json::{Map, Value};

/// Placeholder for date/time of a session with no valid start
pub const NOT_SCHEDULED: &str = "not scheduled";

/// Duration used when the descriptor has none (or a non-positive one)
pub const DEFAULT_DURATION_MINUTES: u32 = 60;

/// Label used when the descriptor names no course
pub const UNTITLED_COURSE: &str = "Untitled course";

const ACTUAL_TIME_KEYS: &[&str] = &["actualStartTime", "actualDatetime", "actualTime"];
const PLANNED_TIME_KEYS: &[&str] = &["plannedStartTime", "plannedDatetime", "startTime", "scheduledAt"];
const ACTUAL_ROOM_KEYS: &[&str] = &["actualRoom", "actualLocation"];
const PLANNED_ROOM_KEYS: &[&str] = &["plannedRoom", "room", "location"];
const ACTUAL_TEACHER_KEYS: &[&str] = &["actualTeacher", "substituteTeacher"];
const PLANNED_TEACHER_KEYS: &[&str] = &["plannedTeacher", "teacher", "teacherName"];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Raw session descriptor to lesson descriptor
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionMapper {
    display_offset: Option<FixedOffset>,
}

impl SessionMapper {
    /// Create a mapper; `None` renders each timestamp in its own offset
    #[inline]
    #[must_use]
    pub fn new(display_offset: Option<FixedOffset>) -> Self {
        Self { display_offset }
    }

    /// Map a raw detail document (nested or flat)
    #[must_use]
    pub fn map(&self, doc: Value) -> Option<LessonDescriptor> {
        let envelope = SessionEnvelope::decode(doc);
        let record = envelope.into_record()?;
        self.map_record(&record)
    }

    /// Map an already-unwrapped record
    #[must_use]
    pub fn map_record(&self, record: &Map<String, Value>) -> Option<LessonDescriptor> {
        let id = first_id(record, &["id", "sessionId"])?;

        let start = ACTUAL_TIME_KEYS
            .iter()
            .chain(PLANNED_TIME_KEYS)
            .find_map(|key| {
                record
                    .get(*key)
                    .and_then(Value::as_str)
                    .and_then(|raw| parse_wall_clock(raw, self.display_offset))
            });

        let duration_minutes = first_i64(record, &["durationMinutes", "duration"])
            .filter(|minutes| *minutes > 0)
            .and_then(|minutes| u32::try_from(minutes).ok())
            .unwrap_or(DEFAULT_DURATION_MINUTES);

        let window = start.map(|start| TimeWindow::starting_at(start, duration_minutes));
        let (date_label, time_label) = match &window {
            Some(window) => (window.start.format("%Y-%m-%d").to_string(), window.label()),
            None => (NOT_SCHEDULED.to_string(), NOT_SCHEDULED.to_string()),
        };

        let student_count = first_i64(record, &["totalStudents", "studentCount"])
            .and_then(|count| u32::try_from(count).ok())
            .unwrap_or(0);

        Some(LessonDescriptor {
            id: SessionId::new(id),
            course_label: first_name(record, &["className", "courseName", "course", "class"])
                .unwrap_or_else(|| UNTITLED_COURSE.to_string()),
            lesson_label: first_name(record, &["lessonTitle", "title", "lesson"]),
            window,
            duration_minutes,
            date_label,
            time_label,
            room: first_name(record, ACTUAL_ROOM_KEYS)
                .or_else(|| first_name(record, PLANNED_ROOM_KEYS)),
            teacher: first_name(record, ACTUAL_TEACHER_KEYS)
                .or_else(|| first_name(record, PLANNED_TEACHER_KEYS)),
            student_count,
            branch: first_name(record, &["branchName", "branch"]),
            status: record
                .get("status")
                .and_then(Value::as_str)
                .and_then(SessionStatus::parse),
            participation_mode: first_name(record, &["participationMode", "mode"]),
        })
    }
}

/// Parse a timestamp into the wall-clock time it denotes.
///
/// Offset-bearing timestamps keep their own wall clock unless a display
/// offset is given; naive timestamps are already wall-clock.
#[must_use]
pub fn parse_wall_clock(raw: &str, display_offset: Option<FixedOffset>) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(stamped) = DateTime::parse_from_rfc3339(raw) {
        return Some(match display_offset {
            Some(offset) => stamped.with_timezone(&offset).naive_local(),
            None => stamped.naive_local(),
        });
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

/// First non-blank name among `keys`: a string, or an object's `fullName`/`name`
fn first_name(record: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match record.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(inner) => ["fullName", "name", "title"]
            .iter()
            .find_map(|k| inner.get(*k).and_then(Value::as_str))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn actual_start_with_offset_keeps_wall_clock() {
        let lesson = SessionMapper::default()
            .map(json!({
                "id": "sess-1",
                "className": "IELTS 6.5",
                "actualStartTime": "2024-12-21T19:00:00+07:00",
                "plannedStartTime": "2024-12-21T18:00:00+07:00",
                "durationMinutes": 120
            }))
            .unwrap();

        assert_eq!(lesson.time_label, "19:00–21:00");
        assert_eq!(lesson.date_label, "2024-12-21");
        assert_eq!(lesson.duration_minutes, 120);
    }

    #[test]
    fn no_timestamp_renders_placeholders() {
        let lesson = SessionMapper::default()
            .map(json!({"id": 5, "className": "Math"}))
            .unwrap();

        assert_eq!(lesson.id, SessionId::new("5"));
        assert_eq!(lesson.date_label, NOT_SCHEDULED);
        assert_eq!(lesson.time_label, NOT_SCHEDULED);
        assert!(!lesson.is_scheduled());
    }

    #[test]
    fn malformed_actual_falls_back_to_planned() {
        let lesson = SessionMapper::default()
            .map(json!({
                "id": "s",
                "actualStartTime": "not-a-date",
                "plannedStartTime": "2024-03-01 08:30"
            }))
            .unwrap();
        assert_eq!(lesson.time_label, "08:30–09:30");
    }

    #[test]
    fn date_does_not_shift_for_early_morning_utc_plus() {
        // 00:30 local in +07:00 is the previous day in UTC
        let lesson = SessionMapper::default()
            .map(json!({"id": "s", "plannedStartTime": "2024-12-22T00:30:00+07:00"}))
            .unwrap();
        assert_eq!(lesson.date_label, "2024-12-22");
    }

    #[test]
    fn display_offset_converts_wall_clock() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let lesson = SessionMapper::new(Some(utc))
            .map(json!({"id": "s", "actualStartTime": "2024-12-21T19:00:00+07:00"}))
            .unwrap();
        assert_eq!(lesson.time_label, "12:00–13:00");
    }

    #[test]
    fn non_positive_duration_defaults() {
        for duration in [json!(0), json!(-15), json!("abc"), json!(null)] {
            let lesson = SessionMapper::default()
                .map(json!({"id": "s", "durationMinutes": duration}))
                .unwrap();
            assert_eq!(lesson.duration_minutes, DEFAULT_DURATION_MINUTES);
        }
    }

    #[test]
    fn actual_room_and_teacher_preferred() {
        let lesson = SessionMapper::default()
            .map(json!({
                "data": {
                    "id": "s",
                    "plannedRoom": "A1",
                    "actualRoom": "B2",
                    "plannedTeacher": {"fullName": "Planned Teacher"},
                    "actualTeacher": {"fullName": "Cover Teacher"},
                    "totalStudents": "12",
                    "branchName": "North",
                    "status": "MAKEUP",
                    "participationMode": "online"
                }
            }))
            .unwrap();

        assert_eq!(lesson.room.as_deref(), Some("B2"));
        assert_eq!(lesson.teacher.as_deref(), Some("Cover Teacher"));
        assert_eq!(lesson.student_count, 12);
        assert_eq!(lesson.branch.as_deref(), Some("North"));
        assert_eq!(lesson.status, Some(SessionStatus::Makeup));
        assert_eq!(lesson.participation_mode.as_deref(), Some("online"));
        assert_eq!(lesson.course_label, UNTITLED_COURSE);
    }

    #[test]
    fn planned_values_used_when_actual_blank() {
        let lesson = SessionMapper::default()
            .map(json!({"id": "s", "actualRoom": " ", "plannedRoom": "A1", "teacherName": "T"}))
            .unwrap();
        assert_eq!(lesson.room.as_deref(), Some("A1"));
        assert_eq!(lesson.teacher.as_deref(), Some("T"));
        assert_eq!(lesson.status, None);
    }

    #[test]
    fn missing_id_yields_none() {
        assert!(SessionMapper::default().map(json!({"className": "x"})).is_none());
        assert!(SessionMapper::default().map(json!("garbage")).is_none());
    }
}
