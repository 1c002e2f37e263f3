//! Roster normalizer
//!
//! Turns a roster document of any supported envelope into canonical
//! `AttendanceMark`s with a zero absence rate. Shape mismatches degrade to
//! an empty roster; they never fail the workflow.

use crate::codec;
use crate::envelope::{first_i64, first_id, first_str, id_string, RosterEnvelope};
use crate::types::{AttendanceMark, AttendanceSummary, StudentId};
use serde_json::Value;

/// Normalized roster of one session
#[derive(Debug, Clone, PartialEq)]
pub struct RosterSnapshot {
    /// One mark per roster member, in response order
    pub marks: Vec<AttendanceMark>,
    /// Summary supplied by the remote store, if any
    pub remote_summary: Option<AttendanceSummary>,
    /// Whether any entry carries a persisted attendance record
    pub has_records: bool,
    /// Resolved envelope shape
    pub shape: &'static str,
}

impl RosterSnapshot {
    /// A session with no attendance records yet (writes must create)
    #[inline]
    #[must_use]
    pub fn is_novel(&self) -> bool {
        !self.has_records
    }
}

/// Normalize a raw roster document
#[must_use]
pub fn normalize_roster(doc: Value) -> RosterSnapshot {
    let envelope = RosterEnvelope::decode(doc);
    let shape = envelope.kind();
    let (items, summary) = envelope.into_parts();
    tracing::debug!(shape, entries = items.len(), "resolved roster envelope");

    let mut marks = Vec::with_capacity(items.len());
    let mut has_records = false;
    for item in &items {
        match normalize_entry(item) {
            Some((mark, persisted)) => {
                has_records |= persisted;
                marks.push(mark);
            }
            None => tracing::warn!("dropping roster entry without a student id"),
        }
    }

    RosterSnapshot {
        marks,
        remote_summary: summary.as_ref().and_then(decode_summary),
        has_records,
        shape,
    }
}

/// One roster entry to a mark, plus whether it carries a persisted record
fn normalize_entry(item: &Value) -> Option<(AttendanceMark, bool)> {
    let entry = item.as_object()?;
    let student = entry.get("student").and_then(Value::as_object);

    let student_id = first_id(entry, &["studentId", "student_id"])
        .or_else(|| student.and_then(|s| s.get("id")).and_then(id_string))?;

    let name = first_str(entry, &["studentName", "fullName"])
        .or_else(|| student.and_then(|s| first_str(s, &["fullName", "name"])));

    let status = codec::value_to_canonical(entry.get("status"));
    let note = first_str(entry, &["note", "notes", "comment"]).unwrap_or_default();

    // Row-level `id` may be an enrollment key, not an attendance record.
    let record_id = first_id(entry, &["attendanceId", "attendance_id"]);
    let persisted = record_id.is_some() || status.is_marked();

    let mut mark = AttendanceMark::new(StudentId::new(student_id))
        .with_status(status)
        .with_note(note);
    mark.student_name = name;
    Some((mark, persisted))
}

/// Remote summary; requires at least `total`.
///
/// Without an explicit `presentEquivalent`, late arrivals reported under
/// their own key are folded into the present count.
fn decode_summary(value: &Value) -> Option<AttendanceSummary> {
    let map = value.as_object()?;
    let tally = |keys: &[&str]| first_i64(map, keys).and_then(|n| usize::try_from(n).ok());
    let count = |keys: &[&str]| tally(keys).unwrap_or(0);

    let total = tally(&["total", "totalStudents"])?;
    let present_equivalent = tally(&["presentEquivalent"])
        .unwrap_or_else(|| count(&["present", "presentCount"]) + count(&["late", "lateCount"]));
    Some(AttendanceSummary {
        total,
        present_equivalent,
        absent: count(&["absent", "absentCount"]),
        not_marked: count(&["notMarked", "unmarked", "notMarkedCount"]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttendanceStatus;
    use serde_json::json;

    fn entries() -> Value {
        json!([
            {"studentId": "s1", "studentName": "An", "status": "PRESENT", "attendanceId": "a1"},
            {"studentId": 2, "status": "NOT_MARKED"},
            {"student": {"id": "s3", "fullName": "Binh"}, "note": " late bus "}
        ])
    }

    #[test]
    fn three_envelopes_normalize_identically() {
        let bare = normalize_roster(entries());
        let items = normalize_roster(json!({"items": entries()}));
        let data = normalize_roster(json!({"data": entries()}));

        assert_eq!(bare.marks, items.marks);
        assert_eq!(bare.marks, data.marks);
        assert_eq!(bare.shape, "bare_array");
        assert_eq!(items.shape, "wrapped");
    }

    #[test]
    fn entries_become_marks_with_zero_rate() {
        let roster = normalize_roster(entries());
        assert_eq!(roster.marks.len(), 3);

        let first = &roster.marks[0];
        assert_eq!(first.student_id, StudentId::new("s1"));
        assert_eq!(first.student_name.as_deref(), Some("An"));
        assert_eq!(first.status, AttendanceStatus::Present);

        assert_eq!(roster.marks[1].student_id, StudentId::new("2"));
        assert_eq!(roster.marks[1].status, AttendanceStatus::Unmarked);

        let third = &roster.marks[2];
        assert_eq!(third.student_name.as_deref(), Some("Binh"));
        assert_eq!(third.note, "late bus");

        assert!(roster.marks.iter().all(|m| m.absence_rate == 0.0));
        assert!(roster.has_records);
    }

    #[test]
    fn roster_without_records_is_novel() {
        let roster = normalize_roster(json!({"items": [
            {"studentId": "s1"},
            {"studentId": "s2", "status": "NOT_MARKED"}
        ]}));
        assert!(roster.is_novel());
    }

    #[test]
    fn entries_without_student_id_are_dropped() {
        let roster = normalize_roster(json!([{"status": "ABSENT"}, {"studentId": "  "}, 7]));
        assert!(roster.marks.is_empty());
    }

    #[test]
    fn shape_mismatch_degrades_to_empty() {
        let roster = normalize_roster(json!({"unexpected": true}));
        assert!(roster.marks.is_empty());
        assert!(roster.remote_summary.is_none());
        assert_eq!(roster.shape, "fallback");
    }

    #[test]
    fn remote_summary_passes_through() {
        let roster = normalize_roster(json!({
            "items": [],
            "summary": {"total": 20, "present": 15, "absent": 3, "notMarked": 2}
        }));
        assert_eq!(
            roster.remote_summary,
            Some(AttendanceSummary {
                total: 20,
                present_equivalent: 15,
                absent: 3,
                not_marked: 2
            })
        );
    }

    #[test]
    fn remote_late_count_folds_into_present_equivalent() {
        let roster = normalize_roster(json!({
            "items": [],
            "summary": {"total": 10, "present": 6, "late": 1, "absent": 2, "notMarked": 1}
        }));
        let summary = roster.remote_summary.unwrap();

        assert_eq!(summary.present_equivalent, 7);
        assert_eq!(summary.present_equivalent + summary.absent + summary.not_marked, summary.total);
    }

    #[test]
    fn explicit_present_equivalent_is_taken_as_is() {
        let roster = normalize_roster(json!({
            "data": {"items": [], "summary": {"total": 4, "presentEquivalent": 3, "late": 1, "absent": 1}}
        }));
        assert_eq!(roster.remote_summary.map(|s| s.present_equivalent), Some(3));
    }

    #[test]
    fn row_id_alone_does_not_mark_a_record() {
        let roster = normalize_roster(json!({"items": [
            {"id": "enr-1", "studentId": "s1"},
            {"id": 17, "studentId": "s2", "status": "NOT_MARKED"}
        ]}));
        assert!(roster.is_novel());

        let recorded = normalize_roster(json!([{"attendance_id": 9, "studentId": "s1"}]));
        assert!(!recorded.is_novel());
    }

    #[test]
    fn summary_without_total_is_ignored() {
        let roster = normalize_roster(json!({"items": [], "summary": {"present": 1}}));
        assert!(roster.remote_summary.is_none());
    }
}
