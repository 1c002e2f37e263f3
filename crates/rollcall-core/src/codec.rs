//! Status codec
//!
//! Total mapping between the canonical `AttendanceStatus` and the wire
//! vocabulary of the attendance ledger. Ingestion never fails: anything
//! unrecognized becomes `Unmarked`.

use crate::types::AttendanceStatus;
use serde_json::Value;

/// Wire value for present
pub const WIRE_PRESENT: &str = "PRESENT";
/// Wire value for late
pub const WIRE_LATE: &str = "LATE";
/// Wire value for absent
pub const WIRE_ABSENT: &str = "ABSENT";
/// Wire sentinel for not marked
pub const WIRE_NOT_MARKED: &str = "NOT_MARKED";

/// Decode a raw wire status
#[must_use]
pub fn to_canonical(raw: Option<&str>) -> AttendanceStatus {
    let Some(raw) = raw else {
        return AttendanceStatus::Unmarked;
    };
    if raw.trim().eq_ignore_ascii_case(WIRE_PRESENT) {
        AttendanceStatus::Present
    } else if raw.trim().eq_ignore_ascii_case(WIRE_LATE) {
        AttendanceStatus::Late
    } else if raw.trim().eq_ignore_ascii_case(WIRE_ABSENT) {
        AttendanceStatus::Absent
    } else {
        AttendanceStatus::Unmarked
    }
}

/// Decode a status from an arbitrary JSON value (non-strings are unmarked)
#[inline]
#[must_use]
pub fn value_to_canonical(raw: Option<&Value>) -> AttendanceStatus {
    to_canonical(raw.and_then(Value::as_str))
}

/// Encode a canonical status for the wire
#[inline]
#[must_use]
pub fn to_wire(status: AttendanceStatus) -> &'static str {
    match status {
        AttendanceStatus::Present => WIRE_PRESENT,
        AttendanceStatus::Late => WIRE_LATE,
        AttendanceStatus::Absent => WIRE_ABSENT,
        AttendanceStatus::Unmarked => WIRE_NOT_MARKED,
    }
}
