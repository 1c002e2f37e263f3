//! Summary deriver

use crate::types::{AttendanceMark, AttendanceStatus, AttendanceSummary};

impl AttendanceSummary {
    /// Derive counts from a roster
    #[must_use]
    pub fn derive(marks: &[AttendanceMark]) -> Self {
        marks.iter().fold(
            AttendanceSummary {
                total: marks.len(),
                ..AttendanceSummary::default()
            },
            |mut summary, mark| {
                match mark.status {
                    AttendanceStatus::Present | AttendanceStatus::Late => {
                        summary.present_equivalent += 1;
                    }
                    AttendanceStatus::Absent => summary.absent += 1,
                    AttendanceStatus::Unmarked => summary.not_marked += 1,
                }
                summary
            },
        )
    }

    /// Remote summary if supplied, otherwise derived from `marks`
    #[must_use]
    pub fn resolve(remote: Option<AttendanceSummary>, marks: &[AttendanceMark]) -> Self {
        remote.unwrap_or_else(|| Self::derive(marks))
    }
}
