//! Remote store seam
//!
//! The session directory, attendance ledger, and student history store are
//! external collaborators. Reads hand back raw JSON documents; the envelope
//! and normalizer modules turn those into domain types.

use crate::codec;
use crate::credentials::Credential;
use crate::error::TransportError;
use crate::types::{AttendanceMark, SessionId, StudentId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload of one create/update write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkWrite {
    /// Target student
    pub student_id: StudentId,
    /// Wire status
    pub status: String,
    /// Note; `None` when blank so existing notes are not overwritten
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl MarkWrite {
    /// Build the write payload for a mark
    #[must_use]
    pub fn from_mark(mark: &AttendanceMark) -> Self {
        Self {
            student_id: mark.student_id.clone(),
            status: codec::to_wire(mark.status).to_string(),
            note: mark.trimmed_note().map(str::to_string),
        }
    }
}

/// Remote attendance store
#[async_trait::async_trait]
pub trait AttendanceBackend: Send + Sync {
    /// Raw session descriptor (nested or flat envelope)
    async fn session_detail(
        &self,
        credential: &Credential,
        session_id: &SessionId,
    ) -> Result<Value, TransportError>;

    /// Raw roster document for a session
    async fn session_roster(
        &self,
        credential: &Credential,
        session_id: &SessionId,
    ) -> Result<Value, TransportError>;

    /// Most recent `page_size` history entries for a student
    async fn student_history(
        &self,
        credential: &Credential,
        student_id: &StudentId,
        page_size: usize,
    ) -> Result<Value, TransportError>;

    /// Create a mark in a session that has no records yet
    async fn create_mark(
        &self,
        credential: &Credential,
        session_id: &SessionId,
        write: &MarkWrite,
    ) -> Result<(), TransportError>;

    /// Update the mark of a student in a session that already has records
    async fn update_mark(
        &self,
        credential: &Credential,
        session_id: &SessionId,
        write: &MarkWrite,
    ) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttendanceStatus;
    use serde_json::json;

    #[test]
    fn blank_note_is_omitted_from_payload() {
        let mark = AttendanceMark::new(StudentId::new("s1"))
            .with_status(AttendanceStatus::Late)
            .with_note("  ");
        let write = MarkWrite::from_mark(&mark);

        assert_eq!(write.note, None);
        assert_eq!(
            serde_json::to_value(&write).unwrap(),
            json!({"studentId": "s1", "status": "LATE"})
        );
    }

    #[test]
    fn note_is_trimmed() {
        let mark = AttendanceMark::new(StudentId::new("s2"))
            .with_status(AttendanceStatus::Absent)
            .with_note(" sick \n");
        let write = MarkWrite::from_mark(&mark);
        assert_eq!(write.note.as_deref(), Some("sick"));
        assert_eq!(write.status, "ABSENT");
    }
}
