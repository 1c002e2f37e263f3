//! Absence-rate aggregator
//!
//! Enriches every roster mark with the share of absences in the student's
//! most recent history. One history query per student, all in flight at
//! once. A failed query leaves that mark untouched; the batch itself only
//! fails on a missing credential or cancellation.

use crate::backend::AttendanceBackend;
use crate::config::EngineConfig;
use crate::credentials::{require_credential, Credential, CredentialProvider};
use crate::codec;
use crate::envelope::RosterEnvelope;
use crate::error::{AttendanceError, TransportError};
use crate::fanout::{settle_all, FanOutPolicy};
use crate::types::{AttendanceMark, AttendanceStatus, HistoryEntry, StudentId};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Roster after enrichment
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRoster {
    /// Same length and order as the input
    pub marks: Vec<AttendanceMark>,
    /// Students whose history query failed (rate left at its prior value)
    pub failed: Vec<StudentId>,
}

/// `absent / total` over the given entries; 0 for an empty history
#[must_use]
pub fn absence_rate(history: &[HistoryEntry]) -> f64 {
    if history.is_empty() {
        return 0.0;
    }
    let absent = history
        .iter()
        .filter(|entry| entry.status == AttendanceStatus::Absent)
        .count();
    absent as f64 / history.len() as f64
}

/// Decode a history document, keeping at most `window` most-recent entries
#[must_use]
pub fn decode_history(doc: Value, window: usize) -> Vec<HistoryEntry> {
    let (items, _) = RosterEnvelope::decode(doc).into_parts();
    items
        .iter()
        .take(window)
        .map(|item| HistoryEntry {
            status: codec::value_to_canonical(item.get("status")),
        })
        .collect()
}

/// Concurrent absence-rate enrichment
pub struct AbsenceRateAggregator {
    backend: Arc<dyn AttendanceBackend>,
    policy: FanOutPolicy,
    window: usize,
}

impl AbsenceRateAggregator {
    /// Create an aggregator over `backend`
    #[must_use]
    pub fn new(backend: Arc<dyn AttendanceBackend>, config: &EngineConfig) -> Self {
        Self {
            backend,
            policy: FanOutPolicy::from_config(config),
            window: config.history_window.max(1),
        }
    }

    /// Enrich `marks` with absence rates.
    ///
    /// # Errors
    /// - `AttendanceError::MissingCredential` before any query is issued
    /// - `AttendanceError::Cancelled` if `cancel` fires before the join completes
    pub async fn enrich(
        &self,
        marks: Vec<AttendanceMark>,
        credentials: &dyn CredentialProvider,
        cancel: &CancellationToken,
    ) -> Result<EnrichedRoster, AttendanceError> {
        let credential = require_credential(credentials)?;
        self.enrich_with(marks, &credential, cancel).await
    }

    /// Enrich with an already-resolved credential
    pub(crate) async fn enrich_with(
        &self,
        marks: Vec<AttendanceMark>,
        credential: &Credential,
        cancel: &CancellationToken,
    ) -> Result<EnrichedRoster, AttendanceError> {
        if marks.is_empty() {
            return Ok(EnrichedRoster {
                marks,
                failed: Vec::new(),
            });
        }

        let student_ids: Vec<StudentId> = marks.iter().map(|m| m.student_id.clone()).collect();
        let window = self.window;
        let outcomes = settle_all(student_ids, self.policy, cancel, |student_id| {
            let backend = Arc::clone(&self.backend);
            let credential = credential.clone();
            async move {
                let doc = backend
                    .student_history(&credential, &student_id, window)
                    .await?;
                Ok::<f64, TransportError>(absence_rate(&decode_history(doc, window)))
            }
        })
        .await?;

        let mut failed = Vec::new();
        let marks = marks
            .into_iter()
            .zip(outcomes)
            .map(|(mark, outcome)| match outcome {
                Ok(rate) => mark.with_absence_rate(rate),
                Err(error) => {
                    tracing::warn!(
                        student_id = %mark.student_id,
                        %error,
                        "history query failed; keeping prior absence rate"
                    );
                    failed.push(mark.student_id.clone());
                    mark
                }
            })
            .collect::<Vec<_>>();

        tracing::info!(
            students = marks.len(),
            failed = failed.len(),
            "absence rates aggregated"
        );
        Ok(EnrichedRoster { marks, failed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries(statuses: &[AttendanceStatus]) -> Vec<HistoryEntry> {
        statuses.iter().map(|&status| HistoryEntry { status }).collect()
    }

    #[test]
    fn empty_history_rate_is_zero() {
        let rate = absence_rate(&[]);
        assert_eq!(rate, 0.0);
        assert!(!rate.is_nan());
    }

    #[test]
    fn rate_counts_only_absences() {
        let history = entries(&[
            AttendanceStatus::Absent,
            AttendanceStatus::Present,
            AttendanceStatus::Late,
            AttendanceStatus::Absent,
        ]);
        assert_eq!(absence_rate(&history), 0.5);
    }

    #[test]
    fn history_is_windowed() {
        let doc = json!({"items": [
            {"status": "ABSENT"},
            {"status": "ABSENT"},
            {"status": "PRESENT"},
            {"status": "PRESENT"}
        ]});
        let history = decode_history(doc, 2);
        assert_eq!(history.len(), 2);
        assert_eq!(absence_rate(&history), 1.0);
    }

    #[test]
    fn unexpected_history_shape_is_empty() {
        assert!(decode_history(json!({"oops": 1}), 100).is_empty());
    }
}
