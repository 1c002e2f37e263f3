//! Bulk synchronizer
//!
//! Persists an edited roster back to the attendance ledger:
//! - only dirty marks are written; an empty dirty set is rejected up front
//! - novel sessions get `create` writes, established ones get `update` writes
//! - every write is dispatched concurrently and settles on its own
//!
//! The batch is not transactional. When some writes fail the rest stay
//! persisted and the caller receives `AttendanceError::PartialSave`.

use crate::backend::{AttendanceBackend, MarkWrite};
use crate::config::EngineConfig;
use crate::credentials::{require_credential, CredentialProvider};
use crate::error::{AttendanceError, WriteFailure};
use crate::fanout::{settle_all, FanOutPolicy};
use crate::types::{AttendanceMark, SessionId, StudentId};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Write operation used for a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Session has no records yet
    Create,
    /// Session already has records
    Update,
}

impl WriteMode {
    /// Pick the write mode for a session
    #[inline]
    #[must_use]
    pub fn for_session(novel: bool) -> Self {
        if novel {
            WriteMode::Create
        } else {
            WriteMode::Update
        }
    }

    /// Lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WriteMode::Create => "create",
            WriteMode::Update => "update",
        }
    }
}

/// Outcome of a fully successful save
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Write operation used
    pub mode: WriteMode,
    /// Students written, in roster order
    pub saved: Vec<StudentId>,
}

/// Concurrent create/update writer
pub struct BulkSynchronizer {
    backend: Arc<dyn AttendanceBackend>,
    policy: FanOutPolicy,
}

impl BulkSynchronizer {
    /// Create a synchronizer over `backend`
    #[must_use]
    pub fn new(backend: Arc<dyn AttendanceBackend>, config: &EngineConfig) -> Self {
        Self {
            backend,
            policy: FanOutPolicy::from_config(config),
        }
    }

    /// Save the dirty marks of `marks` to `session_id`.
    ///
    /// # Errors
    /// - `AttendanceError::NothingToSave` when no mark is dirty (no I/O)
    /// - `AttendanceError::MissingCredential` before any write is issued
    /// - `AttendanceError::PartialSave` when one or more writes failed
    /// - `AttendanceError::Cancelled` if `cancel` fires before the join completes
    pub async fn save(
        &self,
        session_id: &SessionId,
        marks: &[AttendanceMark],
        novel: bool,
        credentials: &dyn CredentialProvider,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, AttendanceError> {
        let writes: Vec<MarkWrite> = marks
            .iter()
            .filter(|mark| mark.is_dirty())
            .map(MarkWrite::from_mark)
            .collect();
        if writes.is_empty() {
            return Err(AttendanceError::NothingToSave);
        }
        let credential = require_credential(credentials)?;

        let mode = WriteMode::for_session(novel);
        let attempted = writes.len();
        let student_ids: Vec<StudentId> = writes.iter().map(|w| w.student_id.clone()).collect();
        tracing::debug!(
            session_id = %session_id,
            mode = mode.as_str(),
            attempted,
            "dispatching attendance writes"
        );

        let outcomes = settle_all(writes, self.policy, cancel, |write| {
            let backend = Arc::clone(&self.backend);
            let credential = credential.clone();
            let session_id = session_id.clone();
            async move {
                match mode {
                    WriteMode::Create => backend.create_mark(&credential, &session_id, &write).await,
                    WriteMode::Update => backend.update_mark(&credential, &session_id, &write).await,
                }
            }
        })
        .await?;

        let mut saved = Vec::with_capacity(attempted);
        let mut failures = Vec::new();
        for (student_id, outcome) in student_ids.into_iter().zip(outcomes) {
            match outcome {
                Ok(()) => saved.push(student_id),
                Err(error) => {
                    tracing::warn!(
                        session_id = %session_id,
                        student_id = %student_id,
                        mode = mode.as_str(),
                        %error,
                        "attendance write failed"
                    );
                    failures.push(WriteFailure {
                        student_id,
                        reason: error.to_string(),
                    });
                }
            }
        }

        if failures.is_empty() {
            tracing::info!(session_id = %session_id, mode = mode.as_str(), saved = saved.len(), "attendance saved");
            return Ok(SyncReport { mode, saved });
        }

        tracing::warn!(
            session_id = %session_id,
            failed = failures.len(),
            saved = saved.len(),
            attempted,
            "attendance partially saved"
        );
        Err(AttendanceError::PartialSave {
            failed: failures.len(),
            saved: saved.len(),
            attempted,
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn novelty_routes_write_mode() {
        assert_eq!(WriteMode::for_session(true), WriteMode::Create);
        assert_eq!(WriteMode::for_session(false), WriteMode::Update);
        assert_eq!(WriteMode::Update.as_str(), "update");
    }

    #[test]
    fn report_serializes_lowercase_mode() {
        let report = SyncReport {
            mode: WriteMode::Create,
            saved: vec![StudentId::new("s1")],
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({"mode": "create", "saved": ["s1"]})
        );
    }
}
