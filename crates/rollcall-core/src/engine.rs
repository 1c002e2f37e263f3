//! Attendance engine
//!
//! Composes the workflow for one session page:
//! - load: detail and roster fetched concurrently, session mapped, roster
//!   normalized and enriched, summary resolved
//! - save: dirty marks written back through the bulk synchronizer
//! - novelty: a roster-only fetch deciding create versus update
//!
//! Every batch runs under its own `attendance_batch` span.

use crate::aggregate::{AbsenceRateAggregator, EnrichedRoster};
use crate::backend::AttendanceBackend;
use crate::config::EngineConfig;
use crate::credentials::{require_credential, CredentialProvider};
use crate::error::{AttendanceError, TransportError};
use crate::roster::normalize_roster;
use crate::session::SessionMapper;
use crate::sync::{BulkSynchronizer, SyncReport};
use crate::types::{AttendanceMark, AttendanceSummary, LessonDescriptor, SessionId};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Everything the session page shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSheet {
    /// Display-ready session
    pub lesson: LessonDescriptor,
    /// Enriched roster, in roster order
    pub marks: Vec<AttendanceMark>,
    /// Remote summary, or one derived from `marks`
    pub summary: AttendanceSummary,
    /// No attendance records exist yet; saves must create
    pub novel: bool,
}

/// Attendance workflow facade
#[derive(Clone)]
pub struct AttendanceEngine {
    backend: Arc<dyn AttendanceBackend>,
    config: EngineConfig,
}

impl AttendanceEngine {
    /// Create an engine with default configuration
    #[must_use]
    pub fn new(backend: Arc<dyn AttendanceBackend>) -> Self {
        Self {
            backend,
            config: EngineConfig::default(),
        }
    }

    /// With configuration
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Load the sheet of one session.
    ///
    /// # Errors
    /// - `AttendanceError::MissingCredential` before any fetch
    /// - `AttendanceError::SessionNotFound` when the detail has no identifier
    ///   or the store answers 404
    /// - `AttendanceError::Transport` when the detail or roster fetch fails
    /// - `AttendanceError::Cancelled`
    pub async fn load_sheet(
        &self,
        session_id: &SessionId,
        credentials: &dyn CredentialProvider,
        cancel: &CancellationToken,
    ) -> Result<SessionSheet, AttendanceError> {
        let span = batch_span("load", session_id);
        async {
            let credential = require_credential(credentials)?;
            let timeout = self.config.request_timeout();

            let (detail, roster) = guarded(cancel, async {
                tokio::join!(
                    bounded(timeout, self.backend.session_detail(&credential, session_id)),
                    bounded(timeout, self.backend.session_roster(&credential, session_id)),
                )
            })
            .await?;

            let detail = detail.map_err(|error| not_found_or(error, session_id))?;
            let lesson = SessionMapper::new(self.config.display_offset())
                .map(detail)
                .ok_or_else(|| AttendanceError::SessionNotFound(session_id.clone()))?;

            let snapshot = normalize_roster(roster.map_err(|error| not_found_or(error, session_id))?);
            let novel = snapshot.is_novel();
            let remote_summary = snapshot.remote_summary;

            let EnrichedRoster { marks, failed } =
                AbsenceRateAggregator::new(Arc::clone(&self.backend), &self.config)
                    .enrich_with(snapshot.marks, &credential, cancel)
                    .await?;
            let summary = AttendanceSummary::resolve(remote_summary, &marks);

            tracing::info!(
                students = marks.len(),
                history_failures = failed.len(),
                novel,
                remote_summary = remote_summary.is_some(),
                "session sheet loaded"
            );
            Ok::<_, AttendanceError>(SessionSheet {
                lesson,
                marks,
                summary,
                novel,
            })
        }
        .instrument(span)
        .await
    }

    /// Whether the session has no attendance records yet, from a fresh roster fetch
    ///
    /// # Errors
    /// `MissingCredential`, `SessionNotFound`, `Transport`, or `Cancelled`.
    pub async fn detect_novelty(
        &self,
        session_id: &SessionId,
        credentials: &dyn CredentialProvider,
        cancel: &CancellationToken,
    ) -> Result<bool, AttendanceError> {
        let span = batch_span("detect_novelty", session_id);
        async {
            let credential = require_credential(credentials)?;
            let roster = guarded(
                cancel,
                bounded(
                    self.config.request_timeout(),
                    self.backend.session_roster(&credential, session_id),
                ),
            )
            .await?
            .map_err(|error| not_found_or(error, session_id))?;

            let novel = normalize_roster(roster).is_novel();
            tracing::debug!(novel, "detected session novelty from roster");
            Ok::<_, AttendanceError>(novel)
        }
        .instrument(span)
        .await
    }

    /// Enrich marks with absence rates; see [`AbsenceRateAggregator::enrich`]
    ///
    /// # Errors
    /// `MissingCredential` or `Cancelled`; per-student failures are not errors.
    pub async fn enrich_absence_rates(
        &self,
        marks: Vec<AttendanceMark>,
        credentials: &dyn CredentialProvider,
        cancel: &CancellationToken,
    ) -> Result<EnrichedRoster, AttendanceError> {
        AbsenceRateAggregator::new(Arc::clone(&self.backend), &self.config)
            .enrich(marks, credentials, cancel)
            .await
    }

    /// Save dirty marks; see [`BulkSynchronizer::save`]
    ///
    /// # Errors
    /// `NothingToSave`, `MissingCredential`, `PartialSave`, or `Cancelled`.
    pub async fn save_marks(
        &self,
        session_id: &SessionId,
        marks: &[AttendanceMark],
        novel: bool,
        credentials: &dyn CredentialProvider,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, AttendanceError> {
        let span = batch_span("save", session_id);
        BulkSynchronizer::new(Arc::clone(&self.backend), &self.config)
            .save(session_id, marks, novel, credentials, cancel)
            .instrument(span)
            .await
    }
}

fn batch_span(operation: &'static str, session_id: &SessionId) -> tracing::Span {
    tracing::info_span!(
        "attendance_batch",
        operation,
        session_id = %session_id,
        batch_id = %Uuid::new_v4()
    )
}

fn not_found_or(error: TransportError, session_id: &SessionId) -> AttendanceError {
    if error.is_not_found() {
        AttendanceError::SessionNotFound(session_id.clone())
    } else {
        AttendanceError::Transport(error)
    }
}

async fn bounded<T>(
    timeout: Duration,
    call: impl Future<Output = Result<T, TransportError>>,
) -> Result<T, TransportError> {
    let after_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    tokio::time::timeout(timeout, call)
        .await
        .unwrap_or(Err(TransportError::Timeout { after_ms }))
}

async fn guarded<T>(cancel: &CancellationToken, work: impl Future<Output = T>) -> Result<T, AttendanceError> {
    if cancel.is_cancelled() {
        return Err(AttendanceError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AttendanceError::Cancelled),
        out = work => Ok(out),
    }
}
