//! Error types for Rollcall Core
//!
//! Two layers:
//! - `TransportError` for a single remote call (status, network, timeout, decode)
//! - `AttendanceError` for workflow outcomes (preconditions, aggregate save
//!   failures, cancellation)

use crate::types::{AttendanceStatus, SessionId, StudentId};

/// Failure of one remote call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Non-2xx response
    #[error("remote returned status {code}: {body}")]
    Status {
        /// HTTP status code
        code: u16,
        /// Response body (possibly truncated)
        body: String,
    },

    /// Connection-level failure
    #[error("network failure: {0}")]
    Network(String),

    /// Call exceeded its timeout
    #[error("request timed out after {after_ms}ms")]
    Timeout {
        /// Elapsed budget in milliseconds
        after_ms: u64,
    },

    /// Response body could not be read as JSON
    #[error("undecodable response: {0}")]
    Decode(String),
}

impl TransportError {
    /// Check if this is a 404
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { code: 404, .. })
    }
}

/// One write that did not persist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    /// Student whose mark was not saved
    pub student_id: StudentId,
    /// Why
    pub reason: String,
}

/// Main Rollcall error type
#[derive(Debug, thiserror::Error)]
pub enum AttendanceError {
    /// No bearer credential available
    #[error("authentication required: no bearer credential available")]
    MissingCredential,

    /// Session directory has no such record
    #[error("record not found: session {0}")]
    SessionNotFound(SessionId),

    /// Save attempted with no dirty marks
    #[error("nothing to save: mark at least one student")]
    NothingToSave,

    /// Caller tried to clear a status that was already set
    #[error("cannot change {student_id} from {from} to {to}")]
    InvalidTransition {
        /// Student
        student_id: StudentId,
        /// Current status
        from: AttendanceStatus,
        /// Rejected status
        to: AttendanceStatus,
    },

    /// Some writes failed; the rest are persisted
    #[error("{failed} could not be saved ({saved} of {attempted} saved)")]
    PartialSave {
        /// Failed write count
        failed: usize,
        /// Successful write count
        saved: usize,
        /// Dispatched write count
        attempted: usize,
        /// Per-student failures, in roster order
        failures: Vec<WriteFailure>,
    },

    /// A non-fan-out remote call failed
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Cancelled by the caller
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl AttendanceError {
    /// Check if the error was raised before any I/O
    #[inline]
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential | Self::NothingToSave | Self::InvalidTransition { .. }
        )
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::PartialSave { .. } => true,
            Self::Transport(TransportError::Status { code, .. }) => *code >= 500 || *code == 429,
            Self::Transport(TransportError::Network(_) | TransportError::Timeout { .. }) => true,
            _ => false,
        }
    }

    /// Number of failed writes (0 unless `PartialSave`)
    #[inline]
    #[must_use]
    pub fn failed_count(&self) -> usize {
        match self {
            Self::PartialSave { failed, .. } => *failed,
            _ => 0,
        }
    }
}
