//! Rollcall Core - attendance reconciliation and bulk-write engine
//!
//! Turns loosely shaped responses from a remote attendance store into a
//! canonical session sheet, and writes edited marks back:
//! - Status codec between wire and canonical statuses
//! - Session mapper producing a display-ready lesson descriptor
//! - Roster normalizer tolerant of several response envelopes
//! - Concurrent, failure-tolerant absence-rate aggregation
//! - Summary derivation when the store supplies none
//! - Bulk create/update synchronization with partial-commit reporting
//!
//! # Example
//!
//! ```rust,ignore
//! use rollcall_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example(backend: Arc<dyn AttendanceBackend>) -> Result<(), AttendanceError> {
//! let engine = AttendanceEngine::new(backend);
//! let credentials = StaticCredentials::new("token");
//! let cancel = CancellationToken::new();
//!
//! let mut sheet = engine.load_sheet(&SessionId::new("s-1"), &credentials, &cancel).await?;
//! sheet.marks[0].set_status(AttendanceStatus::Present)?;
//! engine
//!     .save_marks(&sheet.lesson.id, &sheet.marks, sheet.novel, &credentials, &cancel)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod backend;
pub mod codec;
pub mod config;
pub mod credentials;
pub mod engine;
pub mod envelope;
pub mod error;
mod fanout;
pub mod roster;
pub mod session;
pub mod summary;
pub mod sync;
pub mod types;

// Re-exports for convenience
pub use aggregate::{absence_rate, decode_history, AbsenceRateAggregator, EnrichedRoster};
pub use backend::{AttendanceBackend, MarkWrite};
pub use config::{EngineConfig, DEFAULT_HISTORY_WINDOW, DEFAULT_REQUEST_TIMEOUT_SECS};
pub use credentials::{
    require_credential, Credential, CredentialProvider, EnvCredentials, StaticCredentials,
};
pub use engine::{AttendanceEngine, SessionSheet};
pub use envelope::{RosterEnvelope, SessionEnvelope};
pub use error::{AttendanceError, TransportError, WriteFailure};
pub use roster::{normalize_roster, RosterSnapshot};
pub use session::{parse_wall_clock, SessionMapper, NOT_SCHEDULED};
pub use sync::{BulkSynchronizer, SyncReport, WriteMode};
pub use types::{
    AttendanceMark, AttendanceStatus, AttendanceSummary, HistoryEntry, LessonDescriptor,
    SessionId, SessionStatus, StudentId, TimeWindow,
};
pub use tokio_util::sync::CancellationToken;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Rollcall Core
    pub use crate::{
        AttendanceBackend, AttendanceEngine, AttendanceError, AttendanceMark, AttendanceStatus,
        AttendanceSummary, CancellationToken, CredentialProvider, EngineConfig, SessionId,
        SessionSheet, StaticCredentials, StudentId, SyncReport,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
