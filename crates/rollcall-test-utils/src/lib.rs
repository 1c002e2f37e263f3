//! Testing utilities for Rollcall workspace
//!
//! In-memory attendance store with failure and delay injection, a call
//! journal, and JSON fixtures.

#![allow(missing_docs)]

use parking_lot::Mutex;
use rollcall_core::{
    AttendanceBackend, AttendanceEngine, Credential, MarkWrite, SessionId, StudentId,
    TransportError,
};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// One call seen by the fake store
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Detail(SessionId),
    Roster(SessionId),
    History { student_id: StudentId, page_size: usize },
    Create { session_id: SessionId, write: MarkWrite },
    Update { session_id: SessionId, write: MarkWrite },
}

impl Call {
    pub fn is_write(&self) -> bool {
        matches!(self, Call::Create { .. } | Call::Update { .. })
    }
}

/// How the roster document is wrapped when served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RosterShape {
    #[default]
    BareArray,
    Items,
    Data,
    DataItems,
}

#[derive(Default)]
struct State {
    sessions: HashMap<SessionId, Value>,
    rosters: HashMap<SessionId, Vec<Value>>,
    summaries: HashMap<SessionId, Value>,
    histories: HashMap<StudentId, Vec<Value>>,
    failing_history: HashSet<StudentId>,
    failing_writes: HashSet<StudentId>,
    delays: HashMap<StudentId, Duration>,
    journal: Vec<Call>,
    tokens: Vec<String>,
    next_record: u64,
}

/// In-memory `AttendanceBackend`
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<State>,
    roster_shape: RosterShape,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roster_shape(mut self, shape: RosterShape) -> Self {
        self.roster_shape = shape;
        self
    }

    pub fn with_session(self, session_id: &str, detail: Value) -> Self {
        self.state.lock().sessions.insert(SessionId::new(session_id), detail);
        self
    }

    pub fn with_roster(self, session_id: &str, entries: Vec<Value>) -> Self {
        self.state.lock().rosters.insert(SessionId::new(session_id), entries);
        self
    }

    pub fn with_summary(self, session_id: &str, summary: Value) -> Self {
        self.state.lock().summaries.insert(SessionId::new(session_id), summary);
        self
    }

    pub fn with_history(self, student_id: &str, statuses: &[&str]) -> Self {
        self.state
            .lock()
            .histories
            .insert(StudentId::new(student_id), history_entries(statuses));
        self
    }

    pub fn failing_history_for(self, student_id: &str) -> Self {
        self.state.lock().failing_history.insert(StudentId::new(student_id));
        self
    }

    pub fn failing_write_for(self, student_id: &str) -> Self {
        self.state.lock().failing_writes.insert(StudentId::new(student_id));
        self
    }

    /// Delay every call concerning `student_id`
    pub fn delayed(self, student_id: &str, delay: Duration) -> Self {
        self.state.lock().delays.insert(StudentId::new(student_id), delay);
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn journal(&self) -> Vec<Call> {
        self.state.lock().journal.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().journal.len()
    }

    pub fn write_calls(&self) -> Vec<Call> {
        self.journal().into_iter().filter(Call::is_write).collect()
    }

    /// Bearer tokens presented, one per call
    pub fn tokens_seen(&self) -> Vec<String> {
        self.state.lock().tokens.clone()
    }

    /// Current roster entries of a session
    pub fn roster_entries(&self, session_id: &str) -> Vec<Value> {
        self.state
            .lock()
            .rosters
            .get(&SessionId::new(session_id))
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, credential: &Credential, call: Call) -> Option<Duration> {
        let mut state = self.state.lock();
        let delay = match &call {
            Call::History { student_id, .. } => state.delays.get(student_id).copied(),
            Call::Create { write, .. } | Call::Update { write, .. } => {
                state.delays.get(&write.student_id).copied()
            }
            _ => None,
        };
        state.tokens.push(credential.token().to_string());
        state.journal.push(call);
        delay
    }

    fn wrap_roster(&self, entries: Vec<Value>, summary: Option<Value>) -> Value {
        let mut doc = match self.roster_shape {
            RosterShape::BareArray => return Value::Array(entries),
            RosterShape::Items => json!({ "items": entries }),
            RosterShape::Data => json!({ "data": entries }),
            RosterShape::DataItems => json!({ "data": { "items": entries } }),
        };
        if let (Some(summary), Some(map)) = (summary, doc.as_object_mut()) {
            map.insert("summary".to_string(), summary);
        }
        doc
    }

    fn persist(&self, session_id: &SessionId, write: &MarkWrite) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.failing_writes.contains(&write.student_id) {
            return Err(TransportError::Status {
                code: 500,
                body: format!("write rejected for {}", write.student_id),
            });
        }

        state.next_record += 1;
        let record_id = format!("att-{}", state.next_record);
        let roster = state.rosters.entry(session_id.clone()).or_default();
        let existing = roster
            .iter_mut()
            .find(|entry| entry.get("studentId").and_then(Value::as_str) == Some(write.student_id.as_str()));

        match existing.and_then(Value::as_object_mut) {
            Some(entry) => {
                entry.insert("status".to_string(), json!(write.status));
                if let Some(note) = &write.note {
                    entry.insert("note".to_string(), json!(note));
                }
                entry.entry("attendanceId").or_insert_with(|| json!(record_id));
            }
            None => roster.push(json!({
                "attendanceId": record_id,
                "studentId": write.student_id.as_str(),
                "status": write.status,
                "note": write.note,
            })),
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl AttendanceBackend for FakeBackend {
    async fn session_detail(
        &self,
        credential: &Credential,
        session_id: &SessionId,
    ) -> Result<Value, TransportError> {
        self.record(credential, Call::Detail(session_id.clone()));
        self.state
            .lock()
            .sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| TransportError::Status {
                code: 404,
                body: "session not found".to_string(),
            })
    }

    async fn session_roster(
        &self,
        credential: &Credential,
        session_id: &SessionId,
    ) -> Result<Value, TransportError> {
        self.record(credential, Call::Roster(session_id.clone()));
        let (entries, summary) = {
            let state = self.state.lock();
            (
                state.rosters.get(session_id).cloned().unwrap_or_default(),
                state.summaries.get(session_id).cloned(),
            )
        };
        Ok(self.wrap_roster(entries, summary))
    }

    async fn student_history(
        &self,
        credential: &Credential,
        student_id: &StudentId,
        page_size: usize,
    ) -> Result<Value, TransportError> {
        let delay = self.record(
            credential,
            Call::History {
                student_id: student_id.clone(),
                page_size,
            },
        );
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock();
        if state.failing_history.contains(student_id) {
            return Err(TransportError::Network(format!(
                "connection reset fetching history of {student_id}"
            )));
        }
        let entries = state.histories.get(student_id).cloned().unwrap_or_default();
        Ok(json!({ "items": entries.into_iter().take(page_size).collect::<Vec<_>>() }))
    }

    async fn create_mark(
        &self,
        credential: &Credential,
        session_id: &SessionId,
        write: &MarkWrite,
    ) -> Result<(), TransportError> {
        let delay = self.record(
            credential,
            Call::Create {
                session_id: session_id.clone(),
                write: write.clone(),
            },
        );
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.persist(session_id, write)
    }

    async fn update_mark(
        &self,
        credential: &Credential,
        session_id: &SessionId,
        write: &MarkWrite,
    ) -> Result<(), TransportError> {
        let delay = self.record(
            credential,
            Call::Update {
                session_id: session_id.clone(),
                write: write.clone(),
            },
        );
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.persist(session_id, write)
    }
}

pub fn history_entries(statuses: &[&str]) -> Vec<Value> {
    statuses.iter().map(|status| json!({ "status": status })).collect()
}

/// Evening session at +07:00, 120 minutes
pub fn evening_session(session_id: &str) -> Value {
    json!({
        "data": {
            "id": session_id,
            "className": "IELTS Foundation",
            "lessonTitle": "Unit 4 - Listening",
            "actualStartTime": "2024-12-21T19:00:00+07:00",
            "plannedStartTime": "2024-12-21T18:30:00+07:00",
            "durationMinutes": 120,
            "plannedRoom": "A2",
            "plannedTeacher": { "fullName": "Tran Minh" },
            "totalStudents": 5,
            "branchName": "District 1",
            "status": "COMPLETED",
            "participationMode": "offline"
        }
    })
}

/// Roster entries `s1..=sN` with no attendance record
pub fn blank_roster(count: usize) -> Vec<Value> {
    (1..=count)
        .map(|i| json!({ "studentId": format!("s{i}"), "studentName": format!("Student {i}") }))
        .collect()
}

/// Roster entries `s1..=sN` each with a persisted record
pub fn recorded_roster(count: usize, status: &str) -> Vec<Value> {
    (1..=count)
        .map(|i| {
            json!({
                "attendanceId": format!("rec-{i}"),
                "studentId": format!("s{i}"),
                "studentName": format!("Student {i}"),
                "status": status
            })
        })
        .collect()
}

pub fn setup_engine(backend: Arc<FakeBackend>) -> AttendanceEngine {
    AttendanceEngine::new(backend)
}
