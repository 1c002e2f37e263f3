//! Bulk synchronization against the in-memory store

use rollcall_core::prelude::*;
use rollcall_core::{normalize_roster, BulkSynchronizer, WriteFailure, WriteMode};
use rollcall_test_utils::{blank_roster, evening_session, recorded_roster, Call, FakeBackend};
use std::sync::Arc;
use std::time::{Duration, Instant};

const SESSION: &str = "sess-42";

fn creds() -> StaticCredentials {
    StaticCredentials::new("teacher-token")
}

fn session() -> SessionId {
    SessionId::new(SESSION)
}

fn mark(id: &str, status: AttendanceStatus) -> AttendanceMark {
    AttendanceMark::new(StudentId::new(id)).with_status(status)
}

fn synchronizer(backend: &Arc<FakeBackend>) -> BulkSynchronizer {
    BulkSynchronizer::new(backend.clone(), &EngineConfig::default())
}

#[tokio::test]
async fn test_empty_roster_is_nothing_to_save() {
    let backend = FakeBackend::new().into_shared();
    let result = synchronizer(&backend)
        .save(&session(), &[], false, &creds(), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(AttendanceError::NothingToSave)));
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_all_unmarked_roster_is_nothing_to_save() {
    let backend = FakeBackend::new().into_shared();
    let roster = vec![
        AttendanceMark::new(StudentId::new("s1")),
        AttendanceMark::new(StudentId::new("s2")).with_note("   "),
    ];

    let result = synchronizer(&backend)
        .save(&session(), &roster, true, &creds(), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(AttendanceError::NothingToSave)));
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_nothing_to_save_wins_over_missing_credential() {
    let backend = FakeBackend::new().into_shared();
    let result = synchronizer(&backend)
        .save(&session(), &[], false, &StaticCredentials::none(), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(AttendanceError::NothingToSave)));
}

#[tokio::test]
async fn test_missing_credential_issues_no_writes() {
    let backend = FakeBackend::new().into_shared();
    let roster = vec![mark("s1", AttendanceStatus::Present)];

    let result = synchronizer(&backend)
        .save(&session(), &roster, false, &StaticCredentials::none(), &CancellationToken::new())
        .await;

    let error = result.unwrap_err();
    assert!(matches!(error, AttendanceError::MissingCredential));
    assert!(error.is_precondition());
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_novel_session_routes_every_write_to_create() {
    let backend = FakeBackend::new().with_roster(SESSION, blank_roster(4)).into_shared();
    let roster = vec![
        mark("s1", AttendanceStatus::Present),
        AttendanceMark::new(StudentId::new("s2")),
        mark("s3", AttendanceStatus::Absent).with_note("flu"),
        AttendanceMark::new(StudentId::new("s4")).with_note("arrived with parent"),
    ];

    let report = synchronizer(&backend)
        .save(&session(), &roster, true, &creds(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.mode, WriteMode::Create);
    assert_eq!(
        report.saved,
        vec![StudentId::new("s1"), StudentId::new("s3"), StudentId::new("s4")]
    );
    let writes = backend.write_calls();
    assert_eq!(writes.len(), 3);
    assert!(writes.iter().all(|call| matches!(call, Call::Create { .. })));
}

#[tokio::test]
async fn test_established_session_routes_every_write_to_update() {
    let backend = FakeBackend::new()
        .with_roster(SESSION, recorded_roster(3, "PRESENT"))
        .into_shared();
    let roster = vec![
        mark("s1", AttendanceStatus::Late),
        mark("s2", AttendanceStatus::Absent),
        mark("s3", AttendanceStatus::Present),
    ];

    let report = synchronizer(&backend)
        .save(&session(), &roster, false, &creds(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.mode, WriteMode::Update);
    let writes = backend.write_calls();
    assert_eq!(writes.len(), 3);
    assert!(writes.iter().all(|call| matches!(call, Call::Update { .. })));
}

#[tokio::test]
async fn test_blank_note_is_not_sent_on_update() {
    let backend = FakeBackend::new().into_shared();
    let roster = vec![mark("s1", AttendanceStatus::Late).with_note("  ")];

    synchronizer(&backend)
        .save(&session(), &roster, false, &creds(), &CancellationToken::new())
        .await
        .unwrap();

    match backend.write_calls().as_slice() {
        [Call::Update { session_id, write }] => {
            assert_eq!(session_id, &session());
            assert_eq!(write.status, "LATE");
            assert_eq!(write.note, None);
        }
        other => panic!("unexpected writes: {other:?}"),
    }
}

#[tokio::test]
async fn test_partial_failure_commits_the_rest() {
    let backend = FakeBackend::new()
        .with_session(SESSION, evening_session(SESSION))
        .with_roster(SESSION, blank_roster(5))
        .failing_write_for("s2")
        .failing_write_for("s4")
        .into_shared();
    let submitted = [
        AttendanceStatus::Present,
        AttendanceStatus::Late,
        AttendanceStatus::Absent,
        AttendanceStatus::Present,
        AttendanceStatus::Late,
    ];
    let roster: Vec<AttendanceMark> = submitted
        .iter()
        .enumerate()
        .map(|(i, &status)| mark(&format!("s{}", i + 1), status))
        .collect();

    let error = synchronizer(&backend)
        .save(&session(), &roster, true, &creds(), &CancellationToken::new())
        .await
        .unwrap_err();

    match &error {
        AttendanceError::PartialSave {
            failed,
            saved,
            attempted,
            failures,
        } => {
            assert_eq!((*failed, *saved, *attempted), (2, 3, 5));
            let failed_ids: Vec<&StudentId> = failures.iter().map(|f: &WriteFailure| &f.student_id).collect();
            assert_eq!(failed_ids, vec![&StudentId::new("s2"), &StudentId::new("s4")]);
        }
        other => panic!("expected partial save, got {other:?}"),
    }
    assert_eq!(error.to_string(), "2 could not be saved (3 of 5 saved)");
    assert!(error.is_retryable());

    let refetched = normalize_roster(serde_json::Value::Array(backend.roster_entries(SESSION)));
    let statuses: Vec<AttendanceStatus> = refetched.marks.iter().map(|m| m.status).collect();
    assert_eq!(
        statuses,
        vec![
            AttendanceStatus::Present,
            AttendanceStatus::Unmarked,
            AttendanceStatus::Absent,
            AttendanceStatus::Unmarked,
            AttendanceStatus::Late,
        ]
    );
    assert!(!refetched.is_novel());
}

#[tokio::test]
async fn test_cancelled_save_issues_no_writes() {
    let backend = FakeBackend::new().into_shared();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = synchronizer(&backend)
        .save(&session(), &[mark("s1", AttendanceStatus::Present)], true, &creds(), &cancel)
        .await;

    assert!(matches!(result, Err(AttendanceError::Cancelled)));
    assert!(backend.write_calls().is_empty());
}

#[tokio::test]
async fn test_cancel_mid_save_keeps_landed_writes() {
    let backend = FakeBackend::new()
        .with_roster(SESSION, blank_roster(4))
        .delayed("s3", Duration::from_millis(3_000))
        .delayed("s4", Duration::from_millis(3_000))
        .into_shared();
    let roster: Vec<AttendanceMark> = (1..=4)
        .map(|i| mark(&format!("s{i}"), AttendanceStatus::Absent))
        .collect();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let result = synchronizer(&backend)
        .save(&session(), &roster, true, &creds(), &cancel)
        .await;

    assert!(matches!(result, Err(AttendanceError::Cancelled)));
    assert!(started.elapsed() < Duration::from_millis(1_500));
    assert_eq!(backend.write_calls().len(), 4);

    let entries = backend.roster_entries(SESSION);
    let persisted: Vec<bool> = entries
        .iter()
        .map(|entry| entry.get("attendanceId").is_some() && entry["status"] == "ABSENT")
        .collect();
    assert_eq!(persisted, vec![true, true, false, false]);
}

#[tokio::test]
async fn test_every_write_uses_the_same_credential() {
    let backend = FakeBackend::new().into_shared();
    let roster: Vec<AttendanceMark> = (1..=6)
        .map(|i| mark(&format!("s{i}"), AttendanceStatus::Present))
        .collect();

    synchronizer(&backend)
        .save(&session(), &roster, true, &creds(), &CancellationToken::new())
        .await
        .unwrap();

    let tokens = backend.tokens_seen();
    assert_eq!(tokens.len(), 6);
    assert!(tokens.iter().all(|t| t == "teacher-token"));
}
