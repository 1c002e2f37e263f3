//! Rollcall CLI support
//!
//! Settings loading, marks-file parsing, and sheet rendering for the
//! `rollcall` binary.

use anyhow::{bail, Context};
use rollcall_core::{
    codec, AttendanceError, AttendanceMark, EngineConfig, SessionSheet, StudentId,
};
use rollcall_http::HttpBackendConfig;
use serde::Deserialize;
use std::fmt::Write as _;
use std::path::Path;

/// Overrides `http.base_url`
pub const ENV_BASE_URL: &str = "ROLLCALL_BASE_URL";

/// Overrides `engine.history_window`
pub const ENV_HISTORY_WINDOW: &str = "ROLLCALL_HISTORY_WINDOW";

/// Exit code for a save where some marks did not persist
pub const EXIT_PARTIAL: i32 = 2;

/// Exit code for every other failure
pub const EXIT_FAILURE: i32 = 1;

/// Engine and backend settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    /// `[engine]` table
    pub engine: EngineConfig,
    /// `[http]` table
    pub http: HttpBackendConfig,
}

impl Settings {
    /// Parse both tables of one TOML document
    pub fn from_toml_str(source: &str) -> anyhow::Result<Self> {
        Ok(Self {
            engine: EngineConfig::from_toml_str(source)?,
            http: HttpBackendConfig::from_toml_str(source)?,
        })
    }

    /// Settings from an optional file, then environment overrides
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut settings = match path {
            Some(path) => {
                let source = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                Self::from_toml_str(&source)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Apply `ROLLCALL_*` overrides from `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(base_url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.http.base_url = base_url;
        }
        if let Some(window) = lookup(ENV_HISTORY_WINDOW) {
            self.engine.history_window = window
                .trim()
                .parse()
                .with_context(|| format!("{ENV_HISTORY_WINDOW} must be a positive integer, got {window:?}"))?;
        }
        self.engine.validate()?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarkInput {
    student_id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    note: Option<String>,
}

/// Parse `[{ "studentId", "status", "note" }]`
pub fn parse_marks(source: &str) -> anyhow::Result<Vec<AttendanceMark>> {
    let inputs: Vec<MarkInput> = serde_json::from_str(source).context("marks file must be a JSON array")?;
    let mut marks = Vec::with_capacity(inputs.len());
    for input in inputs {
        let student_id = input.student_id.trim();
        if student_id.is_empty() {
            bail!("marks entry with a blank studentId");
        }
        marks.push(
            AttendanceMark::new(StudentId::new(student_id))
                .with_status(codec::to_canonical(input.status.as_deref()))
                .with_note(input.note.unwrap_or_default()),
        );
    }
    Ok(marks)
}

/// Read and parse a marks file
pub fn read_marks(path: &Path) -> anyhow::Result<Vec<AttendanceMark>> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("reading marks {}", path.display()))?;
    parse_marks(&source).with_context(|| format!("parsing marks {}", path.display()))
}

/// Process exit code for a failed command
pub fn exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<AttendanceError>() {
        Some(AttendanceError::PartialSave { .. }) => EXIT_PARTIAL,
        _ => EXIT_FAILURE,
    }
}

/// Plain-text session sheet
pub fn render_sheet(sheet: &SessionSheet) -> String {
    let lesson = &sheet.lesson;
    let mut out = String::new();

    let _ = writeln!(out, "{}", lesson.course_label);
    if let Some(title) = &lesson.lesson_label {
        let _ = writeln!(out, "  {title}");
    }
    let _ = writeln!(out, "  date: {}  time: {}", lesson.date_label, lesson.time_label);
    if let Some(room) = &lesson.room {
        let _ = writeln!(out, "  room: {room}");
    }
    if let Some(teacher) = &lesson.teacher {
        let _ = writeln!(out, "  teacher: {teacher}");
    }

    let summary = &sheet.summary;
    let _ = writeln!(
        out,
        "  total {}  present {}  absent {}  not marked {}",
        summary.total, summary.present_equivalent, summary.absent, summary.not_marked
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "{:<12} {:<24} {:<9} {:>7}  note", "student", "name", "status", "absent");
    for mark in &sheet.marks {
        let _ = writeln!(
            out,
            "{:<12} {:<24} {:<9} {:>6.1}%  {}",
            mark.student_id.as_str(),
            mark.student_name.as_deref().unwrap_or("-"),
            mark.status.as_str(),
            mark.absence_rate * 100.0,
            mark.note
        );
    }
    out
}
