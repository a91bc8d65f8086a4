//! Grade history persistence.
//!
//! Grades are append-only per (student, assignment): a new grade never
//! overwrites an earlier one but goes under the next free key, see
//! [`next_grade_key`].

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::aggregate::next_grade_key;

/// Grades of one student: history key → grade out of 20.
pub type StudentHistory = BTreeMap<String, f64>;

/// All stored grades: student → history. Serializes to
/// `{ "<student>": { "<key>": <number> } }`.
pub type GradeRecords = BTreeMap<String, StudentHistory>;

/// Storage for historical grades.
#[async_trait]
pub trait GradeStore: Send + Sync {
    /// Store `grade` for `student_id` under the next free key derived from
    /// `assignment`. Returns the key used.
    async fn record(&self, student_id: &str, assignment: &str, grade: f64) -> Result<String>;

    /// Every grade stored for `student_id`; empty when there are none.
    async fn history(&self, student_id: &str) -> Result<StudentHistory>;
}

fn insert_next(records: &mut GradeRecords, student_id: &str, assignment: &str, grade: f64) -> String {
    let history = records.entry(student_id.to_string()).or_default();
    let key = next_grade_key(assignment, history.keys().map(String::as_str));
    history.insert(key.clone(), grade);
    key
}

// ---------------------------------------------------------------------------
// JSON file store
// ---------------------------------------------------------------------------

/// Stores all records in one JSON file.
///
/// Each `record` call reads the file, adds the grade and replaces the file
/// atomically (temp file in the same directory, then rename). Calls on the
/// same store are serialized; separate processes writing the same file are
/// not coordinated.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }
}

/// Read all records; a file that does not exist yet holds none.
fn read_records(path: &Path) -> Result<GradeRecords> {
    if !path.exists() {
        return Ok(GradeRecords::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read grade records from {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(GradeRecords::new());
    }
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse grade records in {}", path.display()))
}

fn write_records(path: &Path, records: &GradeRecords) -> Result<()> {
    let json = serde_json::to_string_pretty(records).context("failed to serialize grade records")?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create directory {}", dir.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    tmp.write_all(json.as_bytes())
        .context("failed to write grade records")?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

#[async_trait]
impl GradeStore for JsonFileStore {
    async fn record(&self, student_id: &str, assignment: &str, grade: f64) -> Result<String> {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        let (student_id, assignment) = (student_id.to_string(), assignment.to_string());

        let key = tokio::task::spawn_blocking(move || -> Result<String> {
            let mut records = read_records(&path)?;
            let key = insert_next(&mut records, &student_id, &assignment, grade);
            write_records(&path, &records)?;
            Ok(key)
        })
        .await
        .context("grade store task failed")??;

        tracing::info!(key = %key, grade, path = %self.path.display(), "grade recorded");
        Ok(key)
    }

    async fn history(&self, student_id: &str) -> Result<StudentHistory> {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        let mut records = tokio::task::spawn_blocking(move || read_records(&path))
            .await
            .context("grade store task failed")??;
        Ok(records.remove(student_id).unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Keeps records in memory. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<GradeRecords>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything stored so far.
    pub async fn records(&self) -> GradeRecords {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl GradeStore for MemoryStore {
    async fn record(&self, student_id: &str, assignment: &str, grade: f64) -> Result<String> {
        let mut records = self.records.lock().await;
        Ok(insert_next(&mut records, student_id, assignment, grade))
    }

    async fn history(&self, student_id: &str) -> Result<StudentHistory> {
        let records = self.records.lock().await;
        Ok(records.get(student_id).cloned().unwrap_or_default())
    }
}
