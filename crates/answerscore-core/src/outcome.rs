//! Grading outcome types with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::CriterionMeans;
use crate::model::{FinalGrade, QuestionDiagnostics, QuestionScoreBreakdown};

/// What happened to one reference question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QuestionOutcome {
    /// The student has no block for this label, or an empty one.
    Missing,
    Answered {
        breakdown: QuestionScoreBreakdown,
        diagnostics: QuestionDiagnostics,
    },
}

/// Per-question entry of a [`GradingOutcome`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionReport {
    pub label: String,
    pub points: u32,
    pub outcome: QuestionOutcome,
}

impl QuestionReport {
    /// Weighted points earned; 0 for a missing answer.
    pub fn earned(&self) -> f64 {
        match &self.outcome {
            QuestionOutcome::Missing => 0.0,
            QuestionOutcome::Answered { breakdown, .. } => breakdown.weighted_points,
        }
    }

    pub fn breakdown(&self) -> Option<&QuestionScoreBreakdown> {
        match &self.outcome {
            QuestionOutcome::Missing => None,
            QuestionOutcome::Answered { breakdown, .. } => Some(breakdown),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self.outcome, QuestionOutcome::Missing)
    }
}

/// Whether the grade made it into the grade store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PersistenceStatus {
    Saved { key: String },
    Failed { message: String },
    /// No store was configured.
    Skipped,
}

/// Everything one grading run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingOutcome {
    /// Unique run identifier.
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub student_id: String,
    pub assignment: String,
    /// One entry per reference question, ordered by question number.
    pub questions: Vec<QuestionReport>,
    pub grade: FinalGrade,
    /// Whether the reference document may be shown to the student.
    pub unlocked: bool,
    /// Pre-check and loader warnings. Grading continued regardless.
    pub warnings: Vec<String>,
    /// Mean of each criterion over answered questions.
    pub means: Option<CriterionMeans>,
    pub persistence: PersistenceStatus,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl GradingOutcome {
    pub fn answered(&self) -> impl Iterator<Item = &QuestionReport> {
        self.questions.iter().filter(|q| !q.is_missing())
    }

    pub fn missing(&self) -> impl Iterator<Item = &QuestionReport> {
        self.questions.iter().filter(|q| q.is_missing())
    }

    /// Save the outcome as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize outcome")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write outcome to {}", path.display()))?;
        Ok(())
    }

    /// Load an outcome from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read outcome from {}", path.display()))?;
        serde_json::from_str(&content).context("failed to parse outcome JSON")
    }
}
