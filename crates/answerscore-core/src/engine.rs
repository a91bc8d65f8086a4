//! Grading orchestrator.
//!
//! Reads both PDFs, runs the warn-only pre-checks, evaluates every reference
//! question against the student's matching answer with bounded parallelism,
//! aggregates the grade and persists it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::aggregate::{final_grade, unlocks_reference, CriterionMeans};
use crate::error::{ExtractionError, GradeError};
use crate::evaluator::QuestionEvaluator;
use crate::extract::extract_pages;
use crate::model::question_number;
use crate::outcome::{GradingOutcome, PersistenceStatus, QuestionOutcome, QuestionReport};
use crate::segment::{count_question_markers, ordered, split_into_questions};
use crate::store::GradeStore;
use crate::traits::ModelBundle;

/// One grading job.
#[derive(Debug, Clone)]
pub struct GradeRequest {
    pub student_id: String,
    pub student_pdf: PathBuf,
    pub reference_pdf: PathBuf,
    /// Base history key, e.g. the reference file name.
    pub assignment: String,
}

/// Configuration for the grader.
#[derive(Debug, Clone)]
pub struct GraderConfig {
    /// Maximum questions evaluated at once.
    pub parallelism: usize,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self { parallelism: 4 }
    }
}

/// Progress reporting trait.
pub trait ProgressReporter: Send + Sync {
    fn on_question_start(&self, label: &str);
    fn on_question_complete(&self, report: &QuestionReport);
    fn on_grade_complete(&self, outcome: &GradingOutcome, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_question_start(&self, _: &str) {}
    fn on_question_complete(&self, _: &QuestionReport) {}
    fn on_grade_complete(&self, _: &GradingOutcome, _: Duration) {}
}

/// Extracted text of one PDF plus its header line.
#[derive(Debug, Clone)]
struct Document {
    text: String,
    header: Option<String>,
}

async fn read_document(path: &Path) -> Result<Document, GradeError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<Document, ExtractionError> {
        let pdf = extract_pages(&path)?;
        Ok(Document {
            text: pdf.text(),
            header: pdf.header,
        })
    })
    .await
    .map_err(|e| GradeError::Task(e.to_string()))?
    .map_err(GradeError::from)
}

async fn read_both(student_pdf: &Path, reference_pdf: &Path) -> Result<(Document, Document), GradeError> {
    tokio::try_join!(read_document(student_pdf), read_document(reference_pdf))
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Consistency checks between the two documents. Mismatches are reported,
/// never fatal.
fn consistency_warnings(student: &Document, reference: &Document) -> Vec<String> {
    let mut warnings = Vec::new();

    if let (Some(student_header), Some(reference_header)) = (&student.header, &reference.header) {
        if strip_whitespace(student_header) != strip_whitespace(reference_header) {
            warnings.push(format!(
                "student document header \"{student_header}\" differs from reference header \"{reference_header}\""
            ));
        }
    }

    let student_count = count_question_markers(&student.text);
    let reference_count = count_question_markers(&reference.text);
    if student_count != reference_count {
        warnings.push(format!(
            "student document has {student_count} question markers, reference has {reference_count}"
        ));
    }

    warnings
}

/// Run only the pre-checks. Fails when either file cannot be read.
pub async fn precheck(student_pdf: &Path, reference_pdf: &Path) -> Result<Vec<String>, GradeError> {
    let (student, reference) = read_both(student_pdf, reference_pdf).await?;
    Ok(consistency_warnings(&student, &reference))
}

/// The grading entry point.
pub struct Grader {
    models: ModelBundle,
    evaluator: QuestionEvaluator,
    store: Option<Arc<dyn GradeStore>>,
    config: GraderConfig,
    setup_warnings: Vec<String>,
}

impl Grader {
    pub fn new(models: ModelBundle, evaluator: QuestionEvaluator, config: GraderConfig) -> Self {
        Self {
            models,
            evaluator,
            store: None,
            config,
            setup_warnings: Vec::new(),
        }
    }

    /// Persist grades to `store`. Without a store, persistence is skipped.
    pub fn with_store(mut self, store: Arc<dyn GradeStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Warnings from setup (e.g. an empty reference table) to repeat in
    /// every outcome.
    pub fn with_setup_warnings(mut self, warnings: Vec<String>) -> Self {
        self.setup_warnings = warnings;
        self
    }

    pub async fn grade(&self, request: &GradeRequest) -> Result<GradingOutcome, GradeError> {
        self.grade_with_progress(request, &NoopReporter).await
    }

    pub async fn grade_with_progress(
        &self,
        request: &GradeRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<GradingOutcome, GradeError> {
        let start = Instant::now();
        let run_id = Uuid::new_v4();
        tracing::info!(
            %run_id,
            student = %request.student_id,
            assignment = %request.assignment,
            "grading started"
        );

        let (student, reference) = read_both(&request.student_pdf, &request.reference_pdf).await?;

        let mut warnings = self.setup_warnings.clone();
        for warning in consistency_warnings(&student, &reference) {
            tracing::warn!("{warning}");
            warnings.push(warning);
        }

        let student_questions = split_into_questions(&student.text);
        let reference_questions = split_into_questions(&reference.text);
        if reference_questions.is_empty() {
            let warning = "reference document contains no question markers".to_string();
            tracing::warn!("{warning}");
            warnings.push(warning);
        }

        let semaphore = Semaphore::new(self.config.parallelism.max(1));
        let mut reports = Vec::with_capacity(reference_questions.len());
        let mut futures = FuturesUnordered::new();

        for question in ordered(&reference_questions) {
            let answer = student_questions
                .get(&question.label)
                .filter(|block| !block.text.is_empty());
            let Some(answer) = answer else {
                tracing::info!("{} not answered, scoring 0", question.label);
                let report = QuestionReport {
                    label: question.label.clone(),
                    points: question.points,
                    outcome: QuestionOutcome::Missing,
                };
                progress.on_question_complete(&report);
                reports.push(report);
                continue;
            };

            let semaphore = &semaphore;
            futures.push(async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| GradeError::Task("semaphore closed".into()))?;
                progress.on_question_start(&question.label);
                let evaluated = self
                    .evaluator
                    .evaluate(&self.models, &question.text, &answer.text, question.points)
                    .await
                    .map_err(|e| GradeError::Model(e.context(format!("question {}", question.label))))?;
                tracing::debug!(
                    label = %question.label,
                    points = evaluated.breakdown.weighted_points,
                    "question evaluated"
                );
                Ok::<_, GradeError>(QuestionReport {
                    label: question.label.clone(),
                    points: question.points,
                    outcome: QuestionOutcome::Answered {
                        breakdown: evaluated.breakdown,
                        diagnostics: evaluated.diagnostics,
                    },
                })
            });
        }

        while let Some(result) = futures.next().await {
            let report = result?;
            progress.on_question_complete(&report);
            reports.push(report);
        }
        reports.sort_by(|a, b| {
            question_number(&a.label)
                .cmp(&question_number(&b.label))
                .then_with(|| a.label.cmp(&b.label))
        });

        let possible: u64 = reference_questions.values().map(|q| u64::from(q.points)).sum();
        let grade = final_grade(reports.iter().map(QuestionReport::earned), possible);
        let unlocked = unlocks_reference(grade.grade_out_of_20);
        let means = CriterionMeans::of(reports.iter().filter_map(QuestionReport::breakdown));

        let persistence = self
            .persist(&request.student_id, &request.assignment, grade.grade_out_of_20)
            .await;

        if unlocked {
            tracing::info!(grade = grade.grade_out_of_20, "reference document unlocked");
        } else {
            tracing::info!(grade = grade.grade_out_of_20, "reference document withheld");
        }

        let elapsed = start.elapsed();
        let outcome = GradingOutcome {
            run_id,
            created_at: chrono::Utc::now(),
            student_id: request.student_id.clone(),
            assignment: request.assignment.clone(),
            questions: reports,
            grade,
            unlocked,
            warnings,
            means,
            persistence,
            duration_ms: elapsed.as_millis() as u64,
        };
        progress.on_grade_complete(&outcome, elapsed);
        Ok(outcome)
    }

    async fn persist(&self, student_id: &str, assignment: &str, grade: f64) -> PersistenceStatus {
        let Some(store) = &self.store else {
            return PersistenceStatus::Skipped;
        };
        match store.record(student_id, assignment, grade).await {
            Ok(key) => PersistenceStatus::Saved { key },
            Err(e) => {
                tracing::error!("failed to save grade for {student_id}: {e:#}");
                PersistenceStatus::Failed {
                    message: format!("{e:#}"),
                }
            }
        }
    }
}
