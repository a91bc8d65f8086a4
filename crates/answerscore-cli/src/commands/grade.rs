//! The `answerscore grade` command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use answerscore_core::aggregate::UNLOCK_THRESHOLD;
use answerscore_core::coverage::InflectionMatcher;
use answerscore_core::evaluator::QuestionEvaluator;
use answerscore_core::reference::load_reference_tables;
use answerscore_core::store::JsonFileStore;
use answerscore_core::{
    GradeRequest, Grader, GraderConfig, GradingOutcome, PersistenceStatus, ProgressReporter,
    QuestionOutcome, QuestionReport,
};
use answerscore_providers::{load_config_from, load_models};

/// Console progress reporter.
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_question_start(&self, label: &str) {
        eprintln!("  Scoring: {label}");
    }

    fn on_question_complete(&self, report: &QuestionReport) {
        match &report.outcome {
            QuestionOutcome::Missing => {
                eprintln!("  Missing: {} (0/{})", report.label, report.points)
            }
            QuestionOutcome::Answered { breakdown, .. } => eprintln!(
                "  Done: {} {:.2}/{}",
                report.label, breakdown.weighted_points, report.points
            ),
        }
    }

    fn on_grade_complete(&self, outcome: &GradingOutcome, elapsed: Duration) {
        eprintln!(
            "\nComplete: {} answered, {} missing ({:.1}s)",
            outcome.answered().count(),
            outcome.missing().count(),
            elapsed.as_secs_f64()
        );
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    student: PathBuf,
    reference: PathBuf,
    student_id: String,
    assignment: Option<String>,
    output: Option<PathBuf>,
    parallelism: Option<usize>,
    no_save: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    if let Some(p) = parallelism {
        anyhow::ensure!(p >= 1, "parallelism must be at least 1");
    }
    anyhow::ensure!(!student_id.trim().is_empty(), "student id must not be empty");

    let config = load_config_from(config_path.as_deref())?;

    let assignment = match assignment {
        Some(key) => key,
        None => reference
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .context("cannot derive an assignment key from the reference path")?,
    };

    let loaded = load_reference_tables(&config.reference.concepts, &config.reference.authors);
    let matcher = InflectionMatcher::new(&loaded.tables, &config.scoring.inflection_suffixes)?;
    let evaluator = QuestionEvaluator::new(Arc::new(matcher), &config.scoring);

    eprintln!("answerscore v{}: loading models", env!("CARGO_PKG_VERSION"));
    let models = load_models(&config).await?;

    let grader_config = GraderConfig {
        parallelism: parallelism.unwrap_or_else(|| config.parallelism()),
    };
    let mut grader = Grader::new(models, evaluator, grader_config).with_setup_warnings(loaded.warnings);
    if !no_save {
        grader = grader.with_store(Arc::new(JsonFileStore::new(&config.store.path)));
    }

    let request = GradeRequest {
        student_id,
        student_pdf: student,
        reference_pdf: reference,
        assignment,
    };
    let outcome = grader.grade_with_progress(&request, &ConsoleReporter).await?;

    print_summary(&outcome);

    if let Some(path) = output {
        outcome.save_json(&path)?;
        eprintln!("Outcome saved to: {}", path.display());
    }

    Ok(())
}

fn ratio(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}

fn print_summary(outcome: &GradingOutcome) {
    use comfy_table::{Cell, Table};

    for warning in &outcome.warnings {
        eprintln!("Warning: {warning}");
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Question",
        "Points",
        "Earned",
        "Similarity",
        "Coherence",
        "Concepts",
        "Authors",
        "Clarity",
    ]);

    for question in &outcome.questions {
        let mut row = vec![
            Cell::new(&question.label),
            Cell::new(question.points),
            Cell::new(format!("{:.2}", question.earned())),
        ];
        match question.breakdown() {
            Some(b) => row.extend([
                Cell::new(ratio(b.similarity)),
                Cell::new(ratio(b.coherence)),
                Cell::new(ratio(b.concept)),
                Cell::new(ratio(b.author)),
                Cell::new(ratio(b.clarity)),
            ]),
            None => row.extend((0..5).map(|_| Cell::new("missing"))),
        }
        table.add_row(row);
    }
    println!("{table}");

    for question in &outcome.questions {
        let QuestionOutcome::Answered { diagnostics, .. } = &question.outcome else {
            continue;
        };
        if !diagnostics.missing_concepts.is_empty() {
            println!(
                "{}: missing concepts: {}",
                question.label,
                diagnostics.missing_concepts.join(", ")
            );
        }
        if !diagnostics.missing_authors.is_empty() {
            println!(
                "{}: missing authors: {}",
                question.label,
                diagnostics.missing_authors.join(", ")
            );
        }
        for unclear in &diagnostics.unclear_sentences {
            println!(
                "{}: unclear ({:.2}): {}",
                question.label, unclear.score, unclear.sentence
            );
        }
    }

    if let Some(means) = &outcome.means {
        println!(
            "Averages: similarity {}, coherence {}, concepts {}, authors {}, clarity {}",
            ratio(means.similarity),
            ratio(means.coherence),
            ratio(means.concept),
            ratio(means.author),
            ratio(means.clarity)
        );
    }

    println!(
        "Grade: {:.2}/20 ({:.2} of {} points)",
        outcome.grade.grade_out_of_20, outcome.grade.raw_points_earned, outcome.grade.raw_points_possible
    );
    if outcome.unlocked {
        println!("Reference document unlocked");
    } else {
        println!("Reference document withheld (grade must exceed {UNLOCK_THRESHOLD})");
    }

    match &outcome.persistence {
        PersistenceStatus::Saved { key } => println!("Recorded as {key}"),
        PersistenceStatus::Failed { message } => eprintln!("Warning: grade not recorded: {message}"),
        PersistenceStatus::Skipped => {}
    }
}
