//! Per-question evaluation.
//!
//! Runs the four scorers on one (reference, student) answer pair and folds
//! the five criteria into a weighted point score.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clarity::{split_into_sentences, ClarityScorer};
use crate::coverage::{author_score, concept_score, TextMatcher};
use crate::model::{
    AuthorScoring, CoverageResult, QuestionDiagnostics, QuestionScoreBreakdown, ScoringConfig,
};
use crate::semantic;
use crate::traits::ModelBundle;

pub const SIMILARITY_WEIGHT: f64 = 0.60;
pub const COHERENCE_WEIGHT: f64 = 0.05;
pub const CONCEPT_WEIGHT: f64 = 0.10;
pub const AUTHOR_WEIGHT: f64 = 0.10;
pub const CLARITY_WEIGHT: f64 = 0.15;

/// Raw criterion scores before clamping and weighting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriterionScores {
    pub similarity: f64,
    pub coherence: f64,
    pub concept: f64,
    pub author: f64,
    pub clarity: f64,
}

impl CriterionScores {
    /// All five criteria at full marks.
    pub const PERFECT: CriterionScores = CriterionScores {
        similarity: 1.0,
        coherence: 1.0,
        concept: 1.0,
        author: 1.0,
        clarity: 1.0,
    };

    /// Clamp every criterion to [0, 1] and weight them against `points`.
    pub fn weigh(&self, points: u32) -> QuestionScoreBreakdown {
        let clamp = |x: f64| if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) };
        let (similarity, coherence, concept, author, clarity) = (
            clamp(self.similarity),
            clamp(self.coherence),
            clamp(self.concept),
            clamp(self.author),
            clamp(self.clarity),
        );
        let weighted_sum = similarity * SIMILARITY_WEIGHT
            + coherence * COHERENCE_WEIGHT
            + concept * CONCEPT_WEIGHT
            + author * AUTHOR_WEIGHT
            + clarity * CLARITY_WEIGHT;
        QuestionScoreBreakdown {
            similarity,
            coherence,
            concept,
            author,
            clarity,
            weighted_points: weighted_sum * points as f64,
        }
    }
}

/// Breakdown and feedback for one answered question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedAnswer {
    pub breakdown: QuestionScoreBreakdown,
    pub diagnostics: QuestionDiagnostics,
}

/// Evaluates student answers against reference answers.
#[derive(Clone)]
pub struct QuestionEvaluator {
    matcher: Arc<dyn TextMatcher>,
    clarity: ClarityScorer,
    author_scoring: AuthorScoring,
}

impl QuestionEvaluator {
    pub fn new(matcher: Arc<dyn TextMatcher>, config: &ScoringConfig) -> Self {
        Self {
            matcher,
            clarity: ClarityScorer::new(&config.clear_label, &config.confusing_label)
                .with_concurrency(config.clarity_concurrency),
            author_scoring: config.author_scoring,
        }
    }

    /// Score one answer. Embedding failures abort; clarity failures degrade
    /// per sentence.
    pub async fn evaluate(
        &self,
        models: &ModelBundle,
        reference_text: &str,
        student_text: &str,
        points: u32,
    ) -> anyhow::Result<EvaluatedAnswer> {
        let embedder = models.embedder.as_ref();
        let sentences = split_into_sentences(student_text);

        let (similarity, coherence, clarity) = tokio::join!(
            semantic::similarity(embedder, reference_text, student_text),
            semantic::coherence(embedder, &sentences),
            self.clarity.score(models.classifier.as_ref(), student_text),
        );
        let similarity = similarity?;
        let coherence = coherence?;

        let reference_coverage = self.matcher.coverage(reference_text);
        let student_coverage = self.matcher.coverage(student_text);

        let scores = CriterionScores {
            similarity,
            coherence,
            concept: concept_score(&reference_coverage, &student_coverage),
            author: author_score(&reference_coverage, &student_coverage, self.author_scoring),
            clarity: clarity.score,
        };

        let mut diagnostics = diagnose(&reference_coverage, &student_coverage);
        diagnostics.unclear_sentences = clarity.unclear;

        Ok(EvaluatedAnswer {
            breakdown: scores.weigh(points),
            diagnostics,
        })
    }
}

/// Which concepts and authors the student covered relative to the reference.
pub fn diagnose(reference: &CoverageResult, student: &CoverageResult) -> QuestionDiagnostics {
    QuestionDiagnostics {
        reference_concepts: reference.found_concepts().map(str::to_string).collect(),
        student_concepts: student
            .concepts
            .iter()
            .filter(|(_, hit)| hit.found)
            .map(|(name, hit)| (name.clone(), hit.matches.clone()))
            .collect(),
        missing_concepts: reference
            .found_concepts()
            .filter(|c| !student.concept_found(c))
            .map(str::to_string)
            .collect(),
        missing_authors: reference
            .found_authors()
            .filter(|a| !student.author_found(a))
            .map(str::to_string)
            .collect(),
        unclear_sentences: Vec::new(),
    }
}
