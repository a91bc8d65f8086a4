//! Core data model types for answerscore.
//!
//! These are the types the whole pipeline passes around: question blocks cut
//! out of a document, the concept/author reference tables, coverage results,
//! and the per-question score breakdown.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One question cut out of a document by the segmenter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionBlock {
    /// Bare label, e.g. "Q3".
    pub label: String,
    /// Point value declared in the marker, e.g. the `5` of "Q3(5)".
    pub points: u32,
    /// Answer body, trimmed.
    pub text: String,
}

impl QuestionBlock {
    /// Numeric part of the label, used to order questions ("Q10" after "Q9").
    pub fn number(&self) -> u64 {
        question_number(&self.label)
    }
}

/// Extract the number from a "Q<n>" label. Unknown shapes sort last.
pub fn question_number(label: &str) -> u64 {
    label
        .strip_prefix('Q')
        .and_then(|n| n.parse().ok())
        .unwrap_or(u64::MAX)
}

/// Questions of one document keyed by bare label.
pub type QuestionSet = HashMap<String, QuestionBlock>;

/// Concept name → ordered verb stems used to build inflected search patterns.
pub type ConceptSpec = BTreeMap<String, Vec<String>>;

/// Author name → textual spelling variants.
pub type AuthorSpec = BTreeMap<String, Vec<String>>;

/// The two domain dictionaries used for coverage scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceTables {
    pub concepts: ConceptSpec,
    pub authors: AuthorSpec,
}

/// Whether a concept was found in a text, with the literal matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptHit {
    pub found: bool,
    /// Matched substrings, as they appear in the text.
    pub matches: Vec<String>,
}

/// Concept and author detection results for one text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageResult {
    /// One entry per concept in the reference table.
    pub concepts: BTreeMap<String, ConceptHit>,
    /// One entry per author in the reference table.
    pub authors: BTreeMap<String, bool>,
}

impl CoverageResult {
    pub fn concept_found(&self, concept: &str) -> bool {
        self.concepts.get(concept).is_some_and(|hit| hit.found)
    }

    pub fn author_found(&self, author: &str) -> bool {
        self.authors.get(author).copied().unwrap_or(false)
    }

    pub fn found_concepts(&self) -> impl Iterator<Item = &str> {
        self.concepts
            .iter()
            .filter(|(_, hit)| hit.found)
            .map(|(name, _)| name.as_str())
    }

    pub fn found_authors(&self) -> impl Iterator<Item = &str> {
        self.authors
            .iter()
            .filter(|(_, found)| **found)
            .map(|(name, _)| name.as_str())
    }
}

/// How the author criterion counts the student's authors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorScoring {
    /// Count every author found in the student text, whether or not the
    /// reference cites it. A student citing unrelated authors still earns
    /// credit.
    #[default]
    AnyStudentAuthor,
    /// Count only authors found in both the reference and the student text.
    OverlapOnly,
}

impl fmt::Display for AuthorScoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorScoring::AnyStudentAuthor => write!(f, "any_student_author"),
            AuthorScoring::OverlapOnly => write!(f, "overlap_only"),
        }
    }
}

impl FromStr for AuthorScoring {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "any_student_author" | "any" => Ok(AuthorScoring::AnyStudentAuthor),
            "overlap_only" | "overlap" => Ok(AuthorScoring::OverlapOnly),
            other => Err(format!("unknown author scoring mode: {other}")),
        }
    }
}

/// Tunable parts of the scoring pipeline.
///
/// Criterion weights and the unlock threshold are constants, not configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Label whose probability is the clarity score.
    #[serde(default = "default_clear_label")]
    pub clear_label: String,
    /// The competing label.
    #[serde(default = "default_confusing_label")]
    pub confusing_label: String,
    /// Endings appended to each verb stem when matching concepts.
    #[serde(default = "default_suffixes")]
    pub inflection_suffixes: Vec<String>,
    #[serde(default)]
    pub author_scoring: AuthorScoring,
    /// Maximum clarity classifications in flight per answer.
    #[serde(default = "default_clarity_concurrency")]
    pub clarity_concurrency: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            clear_label: default_clear_label(),
            confusing_label: default_confusing_label(),
            inflection_suffixes: default_suffixes(),
            author_scoring: AuthorScoring::default(),
            clarity_concurrency: default_clarity_concurrency(),
        }
    }
}

fn default_clarity_concurrency() -> usize {
    4
}

fn default_clear_label() -> String {
    "clear".to_string()
}

fn default_confusing_label() -> String {
    "confusing".to_string()
}

/// French verb-conjugation endings.
pub const FRENCH_SUFFIXES: [&str; 7] = ["", "e", "es", "ons", "ez", "ent", "ant"];

fn default_suffixes() -> Vec<String> {
    FRENCH_SUFFIXES.iter().map(|s| s.to_string()).collect()
}

/// The five criterion scores of one answered question and its weighted points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuestionScoreBreakdown {
    pub similarity: f64,
    pub coherence: f64,
    pub concept: f64,
    pub author: f64,
    pub clarity: f64,
    pub weighted_points: f64,
}

/// Final grade derived from all question scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinalGrade {
    pub raw_points_earned: f64,
    pub raw_points_possible: f64,
    pub grade_out_of_20: f64,
}

/// A sentence the classifier found more confusing than clear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnclearSentence {
    pub sentence: String,
    pub score: f64,
}

/// Feedback attached to an answered question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionDiagnostics {
    /// Concepts the reference answer uses.
    pub reference_concepts: Vec<String>,
    /// Concepts the student used, with the words that matched.
    pub student_concepts: BTreeMap<String, Vec<String>>,
    /// Reference concepts absent from the student answer.
    pub missing_concepts: Vec<String>,
    /// Reference authors absent from the student answer.
    pub missing_authors: Vec<String>,
    pub unclear_sentences: Vec<UnclearSentence>,
}
