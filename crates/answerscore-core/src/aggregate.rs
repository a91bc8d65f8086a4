//! Grade aggregation.
//!
//! Folds weighted question scores into a grade out of 20, decides whether
//! the reference document unlocks, and computes the history key a new grade
//! is stored under.

use serde::{Deserialize, Serialize};

use crate::model::{FinalGrade, QuestionScoreBreakdown};

/// Grades strictly above this unlock the reference document.
pub const UNLOCK_THRESHOLD: f64 = 16.0;

/// Maximum grade.
pub const GRADE_SCALE: f64 = 20.0;

/// Scale earned points against the reference's total points.
///
/// `earned` holds one entry per reference question: its weighted points, or
/// 0 when the student did not answer it. `possible` is the sum of all
/// reference point values.
pub fn final_grade(earned: impl IntoIterator<Item = f64>, possible: u64) -> FinalGrade {
    let raw_points_earned: f64 = earned.into_iter().sum();
    let raw_points_possible = possible as f64;
    let grade_out_of_20 = if possible == 0 {
        0.0
    } else {
        (GRADE_SCALE * raw_points_earned / raw_points_possible).clamp(0.0, GRADE_SCALE)
    };
    FinalGrade {
        raw_points_earned,
        raw_points_possible,
        grade_out_of_20,
    }
}

/// Whether `grade` is high enough to reveal the reference document.
pub fn unlocks_reference(grade: f64) -> bool {
    grade > UNLOCK_THRESHOLD
}

/// History index encoded by `key` for `base`: 1 for the bare key, N for
/// `base<N>`, `None` for unrelated keys.
fn history_index(base: &str, key: &str) -> Option<u64> {
    let suffix = key.strip_prefix(base)?;
    if suffix.is_empty() {
        return Some(1);
    }
    if suffix.bytes().all(|b| b.is_ascii_digit()) {
        return suffix.parse().ok();
    }
    None
}

/// Key under which the next grade for `base` goes so that no earlier grade is
/// overwritten: `base` the first time, then `base2`, `base3`, ...
pub fn next_grade_key<'a>(base: &str, existing: impl IntoIterator<Item = &'a str>) -> String {
    let highest = existing
        .into_iter()
        .filter_map(|key| history_index(base, key))
        .max();
    match highest {
        None => base.to_string(),
        Some(n) => format!("{base}{}", n.saturating_add(1).max(2)),
    }
}

/// Mean of each criterion over the answered questions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriterionMeans {
    pub similarity: f64,
    pub coherence: f64,
    pub concept: f64,
    pub author: f64,
    pub clarity: f64,
}

impl CriterionMeans {
    /// `None` when nothing was answered.
    pub fn of<'a>(
        breakdowns: impl IntoIterator<Item = &'a QuestionScoreBreakdown>,
    ) -> Option<Self> {
        let breakdowns: Vec<_> = breakdowns.into_iter().collect();
        if breakdowns.is_empty() {
            return None;
        }
        let n = breakdowns.len() as f64;
        let mean = |f: fn(&QuestionScoreBreakdown) -> f64| {
            breakdowns.iter().map(|b| f(b)).sum::<f64>() / n
        };
        Some(Self {
            similarity: mean(|b| b.similarity),
            coherence: mean(|b| b.coherence),
            concept: mean(|b| b.concept),
            author: mean(|b| b.author),
            clarity: mean(|b| b.clarity),
        })
    }
}
