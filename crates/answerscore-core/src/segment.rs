//! Question segmentation.
//!
//! Splits extracted document text at `Q<n>(<points>)` markers into labeled
//! question blocks.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{QuestionBlock, QuestionSet};

static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Q(\d+)\((\d+)\)").expect("valid marker regex"));

static BARE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Q\d+").expect("valid label regex"));

/// Split `text` into questions keyed by bare label ("Q1", "Q2", ...).
///
/// Text before the first marker is discarded. Each body runs up to the next
/// marker and is trimmed. When a label appears twice the later block wins.
pub fn split_into_questions(text: &str) -> QuestionSet {
    let markers: Vec<_> = MARKER.captures_iter(text).collect();
    let mut questions = QuestionSet::with_capacity(markers.len());

    for (i, caps) in markers.iter().enumerate() {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let body_end = markers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(text.len());

        let label = format!("Q{}", &caps[1]);
        let points = caps[2].parse::<u32>().unwrap_or_else(|_| {
            tracing::warn!("unparseable point value in marker {}", whole.as_str());
            0
        });
        let body = text[whole.end()..body_end].trim().to_string();

        if questions.contains_key(&label) {
            tracing::warn!("question {label} appears more than once, keeping the last block");
        }
        questions.insert(
            label.clone(),
            QuestionBlock {
                label,
                points,
                text: body,
            },
        );
    }

    questions
}

/// Count occurrences of bare `Q<n>` labels in `text`.
///
/// A cheap sanity check that two documents ask the same number of questions.
pub fn count_question_markers(text: &str) -> usize {
    BARE_LABEL.find_iter(text).count()
}

/// Questions of a set, ordered by question number.
pub fn ordered(questions: &QuestionSet) -> Vec<&QuestionBlock> {
    let mut blocks: Vec<_> = questions.values().collect();
    blocks.sort_by(|a, b| a.number().cmp(&b.number()).then(a.label.cmp(&b.label)));
    blocks
}
