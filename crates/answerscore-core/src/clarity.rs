//! Sentence clarity via zero-shot classification.

use futures::stream::{self, StreamExt};

use crate::model::UnclearSentence;
use crate::traits::ZeroShotClassifier;

/// Score substituted for a sentence the classifier could not handle.
pub const NEUTRAL_CLARITY: f64 = 0.5;

/// Split text after `.`, `!` or `?` when followed by whitespace. Pieces are
/// trimmed and empty ones dropped.
pub fn split_into_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        if let Some(&(next_idx, next)) = chars.peek() {
            if next.is_whitespace() {
                sentences.push(&text[start..next_idx]);
                start = next_idx;
            }
        }
    }
    sentences.push(&text[start..]);

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Clarity of a whole text.
#[derive(Debug, Clone, PartialEq)]
pub struct ClarityReport {
    /// Mean sentence clarity; 0.0 for a text without sentences.
    pub score: f64,
    /// Sentences scoring below the neutral point.
    pub unclear: Vec<UnclearSentence>,
}

/// Classifies sentences as clear or confusing.
#[derive(Debug, Clone)]
pub struct ClarityScorer {
    labels: [String; 2],
    concurrency: usize,
}

impl ClarityScorer {
    pub fn new(clear_label: impl Into<String>, confusing_label: impl Into<String>) -> Self {
        Self {
            labels: [clear_label.into(), confusing_label.into()],
            concurrency: 4,
        }
    }

    /// Cap on classifier calls in flight for one text. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    fn clear_label(&self) -> &str {
        &self.labels[0]
    }

    /// Probability that `sentence` reads as clear, or the neutral score when
    /// the classifier fails or omits the label.
    pub async fn sentence_clarity(&self, classifier: &dyn ZeroShotClassifier, sentence: &str) -> f64 {
        match classifier.classify(sentence, &self.labels).await {
            Ok(classification) => match classification.score_of(self.clear_label()) {
                Some(score) => score.clamp(0.0, 1.0),
                None => {
                    tracing::warn!(
                        "{} returned no '{}' label, using neutral clarity",
                        classifier.name(),
                        self.clear_label()
                    );
                    NEUTRAL_CLARITY
                }
            },
            Err(e) => {
                tracing::warn!("clarity classification failed, using neutral clarity: {e:#}");
                NEUTRAL_CLARITY
            }
        }
    }

    /// Mean clarity over the sentences of `text`. Sentences are classified
    /// concurrently, at most `concurrency` at a time, and keep their order.
    pub async fn score(&self, classifier: &dyn ZeroShotClassifier, text: &str) -> ClarityReport {
        let sentences = split_into_sentences(text);
        if sentences.is_empty() {
            return ClarityReport {
                score: 0.0,
                unclear: Vec::new(),
            };
        }

        let scores: Vec<f64> = stream::iter(&sentences)
            .map(|sentence| self.sentence_clarity(classifier, sentence))
            .buffered(self.concurrency)
            .collect()
            .await;

        let unclear = sentences
            .iter()
            .zip(&scores)
            .filter(|(_, score)| **score < NEUTRAL_CLARITY)
            .map(|(sentence, &score)| UnclearSentence {
                sentence: sentence.clone(),
                score,
            })
            .collect();

        ClarityReport {
            score: scores.iter().sum::<f64>() / scores.len() as f64,
            unclear,
        }
    }
}

impl Default for ClarityScorer {
    fn default() -> Self {
        Self::new("clear", "confusing")
    }
}
