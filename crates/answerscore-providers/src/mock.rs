//! Mock model backends for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use answerscore_core::traits::{Classification, Embedder, ZeroShotClassifier};

const DIMENSIONS: usize = 64;

/// A deterministic embedder for running the pipeline without a model server.
///
/// Each lowercase word is hashed into one of 64 buckets, so texts sharing
/// words point the same way and identical texts embed identically. Text
/// without words embeds to the zero vector.
pub struct MockEmbedder {
    failure: Option<String>,
    call_count: AtomicU32,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            failure: None,
            call_count: AtomicU32::new(0),
        }
    }

    /// An embedder whose every call fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            call_count: AtomicU32::new(0),
        }
    }

    /// Get the number of calls made to this embedder.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

/// FNV-1a, stable across runs and platforms.
fn bucket(word: &str) -> usize {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in word.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    (hash % DIMENSIONS as u64) as usize
}

fn bag_of_words(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; DIMENSIONS];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        vector[bucket(&word.to_lowercase())] += 1.0;
    }
    vector
}

#[async_trait]
impl Embedder for MockEmbedder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Some(message) = &self.failure {
            anyhow::bail!("{message}");
        }
        Ok(texts.iter().map(|t| bag_of_words(t)).collect())
    }
}

/// A zero-shot classifier that gives the first label a fixed probability.
///
/// Sentences containing one of the `confusing_markers` get the complement
/// instead, which lets tests steer individual sentences.
pub struct MockClassifier {
    first_label_score: f64,
    confusing_markers: Vec<String>,
    call_count: AtomicU32,
    last_text: Mutex<Option<String>>,
}

impl MockClassifier {
    /// Create a classifier that scores the first label with `score`.
    pub fn with_fixed_score(score: f64) -> Self {
        Self {
            first_label_score: score.clamp(0.0, 1.0),
            confusing_markers: Vec::new(),
            call_count: AtomicU32::new(0),
            last_text: Mutex::new(None),
        }
    }

    /// Sentences containing any of `markers` score `1 - score` instead.
    pub fn with_confusing_markers(mut self, markers: &[&str]) -> Self {
        self.confusing_markers = markers.iter().map(|m| m.to_string()).collect();
        self
    }

    /// Get the number of calls made to this classifier.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last text classified.
    pub fn last_text(&self) -> Option<String> {
        self.last_text.lock().unwrap().clone()
    }
}

#[async_trait]
impl ZeroShotClassifier for MockClassifier {
    fn name(&self) -> &str {
        "mock"
    }

    async fn classify(&self, text: &str, labels: &[String]) -> anyhow::Result<Classification> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_text.lock().unwrap() = Some(text.to_string());

        let confusing = self.confusing_markers.iter().any(|m| text.contains(m.as_str()));
        let first = if confusing {
            1.0 - self.first_label_score
        } else {
            self.first_label_score
        };
        let rest = if labels.len() > 1 {
            (1.0 - first) / (labels.len() - 1) as f64
        } else {
            0.0
        };
        let scores = (0..labels.len())
            .map(|i| if i == 0 { first } else { rest })
            .collect();

        Ok(Classification {
            labels: labels.to_vec(),
            scores,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use answerscore_core::semantic::{cosine_similarity, similarity};

    #[tokio::test]
    async fn identical_texts_embed_identically() {
        let embedder = MockEmbedder::new();
        let score = similarity(&embedder, "Le contrôle des coûts", "le contrôle des coûts")
            .await
            .unwrap();
        assert!((score - 1.0).abs() < 1e-6);
        assert_eq!(embedder.call_count(), 1);
    }

    #[tokio::test]
    async fn shared_words_raise_similarity() {
        let embedder = MockEmbedder::new();
        let texts = vec![
            "planifier organiser diriger".to_string(),
            "planifier organiser controler".to_string(),
            "xyz".to_string(),
        ];
        let v = embedder.embed(&texts).await.unwrap();
        assert!(cosine_similarity(&v[0], &v[1]) > cosine_similarity(&v[0], &v[2]));
    }

    #[tokio::test]
    async fn text_without_words_is_the_zero_vector() {
        let v = MockEmbedder::new()
            .embed(&["  ... ".to_string()])
            .await
            .unwrap();
        assert!(v[0].iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn failing_embedder_fails() {
        let embedder = MockEmbedder::failing("server down");
        let err = embedder.embed(&["a".to_string()]).await.unwrap_err();
        assert_eq!(err.to_string(), "server down");
    }

    #[tokio::test]
    async fn fixed_score_classifier() {
        let classifier = MockClassifier::with_fixed_score(0.8).with_confusing_markers(&["euh"]);
        let labels = vec!["clear".to_string(), "confusing".to_string()];

        let clear = classifier.classify("Une phrase.", &labels).await.unwrap();
        assert_eq!(clear.score_of("clear"), Some(0.8));

        let muddled = classifier.classify("Euh, euh bon.", &labels).await.unwrap();
        assert!((muddled.score_of("clear").unwrap() - 0.2).abs() < 1e-12);
        assert_eq!(classifier.call_count(), 2);
        assert_eq!(classifier.last_text().as_deref(), Some("Euh, euh bon."));
    }
}
