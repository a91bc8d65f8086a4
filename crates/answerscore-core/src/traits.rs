//! Core trait definitions for the models the pipeline calls.
//!
//! These async traits are implemented by the `answerscore-providers` crate
//! (HTTP clients and deterministic mocks). The pipeline only ever sees them
//! through a [`ModelBundle`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Embedding model trait
// ---------------------------------------------------------------------------

/// Trait for sentence-embedding backends.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Human-readable backend name (e.g. "ollama").
    fn name(&self) -> &str;

    /// Embed a batch of texts. Returns exactly one vector per input, in order.
    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    /// Make sure the model is loaded and answering. Called once at startup.
    async fn warm_up(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Zero-shot classifier trait
// ---------------------------------------------------------------------------

/// Trait for zero-shot text classification backends.
#[async_trait]
pub trait ZeroShotClassifier: Send + Sync {
    /// Human-readable backend name (e.g. "huggingface").
    fn name(&self) -> &str;

    /// Score `text` against each candidate label.
    async fn classify(&self, text: &str, labels: &[String]) -> anyhow::Result<Classification>;

    /// Make sure the model is loaded and answering. Called once at startup.
    async fn warm_up(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Output of a zero-shot classification: labels with their probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub labels: Vec<String>,
    pub scores: Vec<f64>,
}

impl Classification {
    /// Probability assigned to `label`, if the classifier returned it.
    pub fn score_of(&self, label: &str) -> Option<f64> {
        self.labels
            .iter()
            .position(|l| l == label)
            .and_then(|i| self.scores.get(i).copied())
    }
}

// ---------------------------------------------------------------------------
// Model bundle
// ---------------------------------------------------------------------------

/// The heavy model handles, built once per process and shared read-only by
/// every evaluation.
#[derive(Clone)]
pub struct ModelBundle {
    pub embedder: Arc<dyn Embedder>,
    pub classifier: Arc<dyn ZeroShotClassifier>,
}

impl ModelBundle {
    /// Bundle two handles without warming them up.
    pub fn new(embedder: Arc<dyn Embedder>, classifier: Arc<dyn ZeroShotClassifier>) -> Self {
        Self {
            embedder,
            classifier,
        }
    }

    /// Bundle two handles and warm both models up concurrently. Returns once
    /// both are ready, or with the first failure.
    pub async fn ready(
        embedder: Arc<dyn Embedder>,
        classifier: Arc<dyn ZeroShotClassifier>,
    ) -> anyhow::Result<Self> {
        let start = std::time::Instant::now();
        tokio::try_join!(embedder.warm_up(), classifier.warm_up())?;
        tracing::info!(
            embedder = embedder.name(),
            classifier = classifier.name(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "models ready"
        );
        Ok(Self::new(embedder, classifier))
    }
}

impl fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBundle")
            .field("embedder", &self.embedder.name())
            .field("classifier", &self.classifier.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingEmbedder(AtomicU32);

    #[async_trait]
    impl Embedder for CountingEmbedder {
        fn name(&self) -> &str {
            "counting"
        }

        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0]).collect())
        }

        async fn warm_up(&self) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct BrokenClassifier;

    #[async_trait]
    impl ZeroShotClassifier for BrokenClassifier {
        fn name(&self) -> &str {
            "broken"
        }

        async fn classify(&self, _: &str, _: &[String]) -> anyhow::Result<Classification> {
            anyhow::bail!("unreachable")
        }

        async fn warm_up(&self) -> anyhow::Result<()> {
            anyhow::bail!("model weights missing")
        }
    }

    struct FixedClassifier;

    #[async_trait]
    impl ZeroShotClassifier for FixedClassifier {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn classify(&self, _: &str, labels: &[String]) -> anyhow::Result<Classification> {
            Ok(Classification {
                labels: labels.to_vec(),
                scores: vec![0.7, 0.3],
            })
        }
    }

    #[test]
    fn score_of_finds_label_by_name() {
        let c = Classification {
            labels: vec!["confusing".into(), "clear".into()],
            scores: vec![0.2, 0.8],
        };
        assert_eq!(c.score_of("clear"), Some(0.8));
        assert_eq!(c.score_of("confusing"), Some(0.2));
        assert_eq!(c.score_of("other"), None);
    }

    #[tokio::test]
    async fn ready_warms_up_both_models() {
        let embedder = Arc::new(CountingEmbedder(AtomicU32::new(0)));
        let bundle = ModelBundle::ready(embedder.clone(), Arc::new(FixedClassifier))
            .await
            .unwrap();
        assert_eq!(embedder.0.load(Ordering::SeqCst), 1);
        assert_eq!(
            format!("{bundle:?}"),
            "ModelBundle { embedder: \"counting\", classifier: \"fixed\" }"
        );
    }

    #[tokio::test]
    async fn ready_fails_when_any_model_fails() {
        let embedder = Arc::new(CountingEmbedder(AtomicU32::new(0)));
        let err = ModelBundle::ready(embedder, Arc::new(BrokenClassifier))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("weights missing"));
    }
}
