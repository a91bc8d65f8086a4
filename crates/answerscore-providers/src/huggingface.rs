//! Hugging Face inference backend for zero-shot classification.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use answerscore_core::traits::{Classification, ZeroShotClassifier};

use crate::error::{status_error, ProviderError};

pub(crate) const DEFAULT_BASE_URL: &str = "https://router.huggingface.co/hf-inference";
pub(crate) const DEFAULT_MODEL: &str = "facebook/bart-large-mnli";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const WARM_UP_ATTEMPTS: u32 = 5;
const MAX_LOADING_WAIT_SECS: f64 = 30.0;

/// Zero-shot classification through the Hugging Face inference API or a
/// self-hosted server exposing the same route.
pub struct HfZeroShotClassifier {
    base_url: String,
    model: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HfZeroShotClassifier {
    pub fn new(base_url: Option<String>, model: Option<String>, token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");

        Self {
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            token: token.filter(|t| !t.is_empty()),
            client,
        }
    }
}

#[derive(Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a str,
    parameters: ZeroShotParameters<'a>,
}

#[derive(Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [String],
    multi_label: bool,
}

/// Servers answer either column-wise or as a list of label/score pairs.
#[derive(Deserialize)]
#[serde(untagged)]
enum ZeroShotResponse {
    Columns { labels: Vec<String>, scores: Vec<f64> },
    Rows(Vec<LabelScore>),
}

#[derive(Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

#[derive(Deserialize)]
struct LoadingResponse {
    #[serde(default)]
    estimated_time: Option<f64>,
}

impl From<ZeroShotResponse> for Classification {
    fn from(response: ZeroShotResponse) -> Self {
        match response {
            ZeroShotResponse::Columns { labels, scores } => Classification { labels, scores },
            ZeroShotResponse::Rows(rows) => {
                let (labels, scores) = rows.into_iter().map(|r| (r.label, r.score)).unzip();
                Classification { labels, scores }
            }
        }
    }
}

#[async_trait]
impl ZeroShotClassifier for HfZeroShotClassifier {
    fn name(&self) -> &str {
        "huggingface"
    }

    #[instrument(skip(self, text, labels), fields(model = %self.model))]
    async fn classify(&self, text: &str, labels: &[String]) -> anyhow::Result<Classification> {
        let body = ZeroShotRequest {
            inputs: text,
            parameters: ZeroShotParameters {
                candidate_labels: labels,
                multi_label: false,
            },
        };

        let mut req = self
            .client
            .post(format!("{}/models/{}", self.base_url, self.model))
            .json(&body);
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(DEFAULT_TIMEOUT_SECS)
            } else {
                ProviderError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status == 503 {
            let body = response.text().await.unwrap_or_default();
            if let Ok(LoadingResponse {
                estimated_time: Some(estimated_secs),
            }) = serde_json::from_str(&body)
            {
                return Err(ProviderError::ModelLoading { estimated_secs }.into());
            }
            return Err(status_error(status, body, &self.model).into());
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body, &self.model).into());
        }

        let api_response: ZeroShotResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status: 0,
                message: format!("failed to parse response: {e}"),
            })?;
        let classification = Classification::from(api_response);
        if classification.labels.len() != classification.scores.len() {
            return Err(ProviderError::InvalidResponse(format!(
                "{} labels but {} scores",
                classification.labels.len(),
                classification.scores.len()
            ))
            .into());
        }
        Ok(classification)
    }

    /// Classify a probe sentence, waiting for the model while the server
    /// reports it as loading.
    async fn warm_up(&self) -> anyhow::Result<()> {
        let labels = ["clear".to_string(), "confusing".to_string()];
        let mut attempt = 1;
        loop {
            match self.classify("warm-up", &labels).await {
                Ok(_) => {
                    tracing::info!(model = %self.model, "zero-shot classifier ready");
                    return Ok(());
                }
                Err(e) => {
                    let loading = match e.downcast_ref::<ProviderError>() {
                        Some(ProviderError::ModelLoading { estimated_secs }) => Some(*estimated_secs),
                        _ => None,
                    };
                    let wait = match loading {
                        Some(secs) if attempt < WARM_UP_ATTEMPTS => {
                            secs.clamp(0.0, MAX_LOADING_WAIT_SECS)
                        }
                        _ => return Err(e),
                    };
                    tracing::info!(
                        model = %self.model,
                        attempt,
                        "classifier loading, retrying in {wait:.1}s"
                    );
                    tokio::time::sleep(Duration::from_secs_f64(wait)).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn labels() -> Vec<String> {
        vec!["clear".into(), "confusing".into()]
    }

    #[tokio::test]
    async fn column_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/models/facebook/bart-large-mnli"))
            .and(header("Authorization", "Bearer hf_test"))
            .and(body_json(serde_json::json!({
                "inputs": "La phrase est claire.",
                "parameters": {"candidate_labels": ["clear", "confusing"], "multi_label": false}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sequence": "La phrase est claire.",
                "labels": ["clear", "confusing"],
                "scores": [0.91, 0.09]
            })))
            .mount(&server)
            .await;

        let classifier =
            HfZeroShotClassifier::new(Some(server.uri()), None, Some("hf_test".into()));
        let result = classifier
            .classify("La phrase est claire.", &labels())
            .await
            .unwrap();
        assert_eq!(result.score_of("clear"), Some(0.91));
    }

    #[tokio::test]
    async fn row_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/models/local/nli"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"label": "confusing", "score": 0.7},
                {"label": "clear", "score": 0.3}
            ])))
            .mount(&server)
            .await;

        let classifier =
            HfZeroShotClassifier::new(Some(server.uri()), Some("local/nli".into()), None);
        let result = classifier.classify("Hmm.", &labels()).await.unwrap();
        assert_eq!(result.score_of("clear"), Some(0.3));
        assert_eq!(result.score_of("confusing"), Some(0.7));
    }

    #[tokio::test]
    async fn loading_model_is_classified() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "error": "Model facebook/bart-large-mnli is currently loading",
                "estimated_time": 20.0
            })))
            .mount(&server)
            .await;

        let classifier = HfZeroShotClassifier::new(Some(server.uri()), None, None);
        let err = classifier.classify("x", &labels()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProviderError>(),
            Some(ProviderError::ModelLoading { .. })
        ));
    }

    #[tokio::test]
    async fn warm_up_waits_for_loading_model() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "error": "loading",
                "estimated_time": 0.01
            })))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "labels": ["clear", "confusing"],
                "scores": [0.5, 0.5]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let classifier = HfZeroShotClassifier::new(Some(server.uri()), None, None);
        classifier.warm_up().await.unwrap();
    }

    #[tokio::test]
    async fn warm_up_gives_up_on_auth_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
            .expect(1)
            .mount(&server)
            .await;

        let classifier = HfZeroShotClassifier::new(Some(server.uri()), None, Some("bad".into()));
        let err = classifier.warm_up().await.unwrap_err();
        assert!(err.to_string().contains("authentication failed"));
    }

    #[tokio::test]
    async fn mismatched_columns_are_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "labels": ["clear", "confusing"],
                "scores": [1.0]
            })))
            .mount(&server)
            .await;

        let classifier = HfZeroShotClassifier::new(Some(server.uri()), None, None);
        let err = classifier.classify("x", &labels()).await.unwrap_err();
        assert!(err.to_string().contains("2 labels but 1 scores"));
    }
}
