//! Ollama (local) embedding backend.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use answerscore_core::traits::Embedder;

use crate::error::{status_error, ProviderError};

pub(crate) const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub(crate) const DEFAULT_MODEL: &str = "paraphrase-multilingual";
const DEFAULT_TIMEOUT_SECS: u64 = 300; // First call loads the model

/// Embeddings from a local Ollama server.
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str) -> Self {
        let base = if base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            base_url
        };
        let model = if model.is_empty() { DEFAULT_MODEL } else { model };

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");

        Self {
            base_url: base.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip(self, texts), fields(model = %self.model, inputs = texts.len()))]
    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();

        let body = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(DEFAULT_TIMEOUT_SECS)
                } else if e.is_connect() {
                    ProviderError::NetworkError(format!(
                        "Ollama not reachable at {}. Is it running? Start with: ollama serve",
                        self.base_url
                    ))
                } else {
                    ProviderError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status == 404 {
            return Err(ProviderError::ModelNotFound(format!(
                "Model '{}' not found locally. Pull it with: ollama pull {}",
                self.model, self.model
            ))
            .into());
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body, &self.model).into());
        }

        let api_response: EmbedResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status: 0,
                message: format!("failed to parse response: {e}"),
            })?;

        if api_response.embeddings.len() != texts.len() {
            return Err(ProviderError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                api_response.embeddings.len()
            ))
            .into());
        }

        tracing::debug!(latency_ms = start.elapsed().as_millis() as u64, "embedded batch");
        Ok(api_response.embeddings)
    }

    async fn warm_up(&self) -> anyhow::Result<()> {
        let vectors = self.embed(&["warm-up".to_string()]).await?;
        let dimensions = vectors.first().map_or(0, Vec::len);
        if dimensions == 0 {
            return Err(ProviderError::InvalidResponse("empty embedding".into()).into());
        }
        tracing::info!(model = %self.model, dimensions, "ollama embedder ready");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn successful_embedding() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .and(body_json(serde_json::json!({
                "model": "paraphrase-multilingual",
                "input": ["bonjour", "au revoir"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "paraphrase-multilingual",
                "embeddings": [[0.1, 0.2, 0.3], [0.3, 0.2, 0.1]]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let embedder = OllamaEmbedder::new(&server.uri(), "");
        let vectors = embedder
            .embed(&texts(&["bonjour", "au revoir"]))
            .await
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[1], vec![0.3, 0.2, 0.1]);
    }

    #[tokio::test]
    async fn empty_batch_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let embedder = OllamaEmbedder::new(&server.uri(), "m");
        assert!(embedder.embed(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn model_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let embedder = OllamaEmbedder::new(&server.uri(), "nonexistent");
        let err = embedder.embed(&texts(&["x"])).await.unwrap_err();
        assert!(err.to_string().contains("ollama pull nonexistent"));
    }

    #[tokio::test]
    async fn short_response_is_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [[1.0]]
            })))
            .mount(&server)
            .await;

        let embedder = OllamaEmbedder::new(&server.uri(), "m");
        let err = embedder.embed(&texts(&["a", "b"])).await.unwrap_err();
        assert!(err.to_string().contains("expected 2 embeddings, got 1"));
    }

    #[tokio::test]
    async fn warm_up_embeds_a_probe() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [[0.5, 0.5]]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let embedder = OllamaEmbedder::new(&server.uri(), "m");
        embedder.warm_up().await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let embedder = OllamaEmbedder::new("http://127.0.0.1:1", "m");
        let err = embedder.embed(&texts(&["x"])).await.unwrap_err();
        assert!(err.to_string().contains("network error"));
    }
}
