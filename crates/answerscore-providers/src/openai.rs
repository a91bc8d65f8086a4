//! OpenAI-compatible embeddings backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use answerscore_core::traits::Embedder;

use crate::error::{status_error, ProviderError};

pub(crate) const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub(crate) const DEFAULT_MODEL: &str = "text-embedding-3-small";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Embeddings from any server speaking the OpenAI `/v1/embeddings` API.
pub struct OpenAiEmbedder {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiEmbedder {
    pub fn new(api_key: &str, base_url: Option<String>, model: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");

        Self {
            api_key: api_key.to_string(),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            client,
        }
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingEntry>,
}

#[derive(Deserialize)]
struct EmbeddingEntry {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, texts), fields(model = %self.model, inputs = texts.len()))]
    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = EmbeddingsRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(DEFAULT_TIMEOUT_SECS)
                } else {
                    ProviderError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status == 429 {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(1000);
            return Err(ProviderError::RateLimited { retry_after_ms }.into());
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body, &self.model).into());
        }

        let api_response: EmbeddingsResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status: 0,
                message: format!("failed to parse response: {e}"),
            })?;

        // Entries carry their input index; order by it rather than trusting
        // the array order.
        let mut slots: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        for entry in api_response.data {
            let Some(slot) = slots.get_mut(entry.index) else {
                return Err(ProviderError::InvalidResponse(format!(
                    "embedding index {} out of range for {} inputs",
                    entry.index,
                    texts.len()
                ))
                .into());
            };
            *slot = Some(entry.embedding);
        }
        let vectors: Option<Vec<Vec<f32>>> = slots.into_iter().collect();
        vectors.ok_or_else(|| {
            ProviderError::InvalidResponse("response is missing embeddings".into()).into()
        })
    }

    async fn warm_up(&self) -> anyhow::Result<()> {
        self.embed(&["warm-up".to_string()]).await?;
        tracing::info!(model = %self.model, "openai embedder ready");
        Ok(())
    }
}
