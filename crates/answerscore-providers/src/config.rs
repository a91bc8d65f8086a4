//! Configuration and model factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use answerscore_core::model::ScoringConfig;
use answerscore_core::traits::{Embedder, ModelBundle, ZeroShotClassifier};

use crate::huggingface::{self, HfZeroShotClassifier};
use crate::mock::{MockClassifier, MockEmbedder};
use crate::ollama::{self, OllamaEmbedder};
use crate::openai::OpenAiEmbedder;

/// Which embedding backend to use.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EmbedderConfig {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        #[serde(default = "default_ollama_model")]
        model: String,
    },
    OpenAI {
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        model: Option<String>,
    },
    /// Deterministic bag-of-words embeddings; no server needed.
    Mock,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        EmbedderConfig::Ollama {
            base_url: default_ollama_url(),
            model: default_ollama_model(),
        }
    }
}

impl std::fmt::Debug for EmbedderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbedderConfig::Ollama { base_url, model } => f
                .debug_struct("Ollama")
                .field("base_url", base_url)
                .field("model", model)
                .finish(),
            EmbedderConfig::OpenAI {
                api_key: _,
                base_url,
                model,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("model", model)
                .finish(),
            EmbedderConfig::Mock => f.write_str("Mock"),
        }
    }
}

/// Which zero-shot classification backend to use.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClassifierConfig {
    HuggingFace {
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        token: Option<String>,
    },
    /// Fixed-probability classifier; no server needed.
    Mock {
        #[serde(default = "default_mock_clarity")]
        clear_score: f64,
    },
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig::HuggingFace {
            base_url: None,
            model: None,
            token: None,
        }
    }
}

impl std::fmt::Debug for ClassifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifierConfig::HuggingFace {
                base_url,
                model,
                token,
            } => f
                .debug_struct("HuggingFace")
                .field("base_url", base_url)
                .field("model", model)
                .field("token", &token.as_ref().map(|_| "***"))
                .finish(),
            ClassifierConfig::Mock { clear_score } => f
                .debug_struct("Mock")
                .field("clear_score", clear_score)
                .finish(),
        }
    }
}

fn default_ollama_url() -> String {
    ollama::DEFAULT_BASE_URL.to_string()
}
fn default_ollama_model() -> String {
    ollama::DEFAULT_MODEL.to_string()
}
fn default_mock_clarity() -> f64 {
    0.9
}

/// Locations of the concept and author tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    #[serde(default = "default_concepts_path")]
    pub concepts: PathBuf,
    #[serde(default = "default_authors_path")]
    pub authors: PathBuf,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            concepts: default_concepts_path(),
            authors: default_authors_path(),
        }
    }
}

fn default_concepts_path() -> PathBuf {
    PathBuf::from("data/concepts.json")
}
fn default_authors_path() -> PathBuf {
    PathBuf::from("data/authors.json")
}

/// Where grade history is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("grades.json")
}

/// Top-level answerscore configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerscoreConfig {
    #[serde(default)]
    pub embedder: EmbedderConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub reference: ReferenceConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Max questions evaluated at once. 0 means the default.
    #[serde(default)]
    pub parallelism: usize,
}

impl AnswerscoreConfig {
    pub fn parallelism(&self) -> usize {
        if self.parallelism == 0 {
            4
        } else {
            self.parallelism
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
/// Unset variables resolve to the empty string.
fn resolve_env_vars(s: &str) -> String {
    substitute_vars(s, |name| std::env::var(name).ok())
}

/// Substituted values are inserted verbatim and never scanned again.
fn substitute_vars(s: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        result.push_str(&lookup(&rest[start + 2..start + end]).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_opt(s: &Option<String>) -> Option<String> {
    s.as_ref().map(|v| resolve_env_vars(v))
}

fn resolve_embedder(config: &EmbedderConfig) -> EmbedderConfig {
    match config {
        EmbedderConfig::Ollama { base_url, model } => EmbedderConfig::Ollama {
            base_url: resolve_env_vars(base_url),
            model: resolve_env_vars(model),
        },
        EmbedderConfig::OpenAI {
            api_key,
            base_url,
            model,
        } => EmbedderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: resolve_opt(base_url),
            model: resolve_opt(model),
        },
        EmbedderConfig::Mock => EmbedderConfig::Mock,
    }
}

fn resolve_classifier(config: &ClassifierConfig) -> ClassifierConfig {
    match config {
        ClassifierConfig::HuggingFace {
            base_url,
            model,
            token,
        } => ClassifierConfig::HuggingFace {
            base_url: resolve_opt(base_url),
            model: resolve_opt(model),
            token: resolve_opt(token),
        },
        ClassifierConfig::Mock { clear_score } => ClassifierConfig::Mock {
            clear_score: *clear_score,
        },
    }
}

/// Apply `ANSWERSCORE_OPENAI_KEY` / `ANSWERSCORE_HF_TOKEN` overrides, read
/// through `lookup`. Overrides only touch the backend they belong to.
fn apply_overrides(config: &mut AnswerscoreConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(key) = lookup("ANSWERSCORE_OPENAI_KEY") {
        if let EmbedderConfig::OpenAI { api_key, .. } = &mut config.embedder {
            *api_key = key;
        }
    }
    if let Some(hf_token) = lookup("ANSWERSCORE_HF_TOKEN") {
        if let ClassifierConfig::HuggingFace { token, .. } = &mut config.classifier {
            *token = Some(hf_token);
        }
    }
}

/// Load config from an explicit path, or search the default locations:
/// 1. `answerscore.toml` in the current directory
/// 2. `~/.config/answerscore/config.toml`
///
/// Environment variable overrides: `ANSWERSCORE_OPENAI_KEY`, `ANSWERSCORE_HF_TOKEN`.
pub fn load_config_from(path: Option<&Path>) -> Result<AnswerscoreConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("answerscore.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match &config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => AnswerscoreConfig::default(),
    };
    tracing::debug!(path = ?config_path, "configuration loaded");

    apply_overrides(&mut config, |name| std::env::var(name).ok());
    config.embedder = resolve_embedder(&config.embedder);
    config.classifier = resolve_classifier(&config.classifier);

    Ok(config)
}

/// Parse a TOML configuration document.
pub fn parse_config(content: &str) -> Result<AnswerscoreConfig> {
    toml::from_str(content).map_err(Into::into)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("answerscore"))
}

/// Create an embedder instance from its configuration.
pub fn create_embedder(config: &EmbedderConfig) -> Result<Arc<dyn Embedder>> {
    match config {
        EmbedderConfig::Ollama { base_url, model } => {
            Ok(Arc::new(OllamaEmbedder::new(base_url, model)))
        }
        EmbedderConfig::OpenAI {
            api_key,
            base_url,
            model,
        } => {
            if api_key.is_empty() {
                anyhow::bail!(
                    "the openai embedder needs an api_key (or set ANSWERSCORE_OPENAI_KEY)"
                );
            }
            Ok(Arc::new(OpenAiEmbedder::new(
                api_key,
                base_url.clone(),
                model.clone(),
            )))
        }
        EmbedderConfig::Mock => Ok(Arc::new(MockEmbedder::new())),
    }
}

/// Create a classifier instance from its configuration.
pub fn create_classifier(config: &ClassifierConfig) -> Result<Arc<dyn ZeroShotClassifier>> {
    match config {
        ClassifierConfig::HuggingFace {
            base_url,
            model,
            token,
        } => {
            if token.is_none() && base_url.is_none() {
                tracing::warn!(
                    "no Hugging Face token set; requests to {} may be rejected",
                    huggingface::DEFAULT_BASE_URL
                );
            }
            Ok(Arc::new(HfZeroShotClassifier::new(
                base_url.clone(),
                model.clone(),
                token.clone(),
            )))
        }
        ClassifierConfig::Mock { clear_score } => {
            Ok(Arc::new(MockClassifier::with_fixed_score(*clear_score)))
        }
    }
}

/// Build both model handles and wait until both answer.
pub async fn load_models(config: &AnswerscoreConfig) -> Result<ModelBundle> {
    let embedder = create_embedder(&config.embedder)?;
    let classifier = create_classifier(&config.classifier)?;
    ModelBundle::ready(embedder, classifier)
        .await
        .context("failed to warm up models")
}
