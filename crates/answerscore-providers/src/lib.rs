//! answerscore-providers: Model backend integrations.
//!
//! Implements the `Embedder` and `ZeroShotClassifier` traits over HTTP
//! (Ollama, OpenAI-compatible embeddings, Hugging Face inference) plus
//! deterministic mocks, and loads the `answerscore.toml` configuration.

pub mod config;
pub mod error;
pub mod huggingface;
pub mod mock;
pub mod ollama;
pub mod openai;

pub use config::{
    create_classifier, create_embedder, load_config_from, load_models,
    AnswerscoreConfig, ClassifierConfig, EmbedderConfig,
};
pub use error::ProviderError;
