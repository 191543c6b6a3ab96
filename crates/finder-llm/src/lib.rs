//! Text generation: hosted (Groq) and local (Ollama) providers, query
//! expansion, and answer/title generation.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use finder_core::config::{LlmProviderKind, LlmSettings};
use finder_core::traits::TextGenerator;

pub mod expand;
pub mod groq;
pub mod ollama;
pub mod service;
pub mod stream;

pub use expand::{parse_variants, QueryExpander, DEFAULT_NUM_QUERIES};
pub use groq::GroqProvider;
pub use ollama::OllamaProvider;
pub use service::{build_rag_prompt, LlmService, DEFAULT_SYSTEM_PROMPT};

/// The configured provider, chosen once here rather than per call.
pub fn provider_from_settings(settings: &LlmSettings) -> Result<Arc<dyn TextGenerator>> {
    let provider: Arc<dyn TextGenerator> = match settings.provider {
        LlmProviderKind::Groq => Arc::new(GroqProvider::new(settings.groq_api_key.clone(), &settings.groq_model, &settings.groq_base_url)?),
        LlmProviderKind::Ollama => Arc::new(OllamaProvider::new(&settings.ollama_base_url, &settings.ollama_model)?),
    };
    info!(provider = provider.name(), "text generator ready");
    Ok(provider)
}
