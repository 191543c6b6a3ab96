use anyhow::Result;
use std::sync::Arc;
use tracing::warn;

use finder_core::config::LlmSettings;
use finder_core::traits::{TextGenerator, TextStream};
use finder_core::types::{ChatMessage, GenerationRequest, SearchResult};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant that answers questions based on the provided context.
Your responses should be:
1. Accurate and based on the given context
2. Clear and well-structured
3. Honest about uncertainty - if the context doesn't contain enough information, say so

When answering:
- Reference specific parts of the context when relevant
- If multiple sources provide different information, acknowledge this
- Be concise but thorough";

/// Messages of history included in the prompt.
const HISTORY_WINDOW: usize = 6;
const TITLE_MAX_CHARS: usize = 50;
const TITLE_FALLBACK_CHARS: usize = 30;

/// Answer and title generation on top of one text generator.
pub struct LlmService {
    provider: Arc<dyn TextGenerator>,
    temperature: f32,
    max_tokens: u32,
}

impl LlmService {
    pub fn new(provider: Arc<dyn TextGenerator>) -> Self {
        Self { provider, temperature: 0.7, max_tokens: 2048 }
    }

    pub fn with_settings(provider: Arc<dyn TextGenerator>, settings: &LlmSettings) -> Self {
        Self { provider, temperature: settings.temperature, max_tokens: settings.max_tokens }
    }

    pub fn provider(&self) -> &Arc<dyn TextGenerator> { &self.provider }

    pub fn generate_response(&self, question: &str, context: &str, history: &[ChatMessage], system_prompt: Option<&str>) -> Result<String> {
        self.provider.generate(&self.rag_request(question, context, history, system_prompt))
    }

    pub fn generate_response_stream(&self, question: &str, context: &str, history: &[ChatMessage], system_prompt: Option<&str>) -> Result<TextStream> {
        self.provider.generate_stream(&self.rag_request(question, context, history, system_prompt))
    }

    /// Short title for a conversation. Never fails: generation errors fall back
    /// to the start of the message.
    pub fn generate_chat_title(&self, first_message: &str) -> String {
        let prompt = format!(
            "Generate a short, descriptive title (3-6 words) for a conversation that starts with this message:\n\n\"{first_message}\"\n\nRespond with ONLY the title, nothing else."
        );
        let request = GenerationRequest::new(prompt).temperature(0.5).max_tokens(20);
        match self.provider.generate(&request) {
            Ok(raw) => {
                let title = raw.trim().trim_matches(|c| c == '"' || c == '\'').trim();
                if title.is_empty() {
                    warn!("empty title from provider; using message prefix");
                    return fallback_title(first_message);
                }
                title.chars().take(TITLE_MAX_CHARS).collect()
            }
            Err(e) => {
                warn!(error = %e, "title generation failed; using message prefix");
                fallback_title(first_message)
            }
        }
    }

    /// `[Source i: file, Page p]` blocks separated by `---`. Page is omitted when 0.
    pub fn format_context(results: &[SearchResult]) -> String {
        results
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let doc = &r.document;
                let mut source = format!("[Source {}: {}", i + 1, doc.source_file);
                if doc.page_number != 0 { source.push_str(&format!(", Page {}", doc.page_number)); }
                source.push(']');
                format!("{}\n{}", source, doc.content)
            })
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    }

    fn rag_request(&self, question: &str, context: &str, history: &[ChatMessage], system_prompt: Option<&str>) -> GenerationRequest {
        GenerationRequest::new(build_rag_prompt(question, context, history))
            .system(system_prompt.unwrap_or(DEFAULT_SYSTEM_PROMPT))
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
    }
}

/// Prompt for a retrieval-augmented answer. Only the last six history messages are kept.
pub fn build_rag_prompt(question: &str, context: &str, history: &[ChatMessage]) -> String {
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    let history_str = history[start..]
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str().to_uppercase(), m.content))
        .collect::<Vec<_>>()
        .join("\n");
    let context = if context.is_empty() { "No context provided." } else { context };
    let history_str = if history_str.is_empty() { "No previous conversation." } else { history_str.as_str() };
    format!(
        "Based on the following context, please answer the user's question.\n\n\
CONTEXT:\n{context}\n\n\
CONVERSATION HISTORY:\n{history_str}\n\n\
USER QUESTION: {question}\n\n\
Please provide a helpful and accurate response based on the context provided. If the context doesn't contain enough information to fully answer the question, acknowledge this and provide what information you can."
    )
}

fn fallback_title(first_message: &str) -> String {
    if first_message.chars().count() > TITLE_FALLBACK_CHARS {
        format!("{}...", first_message.chars().take(TITLE_FALLBACK_CHARS).collect::<String>())
    } else {
        first_message.to_string()
    }
}
