use anyhow::{anyhow, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::io::BufReader;
use std::time::Duration;
use tracing::debug;

use finder_core::error::Error;
use finder_core::traits::{TextGenerator, TextStream};
use finder_core::types::{ChatMessage, GenerationRequest};

use crate::stream::{parse_sse_line, LineStream};

/// Hosted chat completions over the OpenAI-compatible Groq API.
pub struct GroqProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

impl GroqProvider {
    /// Fails with `InvalidConfig` when no API key is given and `GROQ_API_KEY` is unset.
    pub fn new(api_key: Option<String>, model: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("GROQ_API_KEY").ok().filter(|k| !k.trim().is_empty()))
            .ok_or_else(|| {
                Error::InvalidConfig(
                    "Groq API key is required. Set llm.groq_api_key, APP_LLM__GROQ_API_KEY or GROQ_API_KEY".into(),
                )
            })?;
        let client = Client::builder().timeout(None::<Duration>).build()?;
        Ok(Self { client, api_key, model: model.into(), base_url: base_url.into().trim_end_matches('/').to_string() })
    }

    fn send(&self, request: &GenerationRequest, stream: bool) -> Result<reqwest::blocking::Response> {
        let body = CompletionRequest {
            model: &self.model,
            messages: request.messages(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
        };
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, stream, "groq request");
        let response = self.client.post(&url).bearer_auth(&self.api_key).json(&body).send()?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().unwrap_or_default();
            return Err(Error::Operation(format!("Groq returned {}: {}", status, text)).into());
        }
        Ok(response)
    }
}

impl TextGenerator for GroqProvider {
    fn name(&self) -> &str { "groq" }

    fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let response: CompletionResponse = self.send(request, false)?.json()?;
        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| anyhow!("Groq response had no choices"))
    }

    fn generate_stream(&self, request: &GenerationRequest) -> Result<TextStream> {
        let response = self.send(request, true)?;
        Ok(Box::new(LineStream::new(BufReader::new(response), parse_sse_line)))
    }
}
