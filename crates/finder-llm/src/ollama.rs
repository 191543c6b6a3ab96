use anyhow::Result;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::io::BufReader;
use std::time::Duration;
use tracing::debug;

use finder_core::error::Error;
use finder_core::traits::{TextGenerator, TextStream};
use finder_core::types::{ChatMessage, GenerationRequest};

use crate::stream::{parse_ndjson_line, LineStream};

/// Local generation through an Ollama server's `/api/chat`.
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(None::<Duration>).build()?;
        Ok(Self { client, base_url: base_url.into().trim_end_matches('/').to_string(), model: model.into() })
    }

    fn send(&self, request: &GenerationRequest, stream: bool) -> Result<reqwest::blocking::Response> {
        let body = ChatRequest {
            model: &self.model,
            messages: request.messages(),
            stream,
            options: ChatOptions { temperature: request.temperature, num_predict: request.max_tokens },
        };
        let url = format!("{}/api/chat", self.base_url);
        debug!(model = %self.model, stream, "ollama request");
        let response = self.client.post(&url).json(&body).send()?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().unwrap_or_default();
            return Err(Error::Operation(format!("Ollama returned {}: {}", status, text)).into());
        }
        Ok(response)
    }
}

impl TextGenerator for OllamaProvider {
    fn name(&self) -> &str { "ollama" }

    fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let response: ChatResponse = self.send(request, false)?.json()?;
        Ok(response.message.content)
    }

    fn generate_stream(&self, request: &GenerationRequest) -> Result<TextStream> {
        let response = self.send(request, true)?;
        Ok(Box::new(LineStream::new(BufReader::new(response), parse_ndjson_line)))
    }
}
