//! Line-oriented streaming bodies: server-sent events (OpenAI-compatible
//! APIs) and newline-delimited JSON (Ollama).

use anyhow::Result;
use serde::Deserialize;
use std::io::{BufRead, Lines};

/// One decoded line: optional text, and whether the stream has ended.
#[derive(Debug, Default, PartialEq)]
pub struct Chunk {
    pub text: Option<String>,
    pub done: bool,
}

pub type ParseLine = fn(&str) -> Result<Chunk>;

/// Text fragments decoded line by line from `reader`. Stops after the end
/// marker or the first error.
pub struct LineStream<R: BufRead> {
    lines: Lines<R>,
    parse: ParseLine,
    finished: bool,
}

impl<R: BufRead> LineStream<R> {
    pub fn new(reader: R, parse: ParseLine) -> Self {
        Self { lines: reader.lines(), parse, finished: false }
    }
}

impl<R: BufRead> Iterator for LineStream<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished { return None; }
        for line in self.lines.by_ref() {
            let chunk = match line.map_err(anyhow::Error::from).and_then(|l| (self.parse)(&l)) {
                Ok(chunk) => chunk,
                Err(e) => { self.finished = true; return Some(Err(e)); }
            };
            let Chunk { text, done } = chunk;
            if done { self.finished = true; }
            match text {
                Some(text) if !text.is_empty() => return Some(Ok(text)),
                _ if done => return None,
                _ => continue,
            }
        }
        self.finished = true;
        None
    }
}

#[derive(Deserialize)]
struct SseDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct SseChoice {
    delta: SseDelta,
}

#[derive(Deserialize)]
struct SseEvent {
    #[serde(default)]
    choices: Vec<SseChoice>,
}

/// `data: {...}` lines of a chat-completions stream; `data: [DONE]` ends it.
/// Comments, blank lines and other fields are skipped.
pub fn parse_sse_line(line: &str) -> Result<Chunk> {
    let Some(payload) = line.trim().strip_prefix("data:") else { return Ok(Chunk::default()) };
    let payload = payload.trim();
    if payload == "[DONE]" { return Ok(Chunk { text: None, done: true }); }
    let event: SseEvent = serde_json::from_str(payload)?;
    let text = event.choices.into_iter().next().and_then(|c| c.delta.content);
    Ok(Chunk { text, done: false })
}

#[derive(Deserialize)]
struct NdjsonMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct NdjsonEvent {
    #[serde(default)]
    message: Option<NdjsonMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

/// One JSON object per line with `message.content` and a final `done: true`.
pub fn parse_ndjson_line(line: &str) -> Result<Chunk> {
    let line = line.trim();
    if line.is_empty() { return Ok(Chunk::default()); }
    let event: NdjsonEvent = serde_json::from_str(line)?;
    if let Some(error) = event.error { anyhow::bail!("ollama: {}", error); }
    Ok(Chunk { text: event.message.map(|m| m.content), done: event.done })
}
