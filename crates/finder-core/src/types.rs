//! Domain types shared by the lexical, vector and hybrid engines.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub type ChunkId = String;
pub type Meta = HashMap<String, String>;

/// Classification of a chunk's payload as produced by the extraction layer.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Text,
    Table,
    Image,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Table => "table",
            ContentType::Image => "image",
        }
    }

    /// Lenient parse used when rebuilding documents from stored metadata.
    /// Unknown values fall back to `Text`.
    pub fn parse(s: &str) -> Self {
        match s {
            "table" => ContentType::Table,
            "image" => ContentType::Image,
            _ => ContentType::Text,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable, independently indexed piece of a source document.
///
/// - `id`: unique within a conversation; the join key across engines
/// - `content`: the text payload that is tokenized and embedded
/// - `content_type`: text, table or image description
/// - `metadata`: free-form key/value pairs carried through untouched
/// - `source_file`/`page_number`/`chunk_index`: provenance within the parent file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: ChunkId,
    pub content: String,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub metadata: Meta,
    #[serde(default)]
    pub source_file: String,
    #[serde(default)]
    pub page_number: u32,
    #[serde(default)]
    pub chunk_index: usize,
}

impl Document {
    /// Build a text document. An empty `id` is replaced by a fresh UUID.
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut id = id.into();
        if id.is_empty() {
            id = uuid::Uuid::new_v4().to_string();
        }
        Self {
            id,
            content: content.into(),
            content_type: ContentType::Text,
            metadata: Meta::new(),
            source_file: String::new(),
            page_number: 0,
            chunk_index: 0,
        }
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn with_source(mut self, source_file: impl Into<String>, page_number: u32, chunk_index: usize) -> Self {
        self.source_file = source_file.into();
        self.page_number = page_number;
        self.chunk_index = chunk_index;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Keep only the last occurrence of each id, in first-seen order. Both indexes
/// apply this to an incoming batch so they store the same id set.
pub fn last_per_id(docs: &[Document]) -> Vec<Document> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut out: Vec<Document> = Vec::with_capacity(docs.len());
    for doc in docs {
        match slots.get(doc.id.as_str()) {
            Some(&i) => out[i] = doc.clone(),
            None => {
                slots.insert(doc.id.as_str(), out.len());
                out.push(doc.clone());
            }
        }
    }
    out
}

/// Which stage produced a result. Scores are only comparable within one kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Vector,
    Keyword,
    Hybrid,
    MultiQueryHybrid,
    Reranked,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Vector => "vector",
            SearchType::Keyword => "keyword",
            SearchType::Hybrid => "hybrid",
            SearchType::MultiQueryHybrid => "multi_query_hybrid",
            SearchType::Reranked => "reranked",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document paired with a relevance score. Higher is always better.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub document: Document,
    pub score: f32,
    pub search_type: SearchType,
}

impl SearchResult {
    pub fn new(document: Document, score: f32, search_type: SearchType) -> Self {
        Self { document, score, search_type }
    }

    pub fn id(&self) -> &str {
        &self.document.id
    }

    pub fn to_summary(&self) -> ResultSummary {
        ResultSummary {
            document_id: self.document.id.clone(),
            content: self.document.content.clone(),
            score: self.score,
            search_type: self.search_type,
            metadata: self.document.metadata.clone(),
            source_file: self.document.source_file.clone(),
            page_number: self.document.page_number,
        }
    }
}

/// Flat, serializable view of a result for display or transcripts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultSummary {
    pub document_id: ChunkId,
    pub content: String,
    pub score: f32,
    pub search_type: SearchType,
    pub metadata: Meta,
    pub source_file: String,
    pub page_number: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

/// One call to a text-generation backend.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub history: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into(), system_prompt: None, history: Vec::new(), temperature: 0.7, max_tokens: 2048 }
    }

    pub fn system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// System message first, then history, then the user prompt.
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        if let Some(system) = &self.system_prompt {
            messages.push(ChatMessage::new(Role::System, system.clone()));
        }
        messages.extend(self.history.iter().cloned());
        messages.push(ChatMessage::new(Role::User, self.prompt.clone()));
        messages
    }
}
