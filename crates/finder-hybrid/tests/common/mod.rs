#![allow(dead_code)]

use anyhow::{bail, Result};
use std::sync::Arc;

use finder_core::traits::{CrossEncoder, Embedder, TextGenerator, TextStream, VectorIndexer};
use finder_core::types::{ChunkId, Document, GenerationRequest, SearchResult, SearchType};
use finder_embed::FakeEmbedder;

/// Brute-force cosine index over the hashing embedder. `fail_search` makes
/// every search error out.
pub struct MemVector {
    embedder: FakeEmbedder,
    entries: Vec<(Document, Vec<f32>)>,
    pub fail_search: bool,
}

impl MemVector {
    pub fn new() -> Self { Self { embedder: FakeEmbedder::new(64), entries: Vec::new(), fail_search: false } }

    pub fn failing() -> Self { Self { fail_search: true, ..Self::new() } }
}

impl VectorIndexer for MemVector {
    fn add_documents(&mut self, docs: &[Document]) -> Result<Vec<ChunkId>> {
        let texts: Vec<String> = docs.iter().map(|d| d.content.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts)?;
        for (doc, v) in docs.iter().zip(vectors) {
            self.entries.retain(|(d, _)| d.id != doc.id);
            self.entries.push((doc.clone(), v));
        }
        Ok(docs.iter().map(|d| d.id.clone()).collect())
    }

    fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        if self.fail_search { bail!("vector store offline"); }
        let q = self.embedder.embed(query)?;
        let mut hits: Vec<SearchResult> = self
            .entries
            .iter()
            .map(|(d, v)| SearchResult::new(d.clone(), v.iter().zip(&q).map(|(a, b)| a * b).sum(), SearchType::Vector))
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }

    fn delete_documents(&mut self, ids: &[ChunkId]) -> Result<()> {
        self.entries.retain(|(d, _)| !ids.contains(&d.id));
        Ok(())
    }

    fn clear(&mut self) -> Result<()> { self.entries.clear(); Ok(()) }

    fn document_count(&self) -> Result<usize> { Ok(self.entries.len()) }

    fn get_document(&self, id: &str) -> Option<Document> {
        self.entries.iter().find(|(d, _)| d.id == id).map(|(d, _)| d.clone())
    }

    fn all_documents(&self) -> Vec<Document> { self.entries.iter().map(|(d, _)| d.clone()).collect() }
}

/// Generator that always answers with the same text, or always fails.
pub struct Canned(pub Option<String>);

impl TextGenerator for Canned {
    fn name(&self) -> &str { "canned" }

    fn generate(&self, _request: &GenerationRequest) -> Result<String> {
        match &self.0 {
            Some(text) => Ok(text.clone()),
            None => bail!("generator unavailable"),
        }
    }

    fn generate_stream(&self, request: &GenerationRequest) -> Result<TextStream> {
        let text = self.generate(request)?;
        Ok(Box::new(std::iter::once(Ok(text))))
    }
}

pub struct BrokenCrossEncoder;

impl CrossEncoder for BrokenCrossEncoder {
    fn score_pairs(&self, _pairs: &[(String, String)]) -> Result<Vec<f32>> { bail!("model not loaded") }
}

pub fn canned(text: &str) -> Arc<dyn TextGenerator> { Arc::new(Canned(Some(text.to_string()))) }

pub fn corpus() -> Vec<Document> {
    vec![
        Document::new("apple", "apple pie with cinnamon").with_source("desserts.txt", 1, 0),
        Document::new("banana", "banana bread recipe with walnuts").with_source("desserts.txt", 1, 1),
        Document::new("tax", "quarterly tax filing deadline").with_source("tax.pdf", 3, 0),
        Document::new("orchard", "apple orchard harvest in autumn").with_source("farm.txt", 2, 0),
    ]
}
