use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use finder_core::config::SearchSettings;
use finder_core::traits::{TextIndexer, VectorIndexer};
use finder_core::types::{last_per_id, ChunkId, Document, SearchResult};

use crate::fusion::{rrf_fuse, rrf_fuse_many, DEFAULT_RRF_K};

/// Fusion knobs taken from `[search]` settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionConfig {
    pub rrf_k: f32,
    pub vector_weight: f32,
    pub keyword_weight: f32,
    /// Each signal fetches `top_k * candidate_multiplier` before fusing.
    pub candidate_multiplier: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self { rrf_k: DEFAULT_RRF_K, vector_weight: 0.5, keyword_weight: 0.5, candidate_multiplier: 2 }
    }
}

impl From<&SearchSettings> for FusionConfig {
    fn from(s: &SearchSettings) -> Self {
        Self {
            rrf_k: s.rrf_k,
            vector_weight: s.vector_weight,
            keyword_weight: s.keyword_weight,
            candidate_multiplier: s.candidate_multiplier.max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredId {
    pub doc_id: ChunkId,
    pub score: f32,
}

/// Per-signal and fused scores behind one hybrid search.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub vector_results: Vec<ScoredId>,
    pub keyword_results: Vec<ScoredId>,
    pub hybrid_results: Vec<ScoredId>,
}

fn scored_ids(results: &[SearchResult]) -> Vec<ScoredId> {
    results.iter().map(|r| ScoredId { doc_id: r.document.id.clone(), score: r.score }).collect()
}

/// Lexical and vector indexes of one conversation, kept in lockstep and
/// queried together through rank fusion.
pub struct HybridSearchEngine<TI, VI> where TI: TextIndexer, VI: VectorIndexer {
    text: TI,
    vector: VI,
    config: FusionConfig,
}

impl<TI, VI> HybridSearchEngine<TI, VI> where TI: TextIndexer, VI: VectorIndexer {
    pub fn new(text: TI, vector: VI, config: FusionConfig) -> Self { Self { text, vector, config } }

    pub fn config(&self) -> &FusionConfig { &self.config }

    pub fn text(&self) -> &TI { &self.text }

    pub fn vector(&self) -> &VI { &self.vector }

    /// Add to both indexes; a repeated id keeps its last copy. The ids returned
    /// are the vector index's.
    pub fn add_documents(&mut self, docs: &[Document]) -> Result<Vec<ChunkId>> {
        if docs.is_empty() { return Ok(vec![]); }
        let docs = last_per_id(docs);
        let ids = self.vector.add_documents(&docs)?;
        self.text.add_documents(&docs)?;
        debug!(n = ids.len(), "documents indexed");
        Ok(ids)
    }

    /// Hybrid search. With one signal disabled the other's results are returned
    /// as they are, truncated to `top_k`.
    pub fn search(&self, query: &str, top_k: usize, use_vector: bool, use_keyword: bool) -> Result<Vec<SearchResult>> {
        if top_k == 0 { return Ok(vec![]); }
        let fetch = self.fetch_budget(top_k);
        let mut vector_results = if use_vector { self.vector.search(query, fetch)? } else { vec![] };
        let mut keyword_results = if use_keyword { self.text.search(query, fetch)? } else { vec![] };
        let results = match (use_vector, use_keyword) {
            (true, true) => self.fuse(&vector_results, &keyword_results, top_k),
            (true, false) => { vector_results.truncate(top_k); vector_results }
            (false, true) => { keyword_results.truncate(top_k); keyword_results }
            (false, false) => vec![],
        };
        debug!(query, top_k, use_vector, use_keyword, hits = results.len(), "hybrid search");
        Ok(results)
    }

    /// Fuse full hybrid searches of each query variant. One query is plain `search`.
    pub fn multi_query_search(&self, queries: &[String], top_k: usize) -> Result<Vec<SearchResult>> {
        self.multi_query_search_with(queries, top_k, true, true)
    }

    /// `multi_query_search` restricted to the enabled signals.
    pub fn multi_query_search_with(&self, queries: &[String], top_k: usize, use_vector: bool, use_keyword: bool) -> Result<Vec<SearchResult>> {
        match queries {
            [] => Ok(vec![]),
            [single] => self.search(single, top_k, use_vector, use_keyword),
            _ => {
                let fetch = self.fetch_budget(top_k);
                let mut lists = Vec::with_capacity(queries.len());
                for q in queries {
                    let results = self.search(q, fetch, use_vector, use_keyword)?;
                    if !results.is_empty() { lists.push(results); }
                }
                let fused = rrf_fuse_many(&lists, self.config.rrf_k, top_k);
                debug!(queries = queries.len(), non_empty = lists.len(), hits = fused.len(), "multi-query search");
                Ok(fused)
            }
        }
    }

    /// Hybrid search plus the per-signal lists that fed it.
    pub fn search_with_scores(&self, query: &str, top_k: usize) -> Result<(Vec<SearchResult>, ScoreBreakdown)> {
        let fetch = self.fetch_budget(top_k);
        let vector_results = self.vector.search(query, fetch)?;
        let keyword_results = self.text.search(query, fetch)?;
        let fused = self.fuse(&vector_results, &keyword_results, top_k);
        let breakdown = ScoreBreakdown {
            vector_results: scored_ids(&vector_results),
            keyword_results: scored_ids(&keyword_results),
            hybrid_results: scored_ids(&fused),
        };
        Ok((fused, breakdown))
    }

    pub fn get_document(&self, id: &str) -> Option<Document> { self.vector.get_document(id) }

    pub fn all_documents(&self) -> Vec<Document> { self.vector.all_documents() }

    /// Stored vector count; the vector index is the source of truth.
    pub fn document_count(&self) -> Result<usize> { self.vector.document_count() }

    pub fn delete_documents(&mut self, ids: &[ChunkId]) -> Result<()> {
        self.vector.delete_documents(ids)?;
        self.text.delete_documents(ids)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.vector.clear()?;
        self.text.clear()
    }

    fn fetch_budget(&self, top_k: usize) -> usize { top_k.saturating_mul(self.config.candidate_multiplier) }

    fn fuse(&self, vector: &[SearchResult], keyword: &[SearchResult], top_k: usize) -> Vec<SearchResult> {
        rrf_fuse(vector, keyword, self.config.vector_weight, self.config.keyword_weight, self.config.rrf_k, top_k)
    }
}
