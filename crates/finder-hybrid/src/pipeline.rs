use anyhow::Result;
use tracing::{debug, warn};

use finder_core::config::SearchSettings;
use finder_core::traits::{TextIndexer, VectorIndexer};
use finder_core::types::SearchResult;
use finder_llm::QueryExpander;
use finder_rerank::Reranker;

use crate::engine::HybridSearchEngine;

/// Results of one retrieval and the query variants that produced them
/// (the original first).
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    pub queries: Vec<String>,
    pub results: Vec<SearchResult>,
}

/// Query → optional expansion → hybrid (multi-query) search → optional rerank.
pub struct RetrievalPipeline {
    settings: SearchSettings,
    expander: Option<QueryExpander>,
    reranker: Option<Reranker>,
    use_vector: bool,
    use_keyword: bool,
}

impl RetrievalPipeline {
    pub fn new(settings: SearchSettings) -> Self {
        Self { settings, expander: None, reranker: None, use_vector: true, use_keyword: true }
    }

    pub fn with_expander(mut self, expander: QueryExpander) -> Self { self.expander = Some(expander); self }

    pub fn with_reranker(mut self, reranker: Reranker) -> Self { self.reranker = Some(reranker); self }

    /// Restrict retrieval to some signals. Both are on by default.
    pub fn with_signals(mut self, use_vector: bool, use_keyword: bool) -> Self {
        self.use_vector = use_vector;
        self.use_keyword = use_keyword;
        self
    }

    pub fn settings(&self) -> &SearchSettings { &self.settings }

    /// Signal failures degrade rather than fail: a vector search error falls
    /// back to keyword-only, a rerank error keeps the fused order.
    pub fn retrieve<TI, VI>(&self, engine: &HybridSearchEngine<TI, VI>, query: &str) -> Result<Retrieval>
    where
        TI: TextIndexer,
        VI: VectorIndexer,
    {
        let queries = match (&self.expander, self.settings.use_multi_query) {
            (Some(expander), true) => expander.generate_similar_queries(query, self.settings.num_queries),
            _ => vec![query.to_string()],
        };
        let top_k = self.settings.top_k_retrieval;
        let candidates = match engine.multi_query_search_with(&queries, top_k, self.use_vector, self.use_keyword) {
            Ok(results) => results,
            Err(e) if self.use_vector && self.use_keyword => {
                warn!(error = %e, "hybrid search failed; retrying keyword-only");
                engine.multi_query_search_with(&queries, top_k, false, true)?
            }
            Err(e) => return Err(e),
        };
        let results = match (&self.reranker, self.settings.use_reranking) {
            (Some(reranker), true) if !candidates.is_empty() => {
                let fallback: Vec<SearchResult> = candidates.iter().take(self.settings.top_k_rerank).cloned().collect();
                match reranker.rerank(query, candidates, self.settings.top_k_rerank) {
                    Ok(reranked) => reranked,
                    Err(e) => {
                        warn!(error = %e, "rerank failed; keeping fused order");
                        fallback
                    }
                }
            }
            _ => candidates,
        };
        debug!(query, queries = queries.len(), hits = results.len(), "retrieval done");
        Ok(Retrieval { queries, results })
    }
}
