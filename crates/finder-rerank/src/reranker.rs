use anyhow::Result;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

use finder_core::traits::CrossEncoder;
use finder_core::types::{SearchResult, SearchType};

pub const DEFAULT_RERANK_WEIGHT: f32 = 0.7;
pub const DEFAULT_ORIGINAL_WEIGHT: f32 = 0.3;

/// Re-scores fused candidates against the literal query with a cross-encoder.
#[derive(Clone)]
pub struct Reranker {
    encoder: Arc<dyn CrossEncoder>,
}

impl Reranker {
    pub fn new(encoder: Arc<dyn CrossEncoder>) -> Self { Self { encoder } }

    /// Sort by raw cross-encoder score and keep `top_k`. Scores are replaced by
    /// the model output, unblended. Zero or one candidate skips the model.
    pub fn rerank(&self, query: &str, results: Vec<SearchResult>, top_k: usize) -> Result<Vec<SearchResult>> {
        if results.len() <= 1 { return Ok(results.into_iter().take(top_k).collect()); }
        let scores = self.score(query, &results)?;
        let mut scored: Vec<(SearchResult, f32)> = results.into_iter().zip(scores).collect();
        sort_desc(&mut scored);
        debug!(query, candidates = scored.len(), top_k, "reranked");
        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(r, score)| SearchResult::new(r.document, score, SearchType::Reranked))
            .collect())
    }

    /// Blend min-max normalised model scores with the prior scores:
    /// `rerank_weight * normalised + original_weight * prior`.
    pub fn rerank_with_original_scores(
        &self,
        query: &str,
        results: Vec<SearchResult>,
        top_k: usize,
        rerank_weight: f32,
        original_weight: f32,
    ) -> Result<Vec<SearchResult>> {
        if results.len() <= 1 { return Ok(results.into_iter().take(top_k).collect()); }
        let scores = self.score(query, &results)?;
        let min = scores.iter().copied().fold(f32::INFINITY, f32::min);
        let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let range = if max != min { max - min } else { 1.0 };
        let mut scored: Vec<(SearchResult, f32)> = results
            .into_iter()
            .zip(scores)
            .map(|(r, s)| {
                let combined = rerank_weight * ((s - min) / range) + original_weight * r.score;
                (r, combined)
            })
            .collect();
        sort_desc(&mut scored);
        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(r, score)| SearchResult::new(r.document, score, SearchType::Reranked))
            .collect())
    }

    pub fn relevance_score(&self, query: &str, text: &str) -> Result<f32> {
        self.encoder.score(query, text)
    }

    fn score(&self, query: &str, results: &[SearchResult]) -> Result<Vec<f32>> {
        let pairs: Vec<(String, String)> = results.iter().map(|r| (query.to_string(), r.document.content.clone())).collect();
        let scores = self.encoder.score_pairs(&pairs)?;
        if scores.len() != pairs.len() {
            anyhow::bail!("cross-encoder returned {} scores for {} pairs", scores.len(), pairs.len());
        }
        Ok(scores)
    }
}

fn sort_desc(scored: &mut [(SearchResult, f32)]) {
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
}
