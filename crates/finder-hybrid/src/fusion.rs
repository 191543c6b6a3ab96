//! Reciprocal Rank Fusion.
//!
//! Each list contributes `weight / (k + rank)` (1-based rank) to every id it
//! contains; weights sum to 1 within a call. Equal fused scores keep discovery
//! order: the list an id was first seen in, then its rank there.

use std::cmp::Ordering;
use std::collections::HashMap;

use finder_core::types::{Document, SearchResult, SearchType};

pub const DEFAULT_RRF_K: f32 = 60.0;

struct Fused {
    document: Document,
    score: f64,
    first_seen: (usize, usize),
}

/// Fuse vector and keyword results. Weights are normalised to sum to 1;
/// non-positive totals fall back to an even split.
pub fn rrf_fuse(
    vector: &[SearchResult],
    keyword: &[SearchResult],
    vector_weight: f32,
    keyword_weight: f32,
    k: f32,
    top_k: usize,
) -> Vec<SearchResult> {
    let total = vector_weight + keyword_weight;
    let (vw, kw) = if total > 0.0 && vector_weight >= 0.0 && keyword_weight >= 0.0 {
        (vector_weight / total, keyword_weight / total)
    } else {
        (0.5, 0.5)
    };
    fuse_weighted(&[(vector, vw), (keyword, kw)], k, top_k, SearchType::Hybrid)
}

/// Fuse N already-ranked lists with uniform weight `1/N`.
pub fn rrf_fuse_many(lists: &[Vec<SearchResult>], k: f32, top_k: usize) -> Vec<SearchResult> {
    if lists.is_empty() { return vec![]; }
    let w = 1.0 / lists.len() as f32;
    let weighted: Vec<(&[SearchResult], f32)> = lists.iter().map(|l| (l.as_slice(), w)).collect();
    fuse_weighted(&weighted, k, top_k, SearchType::MultiQueryHybrid)
}

fn fuse_weighted(lists: &[(&[SearchResult], f32)], k: f32, top_k: usize, tag: SearchType) -> Vec<SearchResult> {
    let mut fused: Vec<Fused> = Vec::new();
    let mut by_id: HashMap<&str, usize> = HashMap::new();
    for (list_idx, (list, weight)) in lists.iter().enumerate() {
        for (i, result) in list.iter().enumerate() {
            let rank = i + 1;
            let contribution = f64::from(*weight) / (f64::from(k) + rank as f64);
            let slot = *by_id.entry(result.id()).or_insert_with(|| {
                fused.push(Fused { document: result.document.clone(), score: 0.0, first_seen: (list_idx, rank) });
                fused.len() - 1
            });
            fused[slot].score += contribution;
        }
    }
    fused.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.first_seen.cmp(&b.first_seen))
    });
    fused.truncate(top_k);
    fused.into_iter().map(|f| SearchResult::new(f.document, f.score as f32, tag)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(ids: &[&str]) -> Vec<SearchResult> {
        ids.iter().map(|id| SearchResult::new(Document::new(*id, *id), 0.0, SearchType::Vector)).collect()
    }

    #[test]
    fn equal_scores_keep_discovery_order() {
        // x and z both sit at rank 1 of one list only.
        let fused = rrf_fuse(&list(&["x"]), &list(&["z"]), 0.5, 0.5, 60.0, 10);
        assert_eq!(fused[0].score, fused[1].score);
        assert_eq!(fused[0].id(), "x");
        assert_eq!(fused[1].id(), "z");
    }

    #[test]
    fn negative_weights_fall_back_to_even_split() {
        let a = rrf_fuse(&list(&["x"]), &list(&["y"]), -1.0, 2.0, 60.0, 10);
        assert_eq!(a[0].score, a[1].score);
    }
}
