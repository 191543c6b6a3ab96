use std::sync::{Arc, Mutex};

use finder_core::config::RerankerSettings;
use finder_core::traits::CrossEncoder;
use finder_core::types::{Document, SearchResult, SearchType};
use finder_rerank::{cross_encoder_from_settings, FakeCrossEncoder, Reranker, DEFAULT_ORIGINAL_WEIGHT, DEFAULT_RERANK_WEIGHT};

/// Returns fixed scores in input order and counts calls.
struct Scripted {
    scores: Vec<f32>,
    calls: Mutex<usize>,
}

impl CrossEncoder for Scripted {
    fn score_pairs(&self, pairs: &[(String, String)]) -> anyhow::Result<Vec<f32>> {
        *self.calls.lock().unwrap() += 1;
        Ok(self.scores[..pairs.len()].to_vec())
    }
}

fn hybrid(id: &str, content: &str, score: f32) -> SearchResult {
    SearchResult::new(Document::new(id, content), score, SearchType::Hybrid)
}

#[test]
fn empty_input_is_empty() {
    let r = Reranker::new(Arc::new(FakeCrossEncoder));
    assert!(r.rerank("q", vec![], 5).unwrap().is_empty());
    assert!(r.rerank_with_original_scores("q", vec![], 5, 0.7, 0.3).unwrap().is_empty());
}

#[test]
fn single_item_is_returned_unchanged_without_model_call() {
    let enc = Arc::new(Scripted { scores: vec![9.0], calls: Mutex::new(0) });
    let r = Reranker::new(enc.clone());
    let input = vec![hybrid("a", "anything", 0.0123)];
    let out = r.rerank("q", input.clone(), 5).unwrap();
    assert_eq!(out, input);
    assert_eq!(*enc.calls.lock().unwrap(), 0);
}

#[test]
fn rerank_orders_by_raw_model_score() {
    let enc = Arc::new(Scripted { scores: vec![-2.5, 4.0, 1.0], calls: Mutex::new(0) });
    let r = Reranker::new(enc);
    let out = r
        .rerank("q", vec![hybrid("a", "x", 0.9), hybrid("b", "y", 0.5), hybrid("c", "z", 0.1)], 2)
        .unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].id(), "b");
    assert_eq!(out[0].score, 4.0);
    assert_eq!(out[1].id(), "c");
    assert_eq!(out[1].score, 1.0);
    assert!(out.iter().all(|r| r.search_type == SearchType::Reranked));
}

#[test]
fn blended_mode_mixes_normalised_and_prior_scores() {
    let enc = Arc::new(Scripted { scores: vec![0.0, 10.0], calls: Mutex::new(0) });
    let r = Reranker::new(enc);
    let out = r
        .rerank_with_original_scores(
            "q",
            vec![hybrid("a", "x", 1.0), hybrid("b", "y", 0.0)],
            5,
            DEFAULT_RERANK_WEIGHT,
            DEFAULT_ORIGINAL_WEIGHT,
        )
        .unwrap();
    // a: 0.7*0 + 0.3*1 = 0.3 ; b: 0.7*1 + 0.3*0 = 0.7
    assert_eq!(out[0].id(), "b");
    assert!((out[0].score - 0.7).abs() < 1e-6);
    assert!((out[1].score - 0.3).abs() < 1e-6);
}

#[test]
fn blended_mode_with_equal_model_scores_uses_unit_range() {
    let enc = Arc::new(Scripted { scores: vec![3.0, 3.0], calls: Mutex::new(0) });
    let r = Reranker::new(enc);
    let out = r
        .rerank_with_original_scores("q", vec![hybrid("a", "x", 0.2), hybrid("b", "y", 0.6)], 5, 0.7, 0.3)
        .unwrap();
    assert_eq!(out[0].id(), "b");
    assert!((out[0].score - 0.18).abs() < 1e-6);
    assert!((out[1].score - 0.06).abs() < 1e-6);
}

#[test]
fn fake_cross_encoder_prefers_overlap() {
    let r = Reranker::new(Arc::new(FakeCrossEncoder));
    let out = r
        .rerank(
            "banana bread",
            vec![hybrid("tax", "quarterly tax filing", 0.9), hybrid("bread", "banana bread recipe", 0.1)],
            5,
        )
        .unwrap();
    assert_eq!(out[0].id(), "bread");
    assert_eq!(out[0].score, 1.0);
    assert_eq!(r.relevance_score("banana bread", "banana split").unwrap(), 0.5);
}

#[test]
fn settings_select_fake_encoder() {
    let settings = RerankerSettings { use_fake: true, ..Default::default() };
    let enc = cross_encoder_from_settings(&settings, std::path::Path::new(".")).unwrap();
    assert_eq!(enc.score("apple", "Apple pie").unwrap(), 1.0);
}
