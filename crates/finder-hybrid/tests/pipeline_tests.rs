mod common;

use std::sync::Arc;

use finder_core::config::SearchSettings;
use finder_core::types::SearchType;
use finder_hybrid::{FusionConfig, HybridSearchEngine, RetrievalPipeline};
use finder_llm::QueryExpander;
use finder_rerank::{FakeCrossEncoder, Reranker};
use finder_text::KeywordIndex;
use tempfile::TempDir;

use common::{canned, corpus, BrokenCrossEncoder, Canned, MemVector};

fn engine_with(tmp: &TempDir, vector: MemVector) -> HybridSearchEngine<KeywordIndex, MemVector> {
    let text = KeywordIndex::open(tmp.path()).unwrap();
    let mut engine = HybridSearchEngine::new(text, vector, FusionConfig::default());
    engine.add_documents(&corpus()).unwrap();
    engine
}

fn settings() -> SearchSettings {
    SearchSettings { top_k_retrieval: 10, top_k_rerank: 2, num_queries: 3, ..Default::default() }
}

#[test]
fn expands_searches_and_reranks() {
    let tmp = TempDir::new().unwrap();
    let engine = engine_with(&tmp, MemVector::new());
    let pipeline = RetrievalPipeline::new(settings())
        .with_expander(QueryExpander::new(canned("1. apple dessert recipes\n2. orchard harvest season")))
        .with_reranker(Reranker::new(Arc::new(FakeCrossEncoder)));

    let retrieval = pipeline.retrieve(&engine, "apple pie").unwrap();
    assert_eq!(retrieval.queries, vec!["apple pie", "apple dessert recipes", "orchard harvest season"]);
    assert_eq!(retrieval.results.len(), 2);
    assert_eq!(retrieval.results[0].id(), "apple");
    assert!(retrieval.results.iter().all(|r| r.search_type == SearchType::Reranked));
}

#[test]
fn without_stages_returns_fused_candidates() {
    let tmp = TempDir::new().unwrap();
    let engine = engine_with(&tmp, MemVector::new());
    let pipeline = RetrievalPipeline::new(settings());
    let retrieval = pipeline.retrieve(&engine, "banana bread").unwrap();
    assert_eq!(retrieval.queries, vec!["banana bread"]);
    assert_eq!(retrieval.results, engine.search("banana bread", 10, true, true).unwrap());
}

#[test]
fn disabled_flags_skip_expansion_and_rerank() {
    let tmp = TempDir::new().unwrap();
    let engine = engine_with(&tmp, MemVector::new());
    let settings = SearchSettings { use_multi_query: false, use_reranking: false, ..settings() };
    let pipeline = RetrievalPipeline::new(settings)
        .with_expander(QueryExpander::new(canned("another phrasing entirely")))
        .with_reranker(Reranker::new(Arc::new(FakeCrossEncoder)));
    let retrieval = pipeline.retrieve(&engine, "apple").unwrap();
    assert_eq!(retrieval.queries.len(), 1);
    assert!(retrieval.results.len() > 2);
    assert!(retrieval.results.iter().all(|r| r.search_type == SearchType::Hybrid));
}

#[test]
fn failed_expansion_uses_original_query() {
    let tmp = TempDir::new().unwrap();
    let engine = engine_with(&tmp, MemVector::new());
    let pipeline = RetrievalPipeline::new(settings()).with_expander(QueryExpander::new(Arc::new(Canned(None))));
    let retrieval = pipeline.retrieve(&engine, "tax deadline").unwrap();
    assert_eq!(retrieval.queries, vec!["tax deadline"]);
    assert_eq!(retrieval.results[0].id(), "tax");
}

#[test]
fn vector_failure_degrades_to_keyword_only() {
    let tmp = TempDir::new().unwrap();
    let engine = engine_with(&tmp, MemVector::failing());
    assert!(engine.search("apple", 5, true, true).is_err());

    let pipeline = RetrievalPipeline::new(settings());
    let retrieval = pipeline.retrieve(&engine, "apple").unwrap();
    let ids: Vec<&str> = retrieval.results.iter().map(|r| r.id()).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&"apple") && ids.contains(&"orchard"));
    assert!(retrieval.results.iter().all(|r| r.search_type == SearchType::Keyword));
}

#[test]
fn rerank_failure_keeps_fused_order() {
    let tmp = TempDir::new().unwrap();
    let engine = engine_with(&tmp, MemVector::new());
    let pipeline = RetrievalPipeline::new(settings()).with_reranker(Reranker::new(Arc::new(BrokenCrossEncoder)));
    let retrieval = pipeline.retrieve(&engine, "apple orchard").unwrap();
    let fused = engine.search("apple orchard", 10, true, true).unwrap();
    assert_eq!(retrieval.results, fused[..2].to_vec());
}

#[test]
fn empty_corpus_yields_nothing() {
    let tmp = TempDir::new().unwrap();
    let text = KeywordIndex::open(tmp.path()).unwrap();
    let engine = HybridSearchEngine::new(text, MemVector::new(), FusionConfig::default());
    let pipeline = RetrievalPipeline::new(settings()).with_reranker(Reranker::new(Arc::new(BrokenCrossEncoder)));
    assert!(pipeline.retrieve(&engine, "anything").unwrap().results.is_empty());
}

#[test]
fn signal_restriction_is_honoured() {
    let tmp = TempDir::new().unwrap();
    let engine = engine_with(&tmp, MemVector::failing());
    let keyword_only = RetrievalPipeline::new(settings()).with_signals(false, true);
    let retrieval = keyword_only.retrieve(&engine, "tax").unwrap();
    assert_eq!(retrieval.results.len(), 1);
    assert_eq!(retrieval.results[0].search_type, SearchType::Keyword);

    let vector_only = RetrievalPipeline::new(settings()).with_signals(true, false);
    assert!(vector_only.retrieve(&engine, "tax").is_err());
}
