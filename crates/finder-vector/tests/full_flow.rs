use std::sync::Arc;

use finder_core::error::Error;
use finder_core::traits::{Embedder, VectorIndexer};
use finder_core::types::{ContentType, Document, SearchType};
use finder_embed::FakeEmbedder;
use finder_vector::{delete_store, LanceVectorIndex, VectorFilter, CACHE_FILE};
use tempfile::TempDir;

fn embedder() -> Arc<dyn Embedder> {
    Arc::new(FakeEmbedder::new(32))
}

fn corpus() -> Vec<Document> {
    vec![
        Document::new("fruit", "apple banana cherry").with_source("fruit.txt", 1, 0),
        Document::new("tax", "quarterly tax filing deadline").with_source("tax.pdf", 2, 0).with_content_type(ContentType::Table),
        Document::new("bread", "banana bread recipe").with_source("fruit.txt", 3, 1).with_metadata("lang", "en"),
    ]
}

#[test]
fn empty_collection_returns_nothing() {
    let tmp = TempDir::new().unwrap();
    let index = LanceVectorIndex::open(tmp.path(), "c1", embedder()).expect("open");
    assert_eq!(index.count().unwrap(), 0);
    assert!(index.search("anything", 5).unwrap().is_empty());
}

#[test]
fn exact_text_scores_one_and_ranks_first() {
    let tmp = TempDir::new().unwrap();
    let mut index = LanceVectorIndex::open(tmp.path(), "c1", embedder()).unwrap();
    let ids = index.add_documents(&corpus()).unwrap();
    assert_eq!(ids, vec!["fruit", "tax", "bread"]);
    assert_eq!(index.count().unwrap(), 3);

    let results = index.search("quarterly tax filing deadline", 10).unwrap();
    assert_eq!(results.len(), 3, "limit is min(top_k, count)");
    assert_eq!(results[0].id(), "tax");
    assert!((results[0].score - 1.0).abs() < 1e-4, "similarity = 1 - cosine distance");
    assert!(results.iter().all(|r| r.search_type == SearchType::Vector));
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn search_respects_top_k_and_returns_cached_documents() {
    let tmp = TempDir::new().unwrap();
    let mut index = LanceVectorIndex::open(tmp.path(), "c1", embedder()).unwrap();
    index.add_documents(&corpus()).unwrap();
    let results = index.search("banana bread recipe", 1).unwrap();
    assert_eq!(results.len(), 1);
    let doc = &results[0].document;
    assert_eq!(doc.id, "bread");
    assert_eq!(doc.metadata.get("lang").map(String::as_str), Some("en"));
    assert_eq!(doc.page_number, 3);
    assert!(index.search("banana", 0).unwrap().is_empty());
}

#[test]
fn filtered_search_matches_provenance() {
    let tmp = TempDir::new().unwrap();
    let mut index = LanceVectorIndex::open(tmp.path(), "c1", embedder()).unwrap();
    index.add_documents(&corpus()).unwrap();

    let by_file = index.search_filtered("banana", 10, &VectorFilter::default().source_file("fruit.txt")).unwrap();
    let mut ids: Vec<&str> = by_file.iter().map(|r| r.id()).collect();
    ids.sort();
    assert_eq!(ids, vec!["bread", "fruit"]);

    let tables = index.search_filtered("banana", 10, &VectorFilter::default().content_type(ContentType::Table)).unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].id(), "tax");

    let page = index.search_filtered("banana", 10, &VectorFilter::default().source_file("fruit.txt").page_number(1)).unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id(), "fruit");
}

#[test]
fn filter_predicate_quotes_values() {
    let f = VectorFilter::default().source_file("o'brien.txt").page_number(4);
    assert_eq!(f.to_predicate().as_deref(), Some("source_file = 'o''brien.txt' AND page_number = 4"));
    assert!(VectorFilter::default().to_predicate().is_none());
}

#[test]
fn delete_and_clear_keep_cache_in_step() {
    let tmp = TempDir::new().unwrap();
    let mut index = LanceVectorIndex::open(tmp.path(), "c1", embedder()).unwrap();
    index.add_documents(&corpus()).unwrap();

    index.delete_documents(&["tax".to_string()]).unwrap();
    assert_eq!(index.count().unwrap(), 2);
    assert!(index.get_document("tax").is_none());
    assert!(index.search("quarterly tax filing deadline", 10).unwrap().iter().all(|r| r.id() != "tax"));

    index.clear().unwrap();
    assert_eq!(index.count().unwrap(), 0);
    assert!(index.all_documents().is_empty());
    assert!(index.search("banana", 5).unwrap().is_empty());
}

#[test]
fn readding_an_id_replaces_the_row() {
    let tmp = TempDir::new().unwrap();
    let mut index = LanceVectorIndex::open(tmp.path(), "c1", embedder()).unwrap();
    index.add_documents(&[Document::new("a", "apple pie")]).unwrap();
    index.add_documents(&[Document::new("a", "cherry tart")]).unwrap();
    assert_eq!(index.count().unwrap(), 1);
    assert_eq!(index.get_document("a").unwrap().content, "cherry tart");
    let top = index.search("cherry tart", 1).unwrap();
    assert!((top[0].score - 1.0).abs() < 1e-4);
}

#[test]
fn reopen_restores_rows_and_cache() {
    let tmp = TempDir::new().unwrap();
    {
        let mut index = LanceVectorIndex::open(tmp.path(), "c1", embedder()).unwrap();
        index.add_documents(&corpus()).unwrap();
    }
    assert!(tmp.path().join(CACHE_FILE).exists());
    let index = LanceVectorIndex::open(tmp.path(), "c1", embedder()).unwrap();
    assert_eq!(VectorIndexer::document_count(&index).unwrap(), 3);
    let all: Vec<String> = index.all_documents().into_iter().map(|d| d.id).collect();
    assert_eq!(all, vec!["fruit", "bread", "tax"], "ordered by source file, page, chunk");
}

#[test]
fn cache_miss_rebuilds_document_from_columns() {
    let tmp = TempDir::new().unwrap();
    {
        let mut index = LanceVectorIndex::open(tmp.path(), "c1", embedder()).unwrap();
        index.add_documents(&corpus()).unwrap();
    }
    std::fs::write(tmp.path().join(CACHE_FILE), b"{}").unwrap();
    let index = LanceVectorIndex::open(tmp.path(), "c1", embedder()).unwrap();
    let results = index.search("quarterly tax filing deadline", 1).unwrap();
    let doc = &results[0].document;
    assert_eq!(doc.id, "tax");
    assert_eq!(doc.content, "quarterly tax filing deadline");
    assert_eq!(doc.content_type, ContentType::Table);
    assert_eq!(doc.source_file, "tax.pdf");
    assert_eq!(doc.page_number, 2);
}

#[test]
fn reopening_with_another_dimension_is_rejected() {
    let tmp = TempDir::new().unwrap();
    LanceVectorIndex::open(tmp.path(), "c1", embedder()).unwrap();
    let err = LanceVectorIndex::open(tmp.path(), "c1", Arc::new(FakeEmbedder::new(16))).err().expect("dimension mismatch");
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::DimensionMismatch { expected: 32, actual: 16 })));
}

#[test]
fn delete_store_removes_conversation_directory() {
    let root = TempDir::new().unwrap();
    let dir = root.path().join("c9");
    {
        let mut index = LanceVectorIndex::open(&dir, "c9", embedder()).unwrap();
        index.add_documents(&corpus()).unwrap();
    }
    assert!(dir.exists());
    delete_store(root.path(), "c9").unwrap();
    assert!(!dir.exists());
    delete_store(root.path(), "never-existed").unwrap();
}

#[test]
fn every_score_is_one_minus_cosine_distance() {
    let tmp = TempDir::new().unwrap();
    let embedder = embedder();
    let mut index = LanceVectorIndex::open(tmp.path(), "c1", embedder.clone()).unwrap();
    index.add_documents(&corpus()).unwrap();

    let query = "banana filing recipe";
    let q = embedder.embed(query).unwrap();
    let results = index.search(query, 10).unwrap();
    assert_eq!(results.len(), 3);
    for r in &results {
        let v = embedder.embed(&r.document.content).unwrap();
        let dot: f32 = q.iter().zip(&v).map(|(a, b)| a * b).sum();
        let norms = q.iter().map(|x| x * x).sum::<f32>().sqrt() * v.iter().map(|x| x * x).sum::<f32>().sqrt();
        let cosine_distance = 1.0 - dot / norms;
        assert!((r.score - (1.0 - cosine_distance)).abs() < 1e-4, "{}: {} vs {}", r.id(), r.score, 1.0 - cosine_distance);
    }
}

#[test]
fn oversized_top_k_is_capped_at_the_row_count() {
    let tmp = TempDir::new().unwrap();
    let mut index = LanceVectorIndex::open(tmp.path(), "c1", embedder()).unwrap();
    index.add_documents(&corpus()).unwrap();
    assert_eq!(index.search("banana", usize::MAX).unwrap().len(), 3);
}
