use std::collections::HashSet;

use finder_core::types::{Document, SearchResult, SearchType};
use finder_hybrid::{rrf_fuse, rrf_fuse_many};

fn list(ids: &[&str], tag: SearchType) -> Vec<SearchResult> {
    ids.iter().map(|id| SearchResult::new(Document::new(*id, format!("content of {id}")), 0.9, tag)).collect()
}

fn score_of(results: &[SearchResult], id: &str) -> f32 {
    results.iter().find(|r| r.id() == id).map(|r| r.score).expect("id present")
}

#[test]
fn shared_document_accumulates_both_contributions() {
    let vector = list(&["x", "y"], SearchType::Vector);
    let keyword = list(&["y", "z"], SearchType::Keyword);
    let fused = rrf_fuse(&vector, &keyword, 0.5, 0.5, 60.0, 10);

    let ids: Vec<&str> = fused.iter().map(|r| r.id()).collect();
    assert_eq!(ids[0], "y");
    assert_eq!(ids.len(), 3);
    let y = score_of(&fused, "y");
    let x = score_of(&fused, "x");
    let z = score_of(&fused, "z");
    assert!((y - (0.5 / 62.0 + 0.5 / 61.0)).abs() < 1e-7);
    assert!((x - 0.5 / 61.0).abs() < 1e-7);
    assert!((z - 0.5 / 62.0).abs() < 1e-7);
    assert!(y > x && x > z);
    assert!(fused.iter().all(|r| r.search_type == SearchType::Hybrid));
}

#[test]
fn presence_in_both_lists_beats_single_list_at_same_rank() {
    for k in [1.0f32, 10.0, 60.0, 1000.0] {
        for r1 in 1..5usize {
            for r2 in 1..5usize {
                let mut vector_ids: Vec<String> = (1..r1).map(|i| format!("v{i}")).collect();
                vector_ids.push("both".into());
                let mut keyword_ids: Vec<String> = (1..r2).map(|i| format!("k{i}")).collect();
                keyword_ids.push("both".into());
                let vector = list(&vector_ids.iter().map(String::as_str).collect::<Vec<_>>(), SearchType::Vector);
                let keyword = list(&keyword_ids.iter().map(String::as_str).collect::<Vec<_>>(), SearchType::Keyword);
                let fused = rrf_fuse(&vector, &keyword, 0.3, 0.7, k, 100);
                let both = score_of(&fused, "both");
                let expected = 0.3 / (k + r1 as f32) + 0.7 / (k + r2 as f32);
                assert!((both - expected).abs() < 1e-6, "k={k} r1={r1} r2={r2}");
                assert!(both > 0.3 / (k + r1 as f32));
            }
        }
    }
}

#[test]
fn weights_are_normalised() {
    let vector = list(&["x"], SearchType::Vector);
    let keyword = list(&["y"], SearchType::Keyword);
    let a = rrf_fuse(&vector, &keyword, 1.0, 3.0, 60.0, 10);
    let b = rrf_fuse(&vector, &keyword, 0.25, 0.75, 60.0, 10);
    assert_eq!(a, b);
    assert!((score_of(&a, "y") - 0.75 / 61.0).abs() < 1e-7);
}

#[test]
fn large_top_k_returns_every_candidate_once_in_order() {
    let vector = list(&["a", "b", "c", "d"], SearchType::Vector);
    let keyword = list(&["d", "e", "a"], SearchType::Keyword);
    let fused = rrf_fuse(&vector, &keyword, 0.5, 0.5, 60.0, 50);
    let ids: HashSet<&str> = fused.iter().map(|r| r.id()).collect();
    assert_eq!(ids.len(), 5);
    assert_eq!(fused.len(), 5);
    assert!(fused.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn truncates_to_top_k() {
    let vector = list(&["a", "b", "c"], SearchType::Vector);
    let keyword = list(&["c", "b", "a"], SearchType::Keyword);
    assert_eq!(rrf_fuse(&vector, &keyword, 0.5, 0.5, 60.0, 2).len(), 2);
    assert!(rrf_fuse(&vector, &keyword, 0.5, 0.5, 60.0, 0).is_empty());
}

#[test]
fn one_empty_list_degenerates_to_the_other() {
    let vector = list(&["a", "b"], SearchType::Vector);
    let fused = rrf_fuse(&vector, &[], 0.5, 0.5, 60.0, 10);
    let ids: Vec<&str> = fused.iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert!((fused[0].score - 0.5 / 61.0).abs() < 1e-7);
    assert!(rrf_fuse(&[], &[], 0.5, 0.5, 60.0, 10).is_empty());
}

#[test]
fn many_lists_use_uniform_weights() {
    let lists = vec![
        list(&["a", "b"], SearchType::Hybrid),
        list(&["b", "c"], SearchType::Hybrid),
        list(&["b"], SearchType::Hybrid),
    ];
    let fused = rrf_fuse_many(&lists, 60.0, 10);
    assert_eq!(fused[0].id(), "b");
    let third = 1.0f32 / 3.0;
    let expected_b = third / 62.0 + third / 61.0 + third / 61.0;
    assert!((score_of(&fused, "b") - expected_b).abs() < 1e-6);
    assert!((score_of(&fused, "a") - third / 61.0).abs() < 1e-6);
    assert!(fused.iter().all(|r| r.search_type == SearchType::MultiQueryHybrid));
    assert!(rrf_fuse_many(&[], 60.0, 10).is_empty());
}

#[test]
fn fused_results_keep_the_original_document() {
    let mut vector = list(&["a"], SearchType::Vector);
    vector[0].document = vector[0].document.clone().with_source("a.pdf", 4, 2);
    let fused = rrf_fuse(&vector, &[], 0.5, 0.5, 60.0, 10);
    assert_eq!(fused[0].document.source_file, "a.pdf");
    assert_eq!(fused[0].document.page_number, 4);
}
