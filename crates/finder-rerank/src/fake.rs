use anyhow::Result;
use std::collections::HashSet;

use finder_core::traits::CrossEncoder;

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric()).filter(|w| w.len() > 1).map(str::to_lowercase).collect()
}

/// Term-overlap scorer standing in for a trained model: the share of distinct
/// query words found in the passage. Deterministic, always in `[0, 1]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FakeCrossEncoder;

impl CrossEncoder for FakeCrossEncoder {
    fn score_pairs(&self, pairs: &[(String, String)]) -> Result<Vec<f32>> {
        Ok(pairs
            .iter()
            .map(|(query, passage)| {
                let q = words(query);
                if q.is_empty() { return 0.0; }
                let p = words(passage);
                q.intersection(&p).count() as f32 / q.len() as f32
            })
            .collect())
    }
}
