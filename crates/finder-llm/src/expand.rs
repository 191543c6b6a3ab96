use std::sync::Arc;
use tracing::{debug, warn};

use finder_core::traits::TextGenerator;
use finder_core::types::GenerationRequest;

/// Total variants (original included) when the caller does not choose.
pub const DEFAULT_NUM_QUERIES: usize = 5;

const MIN_VARIANT_CHARS: usize = 5;

const EXPANSION_SYSTEM_PROMPT: &str = "You rewrite search queries for a document retrieval system. \
You output only queries, one per line, with no numbering, bullets or commentary.";

fn expansion_prompt(query: &str, alternatives: usize) -> String {
    format!(
        "Generate {alternatives} alternative search queries for the question below. \
Rephrase it, break it into more specific sub-questions, and use synonyms or related terms \
so that documents worded differently are still found.\n\n\
Question: {query}\n\n\
Write exactly one query per line. Do not number them."
    )
}

/// Widens recall by asking a text generator for paraphrases of the query.
pub struct QueryExpander {
    generator: Arc<dyn TextGenerator>,
}

impl QueryExpander {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self { Self { generator } }

    /// `num_queries` variants at most, the original first. Generation failures
    /// return `[query]`; they are never surfaced.
    pub fn generate_similar_queries(&self, query: &str, num_queries: usize) -> Vec<String> {
        if num_queries <= 1 { return vec![query.to_string()]; }
        let request = GenerationRequest::new(expansion_prompt(query, num_queries - 1))
            .system(EXPANSION_SYSTEM_PROMPT)
            .temperature(0.7)
            .max_tokens(256);
        let output = match self.generator.generate(&request) {
            Ok(output) => output,
            Err(e) => {
                warn!(provider = self.generator.name(), error = %e, "query expansion failed; using original query only");
                return vec![query.to_string()];
            }
        };
        let mut queries = vec![query.to_string()];
        queries.extend(parse_variants(&output, num_queries - 1));
        debug!(n = queries.len(), "expanded query");
        queries
    }
}

/// Accepted lines of generator output: enumeration markers stripped, longer
/// than five characters, at most `limit` of them.
pub fn parse_variants(output: &str, limit: usize) -> Vec<String> {
    output
        .lines()
        .map(|line| line.trim_start_matches(is_marker).trim())
        .filter(|line| line.chars().count() > MIN_VARIANT_CHARS)
        .take(limit)
        .map(str::to_string)
        .collect()
}

fn is_marker(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '.' | '-' | ')' | '*' | '•' | '●' | '◦' | '▪' | '‣' | '·' | ' ' | '\t')
}
