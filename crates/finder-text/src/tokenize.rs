/// Articles, prepositions and auxiliaries dropped from both documents and queries.
pub const STOP_WORDS: &[&str] = &[
	"a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it", "its", "of", "on",
	"that", "the", "to", "was", "were", "will", "with",
];

/// Lowercase, split into word runs (alphanumeric or `_`), then drop
/// single-character tokens and stopwords. Order and duplicates are kept.
pub fn tokenize(text: &str) -> Vec<String> {
	text.to_lowercase()
		.split(|c: char| !(c.is_alphanumeric() || c == '_'))
		.filter(|t| t.chars().count() > 1 && !STOP_WORDS.contains(t))
		.map(str::to_string)
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn drops_short_tokens_and_stopwords() {
		assert_eq!(tokenize("The Apple is a fruit, x y"), vec!["apple", "fruit"]);
	}

	#[test]
	fn splits_on_punctuation_and_keeps_duplicates() {
		assert_eq!(tokenize("rust-lang: rust_lang, RUST!"), vec!["rust", "lang", "rust_lang", "rust"]);
	}

	#[test]
	fn stopword_only_text_is_empty() {
		assert!(tokenize("the and of to").is_empty());
		assert!(tokenize("").is_empty());
	}
}
