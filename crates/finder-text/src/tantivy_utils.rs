use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{PreTokenizedString, Token};

pub const ID_FIELD: &str = "id";
pub const TEXT_FIELD: &str = "text";

/// `id` is stored for lookup; `text` is indexed with term frequencies and
/// field norms so BM25 can score it, but is never stored.
pub fn build_schema() -> (Schema, Field, Field) {
	let mut schema_builder = Schema::builder();
	let id_field = schema_builder.add_text_field(ID_FIELD, STRING | STORED);
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer("raw").set_index_option(IndexRecordOption::WithFreqs);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing);
	let text_field = schema_builder.add_text_field(TEXT_FIELD, text_options);
	(schema_builder.build(), id_field, text_field)
}

/// Wrap already-tokenized text so Tantivy indexes exactly these tokens.
pub fn pre_tokenized(tokens: &[String]) -> PreTokenizedString {
	let mut offset = 0usize;
	let mut out = Vec::with_capacity(tokens.len());
	for (position, text) in tokens.iter().enumerate() {
		let offset_to = offset + text.len();
		out.push(Token { offset_from: offset, offset_to, position, text: text.clone(), position_length: 1 });
		offset = offset_to + 1;
	}
	PreTokenizedString { text: tokens.join(" "), tokens: out }
}
