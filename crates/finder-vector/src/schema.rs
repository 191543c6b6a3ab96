use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

/// Row layout of a conversation table. `dim` comes from the embedder.
pub fn build_arrow_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("id", DataType::Utf8, false),
		Field::new("content", DataType::Utf8, false),
		Field::new("content_type", DataType::Utf8, false),
		Field::new("source_file", DataType::Utf8, false),
		Field::new("page_number", DataType::Int32, false),
		Field::new("chunk_index", DataType::Int32, false),
		Field::new("metadata", DataType::Utf8, false),
		Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}

/// Vector width recorded in an existing table's schema, if it has a vector column.
pub fn vector_dim(schema: &Schema) -> Option<i32> {
	match schema.field_with_name("vector").ok()?.data_type() {
		DataType::FixedSizeList(_, n) => Some(*n),
		_ => None,
	}
}
