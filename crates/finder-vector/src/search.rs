use anyhow::{anyhow, Result};
use arrow_array::{Array, Float32Array, Int32Array, RecordBatch, StringArray};

use finder_core::types::{ContentType, Document, Meta};

use crate::table::quote;

/// One nearest-neighbour row: the stored fields plus its cosine distance.
pub struct VectorHit {
	pub id: String,
	pub distance: f32,
	pub stored: Document,
}

/// Equality filter over the stored provenance columns. Empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct VectorFilter {
	pub source_file: Option<String>,
	pub content_type: Option<ContentType>,
	pub page_number: Option<u32>,
}

impl VectorFilter {
	pub fn source_file(mut self, source_file: impl Into<String>) -> Self { self.source_file = Some(source_file.into()); self }
	pub fn content_type(mut self, content_type: ContentType) -> Self { self.content_type = Some(content_type); self }
	pub fn page_number(mut self, page_number: u32) -> Self { self.page_number = Some(page_number); self }

	pub fn is_empty(&self) -> bool { self.source_file.is_none() && self.content_type.is_none() && self.page_number.is_none() }

	/// Lance SQL predicate, `None` when the filter is empty.
	pub fn to_predicate(&self) -> Option<String> {
		let mut clauses = Vec::new();
		if let Some(f) = &self.source_file { clauses.push(format!("source_file = {}", quote(f))); }
		if let Some(t) = self.content_type { clauses.push(format!("content_type = {}", quote(t.as_str()))); }
		if let Some(p) = self.page_number { clauses.push(format!("page_number = {}", p)); }
		if clauses.is_empty() { None } else { Some(clauses.join(" AND ")) }
	}
}

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
	batch.column_by_name(name).and_then(|c| c.as_any().downcast_ref::<StringArray>()).ok_or_else(|| anyhow!("{} column missing", name))
}

fn int_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Int32Array> {
	batch.column_by_name(name).and_then(|c| c.as_any().downcast_ref::<Int32Array>()).ok_or_else(|| anyhow!("{} column missing", name))
}

/// Decode a result batch from a vector query.
pub fn hits_from_batch(batch: &RecordBatch) -> Result<Vec<VectorHit>> {
	let ids = string_col(batch, "id")?;
	let contents = string_col(batch, "content")?;
	let content_types = string_col(batch, "content_type")?;
	let source_files = string_col(batch, "source_file")?;
	let metadata = string_col(batch, "metadata")?;
	let pages = int_col(batch, "page_number")?;
	let chunks = int_col(batch, "chunk_index")?;
	let distances = batch
		.column_by_name("_distance")
		.and_then(|c| c.as_any().downcast_ref::<Float32Array>())
		.ok_or_else(|| anyhow!("_distance column missing"))?;

	let mut hits = Vec::with_capacity(batch.num_rows());
	for i in 0..batch.num_rows() {
		let meta: Meta = serde_json::from_str(metadata.value(i)).unwrap_or_default();
		let stored = Document {
			id: ids.value(i).to_string(),
			content: contents.value(i).to_string(),
			content_type: ContentType::parse(content_types.value(i)),
			metadata: meta,
			source_file: source_files.value(i).to_string(),
			page_number: u32::try_from(pages.value(i)).unwrap_or(0),
			chunk_index: usize::try_from(chunks.value(i)).unwrap_or(0),
		};
		let distance = if distances.is_null(i) { 1.0 } else { distances.value(i) };
		hits.push(VectorHit { id: stored.id.clone(), distance, stored });
	}
	Ok(hits)
}
