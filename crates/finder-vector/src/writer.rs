use anyhow::Result;
use arrow_array::{FixedSizeListArray, Int32Array, RecordBatch, StringArray};
use std::sync::Arc;

use finder_core::types::Document;

use crate::schema::build_arrow_schema;

/// One record batch holding `docs` and their vectors, row for row.
pub fn docs_to_record_batch(docs: &[Document], vectors: &[Vec<f32>], dim: i32) -> Result<RecordBatch> {
	let schema = build_arrow_schema(dim);
	let mut ids = Vec::with_capacity(docs.len());
	let mut contents = Vec::with_capacity(docs.len());
	let mut content_types = Vec::with_capacity(docs.len());
	let mut source_files = Vec::with_capacity(docs.len());
	let mut page_numbers = Vec::with_capacity(docs.len());
	let mut chunk_indices = Vec::with_capacity(docs.len());
	let mut metadata = Vec::with_capacity(docs.len());
	let mut rows: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(docs.len());
	for (doc, vector) in docs.iter().zip(vectors) {
		ids.push(doc.id.clone());
		contents.push(doc.content.clone());
		content_types.push(doc.content_type.as_str().to_string());
		source_files.push(doc.source_file.clone());
		page_numbers.push(i32::try_from(doc.page_number)?);
		chunk_indices.push(i32::try_from(doc.chunk_index)?);
		metadata.push(serde_json::to_string(&doc.metadata)?);
		rows.push(Some(vector.iter().map(|&x| Some(x)).collect()));
	}
	let record_batch = RecordBatch::try_new(schema, vec![
		Arc::new(StringArray::from(ids)),
		Arc::new(StringArray::from(contents)),
		Arc::new(StringArray::from(content_types)),
		Arc::new(StringArray::from(source_files)),
		Arc::new(Int32Array::from(page_numbers)),
		Arc::new(Int32Array::from(chunk_indices)),
		Arc::new(StringArray::from(metadata)),
		Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(rows.into_iter(), dim)),
	])?;
	Ok(record_batch)
}
