use anyhow::Result;
use arrow_array::RecordBatchIterator;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use finder_core::error::Error;
use finder_core::traits::{Embedder, VectorIndexer};
use finder_core::types::{last_per_id, ChunkId, Document, SearchResult, SearchType};

use crate::cache::DocumentCache;
use crate::schema::{build_arrow_schema, vector_dim};
use crate::search::{hits_from_batch, VectorFilter};
use crate::table::{ensure_table, id_predicate, open_db, table_name};
use crate::writer::docs_to_record_batch;

/// Directory (under the conversation directory) holding the Lance dataset.
pub const LANCE_DIR: &str = "lance";

/// Cosine-distance vector index for one conversation, backed by a LanceDB table
/// plus a JSON document cache. Calls block on an owned tokio runtime.
pub struct LanceVectorIndex {
	rt: Runtime,
	table: Table,
	cache: DocumentCache,
	embedder: Arc<dyn Embedder>,
	dim: i32,
	store_dir: PathBuf,
}

impl LanceVectorIndex {
	/// Open (or create) the index for `conversation_id` stored under `store_dir`.
	pub fn open(store_dir: &Path, conversation_id: &str, embedder: Arc<dyn Embedder>) -> Result<Self> {
		std::fs::create_dir_all(store_dir)?;
		let dim = i32::try_from(embedder.dim())?;
		let rt = Runtime::new()?;
		let uri = store_dir.join(LANCE_DIR).to_string_lossy().to_string();
		let name = table_name(conversation_id);
		let table = rt.block_on(async {
			let conn = open_db(&uri).await?;
			let table = ensure_table(&conn, &name, build_arrow_schema(dim)).await?;
			let schema = table.schema().await?;
			match vector_dim(&schema) {
				Some(existing) if existing != dim => {
					Err(anyhow::Error::from(Error::DimensionMismatch { expected: existing as usize, actual: dim as usize }))
				}
				_ => Ok(table),
			}
		})?;
		let cache = DocumentCache::load(store_dir);
		info!(table = %name, dir = %store_dir.display(), cached = cache.len(), "vector index opened");
		Ok(Self { rt, table, cache, embedder, dim, store_dir: store_dir.to_path_buf() })
	}

	/// Embed and store `docs`. Re-added ids replace their previous rows.
	pub fn add_documents(&mut self, docs: &[Document]) -> Result<Vec<ChunkId>> {
		if docs.is_empty() { return Ok(vec![]); }
		let docs = last_per_id(docs);
		let texts: Vec<String> = docs.iter().map(|d| d.content.clone()).collect();
		let vectors = self.embedder.embed_batch(&texts)?;
		if vectors.len() != docs.len() {
			return Err(Error::Operation(format!("embedder returned {} vectors for {} documents", vectors.len(), docs.len())).into());
		}
		if let Some(v) = vectors.iter().find(|v| v.len() != self.dim as usize) {
			return Err(Error::DimensionMismatch { expected: self.dim as usize, actual: v.len() }.into());
		}
		let batch = docs_to_record_batch(&docs, &vectors, self.dim)?;
		let schema = batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
		self.rt.block_on(async {
			let mut mi = self.table.merge_insert(&["id"]);
			mi.when_matched_update_all(None).when_not_matched_insert_all();
			mi.execute(reader).await?;
			Ok::<_, anyhow::Error>(())
		})?;
		self.cache.insert_all(&docs)?;
		debug!(n = docs.len(), "vectors stored");
		Ok(docs.into_iter().map(|d| d.id).collect())
	}

	pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
		self.search_filtered(query, top_k, &VectorFilter::default())
	}

	/// Nearest neighbours restricted to rows matching `filter`.
	pub fn search_filtered(&self, query: &str, top_k: usize, filter: &VectorFilter) -> Result<Vec<SearchResult>> {
		if top_k == 0 { return Ok(vec![]); }
		let count = self.count()?;
		if count == 0 { return Ok(vec![]); }
		let query_vec = self.embedder.embed(query)?;
		if query_vec.len() != self.dim as usize {
			return Err(Error::DimensionMismatch { expected: self.dim as usize, actual: query_vec.len() }.into());
		}
		let limit = top_k.min(count);
		let hits = self.rt.block_on(async {
			let mut q = self.table.vector_search(query_vec)?.distance_type(DistanceType::Cosine).limit(limit);
			if let Some(pred) = filter.to_predicate() { q = q.only_if(pred); }
			let mut stream = q.execute().await?;
			let mut hits = Vec::new();
			while let Some(batch) = stream.try_next().await? { hits.extend(hits_from_batch(&batch)?); }
			Ok::<_, anyhow::Error>(hits)
		})?;
		let mut results: Vec<SearchResult> = hits
			.into_iter()
			.map(|hit| {
				let document = match self.cache.get(&hit.id) {
					Some(doc) => doc.clone(),
					None => {
						warn!(id = %hit.id, "document missing from cache; rebuilt from stored columns");
						hit.stored
					}
				};
				SearchResult::new(document, 1.0 - hit.distance, SearchType::Vector)
			})
			.collect();
		results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
		debug!(query, hits = results.len(), "vector search");
		Ok(results)
	}

	pub fn delete_documents(&mut self, ids: &[ChunkId]) -> Result<()> {
		if ids.is_empty() { return Ok(()); }
		let predicate = id_predicate(ids);
		self.rt.block_on(async {
			self.table.delete(&predicate).await?;
			Ok::<_, anyhow::Error>(())
		})?;
		self.cache.remove_all(ids)
	}

	pub fn clear(&mut self) -> Result<()> {
		self.rt.block_on(async {
			self.table.delete("true").await?;
			Ok::<_, anyhow::Error>(())
		})?;
		self.cache.clear()?;
		info!(dir = %self.store_dir.display(), "vector index cleared");
		Ok(())
	}

	/// Row count of the underlying table.
	pub fn count(&self) -> Result<usize> {
		Ok(self.rt.block_on(async { self.table.count_rows(None).await })?)
	}

	pub fn get_document(&self, id: &str) -> Option<Document> { self.cache.get(id).cloned() }

	pub fn all_documents(&self) -> Vec<Document> { self.cache.all() }
}

/// Remove everything persisted for `conversation_id` under `root`. Missing directories are fine.
pub fn delete_store(root: &Path, conversation_id: &str) -> Result<()> {
	let dir = root.join(conversation_id);
	if dir.exists() {
		std::fs::remove_dir_all(&dir)?;
		info!(dir = %dir.display(), "conversation store deleted");
	}
	Ok(())
}

impl VectorIndexer for LanceVectorIndex {
	fn add_documents(&mut self, docs: &[Document]) -> Result<Vec<ChunkId>> { Self::add_documents(self, docs) }
	fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> { Self::search(self, query, k) }
	fn delete_documents(&mut self, ids: &[ChunkId]) -> Result<()> { Self::delete_documents(self, ids) }
	fn clear(&mut self) -> Result<()> { Self::clear(self) }
	fn document_count(&self) -> Result<usize> { self.count() }
	fn get_document(&self, id: &str) -> Option<Document> { Self::get_document(self, id) }
	fn all_documents(&self) -> Vec<Document> { Self::all_documents(self) }
}
