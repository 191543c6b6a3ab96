//! JSON mirror of every stored document, keyed by id.
//!
//! Content lookups go through this file rather than the Lance table, so
//! `get_document` and `all_documents` never touch the vector store.

use anyhow::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

use finder_core::types::Document;

pub const CACHE_FILE: &str = "document_cache.json";

pub struct DocumentCache {
	path: PathBuf,
	docs: HashMap<String, Document>,
}

impl DocumentCache {
	pub fn load(store_dir: &Path) -> Self {
		let path = store_dir.join(CACHE_FILE);
		let docs = if path.exists() {
			match std::fs::read(&path).map_err(anyhow::Error::from).and_then(|b| Ok(serde_json::from_slice::<HashMap<String, Document>>(&b)?)) {
				Ok(docs) => docs,
				Err(e) => {
					warn!(path = %path.display(), error = %e, "unreadable document cache; starting empty");
					HashMap::new()
				}
			}
		} else {
			HashMap::new()
		};
		Self { path, docs }
	}

	pub fn get(&self, id: &str) -> Option<&Document> { self.docs.get(id) }

	pub fn len(&self) -> usize { self.docs.len() }

	pub fn is_empty(&self) -> bool { self.docs.is_empty() }

	/// Documents ordered by source file, page, chunk index and id.
	pub fn all(&self) -> Vec<Document> {
		let mut docs: Vec<Document> = self.docs.values().cloned().collect();
		docs.sort_by(|a, b| {
			(a.source_file.as_str(), a.page_number, a.chunk_index, a.id.as_str())
				.cmp(&(b.source_file.as_str(), b.page_number, b.chunk_index, b.id.as_str()))
		});
		docs
	}

	pub fn insert_all(&mut self, docs: &[Document]) -> Result<()> {
		for doc in docs { self.docs.insert(doc.id.clone(), doc.clone()); }
		self.save()
	}

	pub fn remove_all(&mut self, ids: &[String]) -> Result<()> {
		for id in ids { self.docs.remove(id); }
		self.save()
	}

	pub fn clear(&mut self) -> Result<()> {
		self.docs.clear();
		self.save()
	}

	fn save(&self) -> Result<()> {
		let tmp = self.path.with_extension("json.tmp");
		std::fs::write(&tmp, serde_json::to_vec(&self.docs)?)?;
		std::fs::rename(&tmp, &self.path)?;
		Ok(())
	}
}
