use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::{debug, info, warn};

use finder_core::traits::TextIndexer;
use finder_core::types::{last_per_id, ChunkId, Document, SearchResult, SearchType};

use crate::tantivy_utils::{build_schema, pre_tokenized};
use crate::tokenize::tokenize;

pub const SNAPSHOT_FILE: &str = "bm25_index.json";

#[derive(Default, Deserialize)]
struct Snapshot {
	#[serde(default)]
	documents: Vec<Document>,
	#[serde(default)]
	tokenized_corpus: Vec<Vec<String>>,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
	documents: &'a [Document],
	tokenized_corpus: &'a [Vec<String>],
}

/// Derived BM25 statistics: an in-RAM Tantivy index over the current corpus.
struct Bm25 {
	reader: IndexReader,
	id_field: Field,
	text_field: Field,
}

impl Bm25 {
	fn build(documents: &[Document], tokenized_corpus: &[Vec<String>]) -> Result<Self> {
		let (schema, id_field, text_field) = build_schema();
		let index = Index::create_in_ram(schema);
		let mut writer: IndexWriter = index.writer_with_num_threads(1, 15_000_000)?;
		for (doc, tokens) in documents.iter().zip(tokenized_corpus) {
			let mut tdoc = TantivyDocument::default();
			tdoc.add_text(id_field, &doc.id);
			tdoc.add_pre_tokenized_text(text_field, pre_tokenized(tokens));
			writer.add_document(tdoc)?;
		}
		writer.commit()?;
		let reader: IndexReader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
		Ok(Self { reader, id_field, text_field })
	}

	/// Raw BM25 scores for the best `k` matching documents, best first.
	fn top(&self, query_tokens: &[String], k: usize) -> Result<Vec<(String, f32)>> {
		let clauses: Vec<(Occur, Box<dyn Query>)> = query_tokens
			.iter()
			.map(|t| {
				let q: Box<dyn Query> = Box::new(TermQuery::new(Term::from_field_text(self.text_field, t), IndexRecordOption::WithFreqs));
				(Occur::Should, q)
			})
			.collect();
		let query = BooleanQuery::new(clauses);
		let searcher = self.reader.searcher();
		let top_docs = searcher.search(&query, &TopDocs::with_limit(k))?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr)?;
			if let Some(id) = doc.get_first(self.id_field).and_then(|v| v.as_str()) {
				hits.push((id.to_string(), score));
			}
		}
		Ok(hits)
	}
}

/// Keyword index for a single conversation.
///
/// The snapshot (documents and their token lists) is written after every
/// mutation; BM25 statistics are rebuilt from it in full. That is O(total
/// tokens) per mutation, which holds up for tens to low hundreds of chunks.
pub struct KeywordIndex {
	snapshot_path: PathBuf,
	documents: Vec<Document>,
	tokenized_corpus: Vec<Vec<String>>,
	positions: HashMap<String, usize>,
	bm25: Option<Bm25>,
}

impl KeywordIndex {
	/// Open (or create) the index stored under `store_dir`.
	pub fn open(store_dir: &Path) -> Result<Self> {
		std::fs::create_dir_all(store_dir)?;
		let snapshot_path = store_dir.join(SNAPSHOT_FILE);
		let snapshot = load_snapshot(&snapshot_path);
		let mut index = Self { snapshot_path, documents: Vec::new(), tokenized_corpus: Vec::new(), positions: HashMap::new(), bm25: None };
		let Snapshot { documents, mut tokenized_corpus } = snapshot;
		if tokenized_corpus.len() != documents.len() {
			warn!(path = %index.snapshot_path.display(), "token lists out of step with documents; re-tokenizing");
			tokenized_corpus = documents.iter().map(|d| tokenize(&d.content)).collect();
		}
		index.documents = documents;
		index.tokenized_corpus = tokenized_corpus;
		index.rebuild()?;
		debug!(docs = index.documents.len(), path = %index.snapshot_path.display(), "keyword index loaded");
		Ok(index)
	}

	/// Append documents. A document whose id is already present replaces the old entry.
	pub fn add_documents(&mut self, docs: &[Document]) -> Result<Vec<ChunkId>> {
		if docs.is_empty() { return Ok(vec![]); }
		let docs = last_per_id(docs);
		let incoming: HashSet<&str> = docs.iter().map(|d| d.id.as_str()).collect();
		if self.documents.iter().any(|d| incoming.contains(d.id.as_str())) {
			debug!("replacing documents with re-added ids");
			self.retain(|d| !incoming.contains(d.id.as_str()));
		}
		let mut ids = Vec::with_capacity(docs.len());
		for doc in docs {
			self.tokenized_corpus.push(tokenize(&doc.content));
			ids.push(doc.id.clone());
			self.documents.push(doc);
		}
		self.rebuild()?;
		self.save()?;
		Ok(ids)
	}

	pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
		let Some(bm25) = &self.bm25 else { return Ok(vec![]) };
		if top_k == 0 || self.documents.is_empty() { return Ok(vec![]); }
		let query_tokens = tokenize(query);
		if query_tokens.is_empty() { return Ok(vec![]); }

		let hits: Vec<(String, f32)> = bm25.top(&query_tokens, top_k.min(self.documents.len()))?.into_iter().filter(|(_, s)| *s > 0.0).collect();
		let max_score = hits.iter().map(|(_, s)| *s).fold(0.0f32, f32::max);
		let max_score = if max_score > 0.0 { max_score } else { 1.0 };
		let mut results: Vec<SearchResult> = hits
			.into_iter()
			.filter_map(|(id, score)| {
				let pos = *self.positions.get(&id)?;
				Some(SearchResult::new(self.documents[pos].clone(), score / max_score, SearchType::Keyword))
			})
			.collect();
		results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
		debug!(query, hits = results.len(), "keyword search");
		Ok(results)
	}

	pub fn delete_documents(&mut self, ids: &[ChunkId]) -> Result<()> {
		if ids.is_empty() { return Ok(()); }
		let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
		self.retain(|d| !doomed.contains(d.id.as_str()));
		self.rebuild()?;
		self.save()
	}

	pub fn clear(&mut self) -> Result<()> {
		self.documents.clear();
		self.tokenized_corpus.clear();
		self.rebuild()?;
		self.save()
	}

	pub fn get_document(&self, id: &str) -> Option<&Document> {
		self.positions.get(id).map(|&i| &self.documents[i])
	}

	pub fn all_documents(&self) -> &[Document] { &self.documents }

	pub fn document_count(&self) -> usize { self.documents.len() }

	/// Token list stored for a document, as produced by `tokenize`.
	pub fn tokens_of(&self, id: &str) -> Option<&[String]> {
		self.positions.get(id).map(|&i| self.tokenized_corpus[i].as_slice())
	}

	fn retain(&mut self, keep: impl Fn(&Document) -> bool) {
		let mut documents = Vec::with_capacity(self.documents.len());
		let mut tokenized = Vec::with_capacity(self.tokenized_corpus.len());
		for (doc, tokens) in self.documents.drain(..).zip(self.tokenized_corpus.drain(..)) {
			if keep(&doc) { documents.push(doc); tokenized.push(tokens); }
		}
		self.documents = documents;
		self.tokenized_corpus = tokenized;
	}

	fn rebuild(&mut self) -> Result<()> {
		self.positions = self.documents.iter().enumerate().map(|(i, d)| (d.id.clone(), i)).collect();
		self.bm25 = if self.documents.is_empty() { None } else { Some(Bm25::build(&self.documents, &self.tokenized_corpus)?) };
		Ok(())
	}

	fn save(&self) -> Result<()> {
		let data = serde_json::to_vec(&SnapshotRef { documents: &self.documents, tokenized_corpus: &self.tokenized_corpus })?;
		let tmp = self.snapshot_path.with_extension("json.tmp");
		std::fs::write(&tmp, data)?;
		std::fs::rename(&tmp, &self.snapshot_path)?;
		info!(docs = self.documents.len(), path = %self.snapshot_path.display(), "keyword snapshot saved");
		Ok(())
	}
}

fn load_snapshot(path: &Path) -> Snapshot {
	if !path.exists() { return Snapshot::default(); }
	match std::fs::read(path).map_err(anyhow::Error::from).and_then(|bytes| Ok(serde_json::from_slice::<Snapshot>(&bytes)?)) {
		Ok(snapshot) => snapshot,
		Err(e) => {
			warn!(path = %path.display(), error = %e, "unreadable keyword snapshot; starting empty");
			Snapshot::default()
		}
	}
}

impl TextIndexer for KeywordIndex {
	fn add_documents(&mut self, docs: &[Document]) -> Result<Vec<ChunkId>> { Self::add_documents(self, docs) }
	fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> { Self::search(self, query, k) }
	fn delete_documents(&mut self, ids: &[ChunkId]) -> Result<()> { Self::delete_documents(self, ids) }
	fn clear(&mut self) -> Result<()> { Self::clear(self) }
	fn document_count(&self) -> usize { Self::document_count(self) }
}
