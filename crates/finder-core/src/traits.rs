use crate::types::{ChunkId, Document, GenerationRequest, SearchResult};

/// Dense embedding model. Must be deterministic for identical input.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// Pairwise relevance model. Output order matches input order; higher is more relevant.
pub trait CrossEncoder: Send + Sync {
    fn score_pairs(&self, pairs: &[(String, String)]) -> anyhow::Result<Vec<f32>>;

    fn score(&self, query: &str, document: &str) -> anyhow::Result<f32> {
        self.score_pairs(&[(query.to_string(), document.to_string())])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("cross-encoder returned no score"))
    }
}

/// Incremental text fragments in generation order. Dropping it stops consumption.
pub type TextStream = Box<dyn Iterator<Item = anyhow::Result<String>> + Send>;

/// Text-generation backend (hosted API or local server).
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, request: &GenerationRequest) -> anyhow::Result<String>;
    fn generate_stream(&self, request: &GenerationRequest) -> anyhow::Result<TextStream>;
}

/// Term-match index over one conversation's documents.
pub trait TextIndexer: Send + Sync {
    fn add_documents(&mut self, docs: &[Document]) -> anyhow::Result<Vec<ChunkId>>;
    fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<SearchResult>>;
    fn delete_documents(&mut self, ids: &[ChunkId]) -> anyhow::Result<()>;
    fn clear(&mut self) -> anyhow::Result<()>;
    fn document_count(&self) -> usize;
}

/// Nearest-neighbour index over one conversation's documents.
pub trait VectorIndexer: Send + Sync {
    fn add_documents(&mut self, docs: &[Document]) -> anyhow::Result<Vec<ChunkId>>;
    fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<SearchResult>>;
    fn delete_documents(&mut self, ids: &[ChunkId]) -> anyhow::Result<()>;
    fn clear(&mut self) -> anyhow::Result<()>;
    fn document_count(&self) -> anyhow::Result<usize>;
    fn get_document(&self, id: &str) -> Option<Document>;
    fn all_documents(&self) -> Vec<Document>;
}
