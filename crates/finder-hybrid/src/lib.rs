//! Hybrid retrieval: rank fusion, the per-conversation orchestrator and the
//! expansion/rerank pipeline around it.

pub mod engine;
pub mod fusion;
pub mod pipeline;
pub mod registry;

pub use engine::{FusionConfig, HybridSearchEngine, ScoreBreakdown, ScoredId};
pub use fusion::{rrf_fuse, rrf_fuse_many, DEFAULT_RRF_K};
pub use pipeline::{Retrieval, RetrievalPipeline};
pub use registry::{ConversationEngine, ConversationIndexes};
