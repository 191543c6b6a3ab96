//! Embedding providers.
//!
//! `EmbeddingModel` runs a BERT sentence encoder through candle;
//! `FakeEmbedder` is a deterministic hashing stand-in that needs no weights.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use finder_core::config::{resolve_with_base, EmbeddingSettings};
use finder_core::traits::Embedder;

pub mod device;
pub mod fake;
pub mod model;
pub mod pool;
pub mod tokenize;
pub mod weights;

pub use device::select_device;
pub use fake::FakeEmbedder;
pub use model::{resolve_model_dir, EmbeddingModel};
pub use pool::masked_mean_l2;

pub const DEFAULT_FAKE_DIM: usize = 384;
const DEFAULT_MAX_LEN: usize = 256;

fn fake_requested() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Embedder from environment alone: the fake one when `APP_USE_FAKE_EMBEDDINGS` is set,
/// otherwise the BERT model found by `resolve_model_dir`.
pub fn get_default_embedder() -> Result<Arc<dyn Embedder>> {
    if fake_requested() {
        info!(dim = DEFAULT_FAKE_DIM, "using FakeEmbedder");
        return Ok(Arc::new(FakeEmbedder::new(DEFAULT_FAKE_DIM)));
    }
    Ok(Arc::new(EmbeddingModel::load(&resolve_model_dir()?, DEFAULT_MAX_LEN)?))
}

/// Embedder from settings; relative `model_dir` values resolve against `base`.
pub fn embedder_from_settings(settings: &EmbeddingSettings, base: &Path) -> Result<Arc<dyn Embedder>> {
    if settings.use_fake || fake_requested() {
        info!(dim = settings.fake_dim, "using FakeEmbedder");
        return Ok(Arc::new(FakeEmbedder::new(settings.fake_dim)));
    }
    let dir = match &settings.model_dir {
        Some(dir) => resolve_with_base(base, dir),
        None => resolve_model_dir()?,
    };
    Ok(Arc::new(EmbeddingModel::load(&dir, settings.max_len)?))
}
