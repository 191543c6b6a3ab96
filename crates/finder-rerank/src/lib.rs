//! Cross-encoder providers and the Reranker.

use anyhow::{anyhow, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use finder_core::config::{resolve_with_base, RerankerSettings};
use finder_core::traits::CrossEncoder;

pub mod fake;
pub mod model;
pub mod reranker;

pub use fake::FakeCrossEncoder;
pub use model::CrossEncoderModel;
pub use reranker::{Reranker, DEFAULT_ORIGINAL_WEIGHT, DEFAULT_RERANK_WEIGHT};

const DEFAULT_MODEL_DIRS: [&str; 2] = ["models/ms-marco-MiniLM-L-6-v2", "../models/ms-marco-MiniLM-L-6-v2"];

/// Cross-encoder from settings. `use_fake` (or `APP_USE_FAKE_RERANKER=1`) selects the overlap scorer.
pub fn cross_encoder_from_settings(settings: &RerankerSettings, base: &Path) -> Result<Arc<dyn CrossEncoder>> {
    let env_fake = std::env::var("APP_USE_FAKE_RERANKER").map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    if settings.use_fake || env_fake {
        info!("using FakeCrossEncoder");
        return Ok(Arc::new(FakeCrossEncoder));
    }
    let dir = match &settings.model_dir {
        Some(dir) => resolve_with_base(base, dir),
        None => DEFAULT_MODEL_DIRS
            .iter()
            .map(|d| base.join(d))
            .find(|p| p.exists())
            .ok_or_else(|| anyhow!("Could not locate cross-encoder directory (set reranker.model_dir)"))?,
    };
    Ok(Arc::new(CrossEncoderModel::load(&dir, settings.max_len)?))
}
