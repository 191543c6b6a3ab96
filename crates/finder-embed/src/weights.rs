use anyhow::{anyhow, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Read model weights from `model.safetensors`, falling back to `pytorch_model.bin`.
pub fn load_var_builder(model_dir: &Path, dtype: DType, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    let pickle = model_dir.join("pytorch_model.bin");
    let tensors: HashMap<String, Tensor> = if safetensors.exists() {
        info!(path = %safetensors.display(), "loading weights");
        candle_core::safetensors::load(&safetensors, device)?
    } else if pickle.exists() {
        info!(path = %pickle.display(), "loading weights");
        candle_core::pickle::read_all(&pickle)?.into_iter().collect()
    } else {
        return Err(anyhow!("no model.safetensors or pytorch_model.bin in {}", model_dir.display()));
    };
    Ok(VarBuilder::from_tensors(tensors, dtype, device))
}

/// Deserialize `config.json` from `model_dir` into any view of it.
pub fn read_config<T: serde::de::DeserializeOwned>(model_dir: &Path) -> Result<T> {
    let path = model_dir.join("config.json");
    let raw = std::fs::read_to_string(&path).map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;
    Ok(serde_json::from_str(&raw)?)
}
