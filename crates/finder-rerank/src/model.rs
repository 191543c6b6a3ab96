use anyhow::Result;
use candle_core::{Device, Module};
use candle_nn::{linear, Linear};
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use serde::Deserialize;
use std::path::Path;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use finder_core::traits::CrossEncoder;
use finder_embed::tokenize::{encode_on_device, load_tokenizer};
use finder_embed::weights::{load_var_builder, read_config};
use finder_embed::select_device;

const BATCH_SIZE: usize = 16;

#[derive(Deserialize)]
struct Dims {
    hidden_size: usize,
}

/// BERT sequence-classification checkpoint (e.g. ms-marco-MiniLM-L-6-v2) scoring
/// a `(query, passage)` pair as the single logit over the pooled `[CLS]` state.
pub struct CrossEncoderModel {
    bert: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    device: Device,
}

impl CrossEncoderModel {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading cross-encoder");
        let tokenizer = load_tokenizer(&model_dir.join("tokenizer.json"), max_len)?;
        let config: BertConfig = read_config(model_dir)?;
        let Dims { hidden_size } = read_config(model_dir)?;
        let vb = load_var_builder(model_dir, DTYPE, &device)?;
        let bert = BertModel::load(vb.clone(), &config)?;
        let pooler = match linear(hidden_size, hidden_size, vb.pp("bert.pooler.dense")) {
            Ok(l) => l,
            Err(_) => linear(hidden_size, hidden_size, vb.pp("pooler.dense"))?,
        };
        let classifier = linear(hidden_size, 1, vb.pp("classifier"))?;
        info!("cross-encoder loaded");
        Ok(Self { bert, pooler, classifier, tokenizer, device })
    }

    fn score_chunk(&self, pairs: &[(String, String)]) -> Result<Vec<f32>> {
        let inputs: Vec<(&str, &str)> = pairs.iter().map(|(q, d)| (q.as_str(), d.as_str())).collect();
        let batch = encode_on_device(&self.tokenizer, inputs, &self.device)?;
        let hidden = self.bert.forward(&batch.input_ids, &batch.token_type_ids, Some(&batch.attention_mask))?;
        let cls = hidden.narrow(1, 0, 1)?.squeeze(1)?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        let logits = self.classifier.forward(&pooled)?.squeeze(1)?;
        Ok(logits.to_device(&Device::Cpu)?.to_vec1::<f32>()?)
    }
}

impl CrossEncoder for CrossEncoderModel {
    fn score_pairs(&self, pairs: &[(String, String)]) -> Result<Vec<f32>> {
        let mut scores = Vec::with_capacity(pairs.len());
        for chunk in pairs.chunks(BATCH_SIZE) {
            scores.extend(self.score_chunk(chunk)?);
        }
        debug!(pairs = pairs.len(), "scored pairs");
        Ok(scores)
    }
}
