use anyhow::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use finder_core::error::Error;
use finder_core::traits::Embedder;
use finder_text::KeywordIndex;
use finder_vector::{delete_store, LanceVectorIndex};

use crate::engine::{FusionConfig, HybridSearchEngine};

pub type ConversationEngine = HybridSearchEngine<KeywordIndex, LanceVectorIndex>;

/// Per-conversation engines under `<root>/<conversation_id>/`, opened on first
/// use and sharing one embedder.
pub struct ConversationIndexes {
    root: PathBuf,
    embedder: Arc<dyn Embedder>,
    config: FusionConfig,
    engines: HashMap<String, ConversationEngine>,
}

impl ConversationIndexes {
    pub fn new(root: impl Into<PathBuf>, embedder: Arc<dyn Embedder>, config: FusionConfig) -> Self {
        Self { root: root.into(), embedder, config, engines: HashMap::new() }
    }

    pub fn root(&self) -> &Path { &self.root }

    /// Engine for `conversation_id`, creating or loading its indexes if needed.
    pub fn open(&mut self, conversation_id: &str) -> Result<&mut ConversationEngine> {
        validate_id(conversation_id)?;
        if !self.engines.contains_key(conversation_id) {
            let dir = self.root.join(conversation_id);
            let text = KeywordIndex::open(&dir)?;
            let vector = LanceVectorIndex::open(&dir, conversation_id, self.embedder.clone())?;
            info!(conversation = conversation_id, dir = %dir.display(), "conversation indexes opened");
            self.engines.insert(conversation_id.to_string(), HybridSearchEngine::new(text, vector, self.config));
        }
        self.engines
            .get_mut(conversation_id)
            .ok_or_else(|| Error::NotFound(conversation_id.to_string()).into())
    }

    /// Already-opened engine, if any.
    pub fn get(&self, conversation_id: &str) -> Option<&ConversationEngine> { self.engines.get(conversation_id) }

    /// Whether anything is persisted for `conversation_id`.
    pub fn exists(&self, conversation_id: &str) -> bool {
        validate_id(conversation_id).is_ok() && self.root.join(conversation_id).exists()
    }

    /// Drop the engine and remove all persisted state. Unknown ids are not an error.
    pub fn delete(&mut self, conversation_id: &str) -> Result<()> {
        validate_id(conversation_id)?;
        self.engines.remove(conversation_id);
        delete_store(&self.root, conversation_id)
    }
}

fn validate_id(conversation_id: &str) -> Result<()> {
    let bad = conversation_id.is_empty()
        || conversation_id == "."
        || conversation_id == ".."
        || conversation_id.contains(['/', '\\']);
    if bad {
        return Err(Error::InvalidConfig(format!("invalid conversation id {:?}", conversation_id)).into());
    }
    Ok(())
}
