//! Snapshot persistence for the GenAuth chain
//!
//! The whole chain is rewritten on every admission. Storage is never
//! incremental even though the ledger itself is append-only.

use crate::blockchain::Block;
use crate::error::ChainError;
use parking_lot::Mutex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::debug;

pub const DEFAULT_CHAIN_FILE: &str = "genauth_chain.json";

/// Abstraction for snapshot backends. `save_chain` must replace any prior
/// snapshot atomically; `load_chain` returns `None` when nothing was saved.
pub trait Persistence: Send + Sync {
    fn save_chain(&self, blocks: &[Block]) -> Result<(), ChainError>;
    fn load_chain(&self) -> Result<Option<Vec<Block>>, ChainError>;
}

/// Pretty-printed JSON array of blocks on disk.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

impl Persistence for JsonFilePersistence {
    fn save_chain(&self, blocks: &[Block]) -> Result<(), ChainError> {
        let dir = self.parent_dir();
        fs::create_dir_all(&dir)?;

        let bytes = serde_json::to_vec_pretty(blocks)?;

        // Write beside the target and rename over it so readers never see a
        // half-written snapshot.
        let mut temp = NamedTempFile::new_in(&dir)?;
        temp.as_file_mut().write_all(&bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| {
            ChainError::Persistence(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e.error
            ))
        })?;

        debug!(path = %self.path.display(), blocks = blocks.len(), "chain.saved");
        Ok(())
    }

    fn load_chain(&self) -> Result<Option<Vec<Block>>, ChainError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)?;
        let blocks: Vec<Block> = serde_json::from_str(&contents)?;
        Ok(Some(blocks))
    }
}

/// Simple in-memory persistence implementation useful for tests and ephemeral
/// runs. Clones share the same snapshot.
#[derive(Clone, Default)]
pub struct InMemoryPersistence {
    snapshot: Arc<Mutex<Option<Vec<Block>>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<Vec<Block>> {
        self.snapshot.lock().clone()
    }
}

impl Persistence for InMemoryPersistence {
    fn save_chain(&self, blocks: &[Block]) -> Result<(), ChainError> {
        *self.snapshot.lock() = Some(blocks.to_vec());
        Ok(())
    }

    fn load_chain(&self) -> Result<Option<Vec<Block>>, ChainError> {
        Ok(self.snapshot.lock().clone())
    }
}
