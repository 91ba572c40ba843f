use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Caller-supplied provenance metadata for one artifact.
///
/// Nothing here is validated by the engine: empty strings, arbitrary tags
/// and any hash-shaped string are stored as given. `signature` is opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactClaim {
    pub agent_name: String,
    pub content_hash: String,
    pub fingerprint: String,
    pub purpose: String,
    pub signature: String,
    pub tags: Vec<String>,
}

/// A claim that has been assigned an id and is waiting to be mined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingArtifact {
    pub artifact_id: String,
    #[serde(flatten)]
    pub claim: ArtifactClaim,
}

/// FIFO of submissions awaiting inclusion. Unbounded, no deduplication.
#[derive(Debug, Clone, Default)]
pub struct PendingQueue {
    items: VecDeque<PendingArtifact>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, artifact: PendingArtifact) {
        self.items.push_back(artifact);
    }

    /// Removes the oldest submission.
    pub fn pop(&mut self) -> Option<PendingArtifact> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &PendingArtifact> {
        self.items.iter()
    }
}

/// Random 128-bit identifier rendered in the RFC 4122 version 4 layout.
pub fn new_artifact_id() -> String {
    let mut bytes: [u8; 16] = rand::random();
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    let hex = hex::encode(bytes);
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}
