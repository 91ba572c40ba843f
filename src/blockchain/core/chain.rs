use crate::blockchain::core::pending::{new_artifact_id, ArtifactClaim, PendingArtifact, PendingQueue};
use crate::blockchain::core::validation::{meets_difficulty, validate_chain};
use crate::error::ChainError;
use crate::miner::proof_of_work;
use crate::persistence::{InMemoryPersistence, Persistence};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::{error, info, warn};

pub const DEFAULT_DIFFICULTY: usize = 4;
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// One admitted ledger entry, or the genesis marker.
///
/// `hash` is only ever a digest produced by [`Block::compute_hash`] over the
/// other fields. It never takes part in its own computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    pub artifact_id: String,
    pub agent_name: String,
    pub content_hash: String,
    pub fingerprint: String,
    pub purpose: String,
    pub signature: String,
    pub tags: Vec<String>,
    pub previous_hash: String,
    pub nonce: u64,
    pub hash: String,
}

/// Field set covered by the block digest. Keys are declared in byte-wise
/// ascending order so serde emits them sorted.
#[derive(Serialize)]
struct CanonicalFields<'a> {
    agent_name: &'a str,
    artifact_id: &'a str,
    content_hash: &'a str,
    fingerprint: &'a str,
    index: u64,
    nonce: u64,
    previous_hash: &'a str,
    purpose: &'a str,
    signature: &'a str,
    tags: &'a [String],
    timestamp: f64,
}

impl Block {
    /// Builds an unmined candidate (`nonce = 0`, empty `hash`) stamped with
    /// the current time.
    pub fn new(index: u64, previous_hash: String, artifact: PendingArtifact) -> Self {
        let PendingArtifact { artifact_id, claim } = artifact;
        Block {
            index,
            timestamp: now_seconds(),
            artifact_id,
            agent_name: claim.agent_name,
            content_hash: claim.content_hash,
            fingerprint: claim.fingerprint,
            purpose: claim.purpose,
            signature: claim.signature,
            tags: claim.tags,
            previous_hash,
            nonce: 0,
            hash: String::new(),
        }
    }

    pub fn genesis() -> Self {
        let mut block = Block {
            index: 0,
            timestamp: now_seconds(),
            artifact_id: "GENESIS".to_string(),
            agent_name: "System".to_string(),
            content_hash: "0".to_string(),
            fingerprint: "0".to_string(),
            purpose: "Initialization".to_string(),
            signature: "N/A".to_string(),
            tags: Vec::new(),
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            nonce: 0,
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Compact JSON of every field except `hash`, keys sorted, UTF-8.
    pub fn canonical_json(&self) -> String {
        let fields = CanonicalFields {
            agent_name: &self.agent_name,
            artifact_id: &self.artifact_id,
            content_hash: &self.content_hash,
            fingerprint: &self.fingerprint,
            index: self.index,
            nonce: self.nonce,
            previous_hash: &self.previous_hash,
            purpose: &self.purpose,
            signature: &self.signature,
            tags: &self.tags,
            timestamp: self.timestamp,
        };
        // Only strings, integers and an f64 go in here; serde_json fails solely
        // on non-string map keys or custom `Serialize` errors.
        serde_json::to_string(&fields).expect("canonical fields always serialize")
    }

    /// Lowercase hex SHA-256 of [`Block::canonical_json`]. Does not touch
    /// `self.hash`.
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_json().as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn claim(&self) -> ArtifactClaim {
        ArtifactClaim {
            agent_name: self.agent_name.clone(),
            content_hash: self.content_hash.clone(),
            fingerprint: self.fingerprint.clone(),
            purpose: self.purpose.clone(),
            signature: self.signature.clone(),
            tags: self.tags.clone(),
        }
    }
}

fn now_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Why a candidate block was turned away at admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The chain tip moved after the candidate was built.
    StaleParent { expected: String, found: String },
    InsufficientWork,
    ProofMismatch,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Rejection::StaleParent { expected, found } => write!(
                f,
                "Stale parent: chain tip is {}, block builds on {}",
                expected, found
            ),
            Rejection::InsufficientWork => write!(f, "Proof does not meet the difficulty target"),
            Rejection::ProofMismatch => write!(f, "Proof does not match the block contents"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Accepted(u64),
    Rejected(Rejection),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MineOutcome {
    Mined(u64),
    /// The pending queue was empty; nothing changed.
    Empty,
    Rejected(Rejection),
}

/// The single-writer ledger: admitted blocks, pending submissions and the
/// snapshot store the chain is written to after every admission.
pub struct Ledger {
    blocks: Vec<Block>,
    pending: PendingQueue,
    difficulty: usize,
    persistence: Box<dyn Persistence>,
}

impl Ledger {
    /// Create a fresh in-memory `Ledger` holding only the genesis block.
    pub fn new(difficulty: usize) -> Self {
        Ledger {
            blocks: vec![Block::genesis()],
            pending: PendingQueue::new(),
            difficulty,
            persistence: Box::new(InMemoryPersistence::new()),
        }
    }

    /// Load the stored snapshot, or start from genesis when none exists.
    /// Loaded blocks are taken as-is.
    pub fn open(persistence: Box<dyn Persistence>, difficulty: usize) -> Result<Self, ChainError> {
        let blocks = match persistence.load_chain()? {
            Some(blocks) if blocks.is_empty() => return Err(ChainError::EmptyChain),
            Some(blocks) => {
                info!(blocks = blocks.len(), "ledger.loaded");
                blocks
            }
            None => {
                info!("No stored chain found, starting from genesis");
                vec![Block::genesis()]
            }
        };

        Ok(Ledger {
            blocks,
            pending: PendingQueue::new(),
            difficulty,
            persistence,
        })
    }

    /// Like [`Ledger::open`], but rejects a snapshot that fails
    /// [`validate_chain`].
    pub fn open_verified(persistence: Box<dyn Persistence>, difficulty: usize) -> Result<Self, ChainError> {
        let ledger = Self::open(persistence, difficulty)?;
        ledger.validate_chain()?;
        Ok(ledger)
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn last_block(&self) -> &Block {
        self.blocks.last().expect("ledger always holds a genesis block")
    }

    /// Read-only view of the admitted chain.
    pub fn get_chain(&self) -> &[Block] {
        &self.blocks
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn pending(&self) -> &PendingQueue {
        &self.pending
    }

    /// Queue a claim for mining and return its freshly assigned id.
    pub fn submit(&mut self, claim: ArtifactClaim) -> String {
        let artifact_id = new_artifact_id();
        self.pending.push(PendingArtifact {
            artifact_id: artifact_id.clone(),
            claim,
        });
        info!(
            artifact_id = %artifact_id,
            pending = self.pending.len(),
            "artifact.submitted"
        );
        artifact_id
    }

    /// Dequeue the oldest submission and build a candidate on the current tip.
    /// The submission is consumed whether or not the candidate is admitted.
    pub fn next_candidate(&mut self) -> Option<Block> {
        let artifact = self.pending.pop()?;
        let previous_hash = self.last_block().hash.clone();
        Some(Block::new(self.blocks.len() as u64, previous_hash, artifact))
    }

    /// Admit `block` if it builds on the tip, `proof` meets the difficulty
    /// target, and `proof` is the block's own digest, checked in that order.
    ///
    /// On acceptance the chain is persisted before returning. If the save
    /// fails the append is undone and the error is returned.
    pub fn add_block(&mut self, mut block: Block, proof: &str) -> Result<Admission, ChainError> {
        let tip = &self.last_block().hash;
        if block.previous_hash != *tip {
            let rejection = Rejection::StaleParent {
                expected: tip.clone(),
                found: block.previous_hash,
            };
            warn!(index = block.index, %rejection, "block.rejected");
            return Ok(Admission::Rejected(rejection));
        }

        if !meets_difficulty(proof, self.difficulty) {
            warn!(index = block.index, rejection = %Rejection::InsufficientWork, "block.rejected");
            return Ok(Admission::Rejected(Rejection::InsufficientWork));
        }

        if proof != block.compute_hash() {
            warn!(index = block.index, rejection = %Rejection::ProofMismatch, "block.rejected");
            return Ok(Admission::Rejected(Rejection::ProofMismatch));
        }

        block.hash = proof.to_string();
        let index = block.index;
        self.blocks.push(block);

        if let Err(e) = self.persistence.save_chain(&self.blocks) {
            self.blocks.pop();
            error!(index, error = %e, "Failed to persist chain, admission rolled back");
            return Err(e);
        }

        info!(index, hash = %proof, "block.admitted");
        Ok(Admission::Accepted(index))
    }

    /// Mine the oldest pending submission: build, search, admit.
    pub fn mine(&mut self) -> Result<MineOutcome, ChainError> {
        let Some(mut block) = self.next_candidate() else {
            info!("No artifacts to mine");
            return Ok(MineOutcome::Empty);
        };

        let proof = proof_of_work(&mut block, self.difficulty);
        match self.add_block(block, &proof)? {
            Admission::Accepted(index) => Ok(MineOutcome::Mined(index)),
            Admission::Rejected(rejection) => Ok(MineOutcome::Rejected(rejection)),
        }
    }

    /// Check hash linkage and proof-of-work over the whole chain.
    pub fn validate_chain(&self) -> Result<(), ChainError> {
        validate_chain(&self.blocks, self.difficulty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;

    const TEST_DIFFICULTY: usize = 2;

    fn claim(agent: &str) -> ArtifactClaim {
        ArtifactClaim {
            agent_name: agent.to_string(),
            content_hash: "abc123".to_string(),
            fingerprint: "fp1".to_string(),
            purpose: "test".to_string(),
            signature: "sig1".to_string(),
            tags: vec!["demo".to_string()],
        }
    }

    fn candidate(ledger: &mut Ledger, agent: &str) -> Block {
        ledger.submit(claim(agent));
        ledger.next_candidate().unwrap()
    }

    /// Persistence backend whose writes always fail.
    struct BrokenDisk;

    impl Persistence for BrokenDisk {
        fn save_chain(&self, _blocks: &[Block]) -> Result<()> {
            Err(ChainError::Persistence("disk unavailable".to_string()))
        }

        fn load_chain(&self) -> Result<Option<Vec<Block>>> {
            Ok(None)
        }
    }

    #[test]
    fn test_genesis_block() {
        let genesis = Block::genesis();
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.artifact_id, "GENESIS");
        assert_eq!(genesis.agent_name, "System");
        assert_eq!(genesis.content_hash, "0");
        assert_eq!(genesis.previous_hash, "0");
        assert_eq!(genesis.signature, "N/A");
        assert_eq!(genesis.purpose, "Initialization");
        assert!(genesis.tags.is_empty());
        assert_eq!(genesis.hash, genesis.compute_hash());
    }

    #[test]
    fn test_canonical_json_layout() {
        let block = Block {
            index: 1,
            timestamp: 1700000000.5,
            artifact_id: "id".to_string(),
            agent_name: "Ada".to_string(),
            content_hash: "abc".to_string(),
            fingerprint: "fp".to_string(),
            purpose: "p".to_string(),
            signature: "s".to_string(),
            tags: vec!["x".to_string(), "y".to_string()],
            previous_hash: "00ab".to_string(),
            nonce: 7,
            hash: "ignored".to_string(),
        };
        assert_eq!(
            block.canonical_json(),
            r#"{"agent_name":"Ada","artifact_id":"id","content_hash":"abc","fingerprint":"fp","index":1,"nonce":7,"previous_hash":"00ab","purpose":"p","signature":"s","tags":["x","y"],"timestamp":1700000000.5}"#
        );
    }

    #[test]
    fn test_compute_hash_is_pure_and_ignores_hash_field() {
        let mut block = Block::genesis();
        let first = block.compute_hash();
        assert_eq!(first, block.compute_hash());
        assert_eq!(first.len(), 64);

        block.hash = "ffffffff".to_string();
        assert_eq!(block.compute_hash(), first);
        assert_eq!(block.hash, "ffffffff");
    }

    #[test]
    fn test_nonce_changes_digest() {
        let mut block = Block::genesis();
        let before = block.compute_hash();
        block.nonce += 1;
        assert_ne!(block.compute_hash(), before);
    }

    #[test]
    fn test_tampering_breaks_stored_hash() {
        let mut ledger = Ledger::new(TEST_DIFFICULTY);
        ledger.submit(claim("Ada"));
        assert_eq!(ledger.mine().unwrap(), MineOutcome::Mined(1));
        let admitted = ledger.get_chain()[1].clone();

        let mutations: [fn(&mut Block); 11] = [
            |b| b.index += 1,
            |b| b.timestamp += 1.0,
            |b| b.artifact_id.push('x'),
            |b| b.agent_name = "Mallory".to_string(),
            |b| b.content_hash.push('0'),
            |b| b.fingerprint.clear(),
            |b| b.purpose.push('!'),
            |b| b.signature = "forged".to_string(),
            |b| b.tags.push("extra".to_string()),
            |b| b.previous_hash.push('0'),
            |b| b.nonce += 1,
        ];

        for mutate in mutations {
            let mut tampered = admitted.clone();
            mutate(&mut tampered);
            assert_ne!(tampered.compute_hash(), admitted.hash);
        }
    }

    #[test]
    fn test_submit_queues_artifact() {
        let mut ledger = Ledger::new(TEST_DIFFICULTY);
        let id = ledger.submit(claim("Ada"));
        assert_eq!(ledger.pending_count(), 1);
        let queued = ledger.pending().iter().next().unwrap();
        assert_eq!(queued.artifact_id, id);
        assert_eq!(queued.claim, claim("Ada"));
    }

    #[test]
    fn test_submit_accepts_empty_fields() {
        let mut ledger = Ledger::new(TEST_DIFFICULTY);
        let empty = ArtifactClaim {
            agent_name: String::new(),
            content_hash: String::new(),
            fingerprint: String::new(),
            purpose: String::new(),
            signature: String::new(),
            tags: vec![],
        };
        ledger.submit(empty.clone());
        assert_eq!(ledger.mine().unwrap(), MineOutcome::Mined(1));
        assert_eq!(ledger.get_chain()[1].claim(), empty);
    }

    #[test]
    fn test_mine_empty_queue_is_noop() {
        let mut ledger = Ledger::new(TEST_DIFFICULTY);
        assert_eq!(ledger.mine().unwrap(), MineOutcome::Empty);
        assert_eq!(ledger.get_chain().len(), 1);
    }

    #[test]
    fn test_mine_admits_in_submission_order() {
        let mut ledger = Ledger::new(TEST_DIFFICULTY);
        let first = ledger.submit(claim("first"));
        let second = ledger.submit(claim("second"));

        assert_eq!(ledger.mine().unwrap(), MineOutcome::Mined(1));
        assert_eq!(ledger.mine().unwrap(), MineOutcome::Mined(2));

        let chain = ledger.get_chain();
        assert_eq!(chain[1].artifact_id, first);
        assert_eq!(chain[2].artifact_id, second);
        assert_eq!(chain[2].previous_hash, chain[1].hash);
        assert!(ledger.validate_chain().is_ok());
    }

    #[test]
    fn test_add_block_rejects_stale_parent() {
        let mut ledger = Ledger::new(TEST_DIFFICULTY);
        let mut block = candidate(&mut ledger, "Ada");
        block.previous_hash = "deadbeef".to_string();
        let proof = proof_of_work(&mut block, TEST_DIFFICULTY);

        let outcome = ledger.add_block(block, &proof).unwrap();
        assert!(matches!(
            outcome,
            Admission::Rejected(Rejection::StaleParent { ref found, .. }) if found == "deadbeef"
        ));
        assert_eq!(ledger.get_chain().len(), 1);
    }

    #[test]
    fn test_add_block_rejects_insufficient_work() {
        let mut ledger = Ledger::new(TEST_DIFFICULTY);
        let block = candidate(&mut ledger, "Ada");
        let proof = "f".repeat(64);

        assert_eq!(
            ledger.add_block(block, &proof).unwrap(),
            Admission::Rejected(Rejection::InsufficientWork)
        );
        assert_eq!(ledger.get_chain().len(), 1);
    }

    #[test]
    fn test_add_block_rejects_forged_proof() {
        let mut ledger = Ledger::new(TEST_DIFFICULTY);
        let mut block = candidate(&mut ledger, "Ada");
        let proof = proof_of_work(&mut block, TEST_DIFFICULTY);
        block.purpose = "rewritten after mining".to_string();

        assert_eq!(
            ledger.add_block(block, &proof).unwrap(),
            Admission::Rejected(Rejection::ProofMismatch)
        );
        assert_eq!(ledger.get_chain().len(), 1);
    }

    #[test]
    fn test_stale_candidate_loses_race() {
        let mut ledger = Ledger::new(TEST_DIFFICULTY);
        let mut slow = candidate(&mut ledger, "slow");
        let mut fast = candidate(&mut ledger, "fast");
        assert_eq!(slow.previous_hash, fast.previous_hash);

        let fast_proof = proof_of_work(&mut fast, TEST_DIFFICULTY);
        assert_eq!(ledger.add_block(fast, &fast_proof).unwrap(), Admission::Accepted(1));

        let slow_proof = proof_of_work(&mut slow, TEST_DIFFICULTY);
        assert!(matches!(
            ledger.add_block(slow, &slow_proof).unwrap(),
            Admission::Rejected(Rejection::StaleParent { .. })
        ));
        assert_eq!(ledger.get_chain().len(), 2);
        assert_eq!(ledger.pending_count(), 0);
    }

    #[test]
    fn test_persistence_failure_rolls_back() {
        let mut ledger = Ledger::open(Box::new(BrokenDisk), TEST_DIFFICULTY).unwrap();
        ledger.submit(claim("Ada"));

        let result = ledger.mine();
        assert!(matches!(result, Err(ChainError::Persistence(_))));
        assert_eq!(ledger.get_chain().len(), 1);
        assert_eq!(ledger.pending_count(), 0);
    }

    #[test]
    fn test_open_reloads_saved_chain() {
        let store = InMemoryPersistence::new();
        let mut ledger = Ledger::open(Box::new(store.clone()), TEST_DIFFICULTY).unwrap();
        ledger.submit(claim("Ada"));
        ledger.mine().unwrap();

        let reopened = Ledger::open(Box::new(store), TEST_DIFFICULTY).unwrap();
        assert_eq!(reopened.get_chain(), ledger.get_chain());
        assert_eq!(reopened.pending_count(), 0);
    }

    #[test]
    fn test_open_rejects_empty_snapshot() {
        let store = InMemoryPersistence::new();
        store.save_chain(&[]).unwrap();
        assert!(matches!(
            Ledger::open(Box::new(store), TEST_DIFFICULTY),
            Err(ChainError::EmptyChain)
        ));
    }

    #[test]
    fn test_open_verified_rejects_tampered_snapshot() {
        let store = InMemoryPersistence::new();
        let mut ledger = Ledger::open(Box::new(store.clone()), TEST_DIFFICULTY).unwrap();
        ledger.submit(claim("Ada"));
        ledger.mine().unwrap();

        let mut blocks = ledger.get_chain().to_vec();
        blocks[1].agent_name = "Mallory".to_string();
        store.save_chain(&blocks).unwrap();

        // The unverified path accepts it as-is.
        assert!(Ledger::open(Box::new(store.clone()), TEST_DIFFICULTY).is_ok());
        assert!(matches!(
            Ledger::open_verified(Box::new(store), TEST_DIFFICULTY),
            Err(ChainError::InvalidBlock { index: 1, .. })
        ));
    }
}
