//! Proof-of-work search for candidate blocks

use crate::blockchain::{meets_difficulty, Block};
use std::time::Instant;
use tracing::debug;

/// Scan nonces upward from zero until the block digest carries `difficulty`
/// leading `'0'` hex characters, and return that digest.
///
/// The winning nonce is left in `block.nonce`; `block.hash` is not touched.
/// Deterministic for fixed block fields and unbounded: a `difficulty` above
/// 64 never terminates.
pub fn proof_of_work(block: &mut Block, difficulty: usize) -> String {
    let start = Instant::now();
    block.nonce = 0;
    let mut hash = block.compute_hash();

    while !meets_difficulty(&hash, difficulty) {
        block.nonce += 1;
        hash = block.compute_hash();
    }

    debug!(
        index = block.index,
        nonce = block.nonce,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "pow.found"
    );
    hash
}

/// Hashes per second for a search that ended on `nonce`.
pub fn hash_rate(nonce: u64, elapsed: std::time::Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    (nonce + 1) as f64 / secs
}
