use crate::blockchain::core::chain::{Block, GENESIS_PREVIOUS_HASH};
use crate::error::ChainError;

/// True when the hex digest starts with at least `difficulty` `'0'` characters.
pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

/// Walk the whole chain and report the first block that breaks linkage,
/// ordering, its own digest, or the proof-of-work target. Genesis is exempt
/// from proof-of-work.
pub fn validate_chain(blocks: &[Block], difficulty: usize) -> Result<(), ChainError> {
    let genesis = blocks.first().ok_or(ChainError::EmptyChain)?;

    if genesis.index != 0 {
        return Err(invalid(genesis, format!("genesis index is {}", genesis.index)));
    }
    if genesis.previous_hash != GENESIS_PREVIOUS_HASH {
        return Err(invalid(
            genesis,
            format!("genesis previous_hash is {:?}", genesis.previous_hash),
        ));
    }
    if genesis.hash != genesis.compute_hash() {
        return Err(invalid(genesis, "stored hash does not match contents".to_string()));
    }

    for (position, pair) in blocks.windows(2).enumerate() {
        let (prev, block) = (&pair[0], &pair[1]);
        let expected_index = position as u64 + 1;

        if block.index != expected_index {
            return Err(invalid(
                block,
                format!("expected index {}, found {}", expected_index, block.index),
            ));
        }
        if block.previous_hash != prev.hash {
            return Err(invalid(
                block,
                format!(
                    "previous_hash {} does not link to {}",
                    block.previous_hash, prev.hash
                ),
            ));
        }
        if !meets_difficulty(&block.hash, difficulty) {
            return Err(invalid(
                block,
                format!("hash {} misses difficulty {}", block.hash, difficulty),
            ));
        }
        if block.hash != block.compute_hash() {
            return Err(invalid(block, "stored hash does not match contents".to_string()));
        }
    }

    Ok(())
}

fn invalid(block: &Block, reason: String) -> ChainError {
    ChainError::InvalidBlock {
        index: block.index,
        reason,
    }
}
