//! PoW validation.

use tally_types::Hash;

use crate::Difficulty;

/// Whether a block hash satisfies the network difficulty predicate.
pub fn validate_work(block_hash: &Hash, difficulty: Difficulty) -> bool {
    block_hash.leading_zero_bits() >= difficulty.bits()
}
