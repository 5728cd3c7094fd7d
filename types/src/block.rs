//! Blocks and the unsealed candidates the miner assembles.

use serde::{Deserialize, Serialize};

use crate::{Account, Hash, SignedTx};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Hash of the previous block, [`Hash::ZERO`] for the first block.
    pub parent: Hash,
    pub number: u64,
    pub nonce: u64,
    pub time: u64,
    /// Account credited with the block reward.
    pub miner: Account,
}

impl BlockHeader {
    /// Hash this header over already-computed transaction hashes.
    pub fn hash_with(&self, tx_hashes: &[Hash]) -> Hash {
        let mut buf = Vec::with_capacity(100 + 32 * tx_hashes.len());
        buf.extend_from_slice(self.parent.as_bytes());
        buf.extend_from_slice(&self.number.to_le_bytes());
        buf.extend_from_slice(&self.nonce.to_le_bytes());
        buf.extend_from_slice(&self.time.to_le_bytes());
        buf.extend_from_slice(self.miner.as_bytes());
        for hash in tx_hashes {
            buf.extend_from_slice(hash.as_bytes());
        }
        Hash::digest(&buf)
    }
}

/// A sealed block: a header whose hash satisfies the network difficulty,
/// and the transactions it confirms.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    #[serde(rename = "payload", default)]
    pub txs: Vec<SignedTx>,
}

impl Block {
    pub fn new(header: BlockHeader, txs: Vec<SignedTx>) -> Self {
        Self { header, txs }
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn parent(&self) -> Hash {
        self.header.parent
    }

    /// Blake2b over the header fields followed by every transaction hash in order.
    pub fn hash(&self) -> Hash {
        let tx_hashes: Vec<Hash> = self.tx_hashes().collect();
        self.header.hash_with(&tx_hashes)
    }

    pub fn tx_hashes(&self) -> impl Iterator<Item = Hash> + '_ {
        self.txs.iter().map(SignedTx::hash)
    }
}

/// An assembled but unsealed block.
///
/// Transactions are sorted by hash on construction so that the same pool
/// contents always produce the same block contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateBlock {
    pub parent: Hash,
    pub number: u64,
    pub miner: Account,
    txs: Vec<SignedTx>,
    tx_hashes: Vec<Hash>,
}

impl CandidateBlock {
    pub fn new(parent: Hash, number: u64, miner: Account, txs: Vec<SignedTx>) -> Self {
        let mut keyed: Vec<(Hash, SignedTx)> = txs.into_iter().map(|tx| (tx.hash(), tx)).collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        let (tx_hashes, txs) = keyed.into_iter().unzip();
        Self {
            parent,
            number,
            miner,
            txs,
            tx_hashes,
        }
    }

    pub fn txs(&self) -> &[SignedTx] {
        &self.txs
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    fn header(&self, nonce: u64, time: u64) -> BlockHeader {
        BlockHeader {
            parent: self.parent,
            number: self.number,
            nonce,
            time,
            miner: self.miner,
        }
    }

    /// Hash of the block this candidate would become with `nonce` and `time`,
    /// without cloning the transactions. This is the proof-of-work hot path.
    pub fn hash_for(&self, nonce: u64, time: u64) -> Hash {
        self.header(nonce, time).hash_with(&self.tx_hashes)
    }

    /// Build the block for a given nonce and timestamp.
    pub fn with_nonce(&self, nonce: u64, time: u64) -> Block {
        Block {
            header: self.header(nonce, time),
            txs: self.txs.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tx;

    fn tx(nonce: u64) -> SignedTx {
        SignedTx::new(
            Tx {
                from: Account::new([1; 20]),
                to: Account::new([2; 20]),
                value: 5,
                nonce,
                data: String::new(),
                time: 42,
            },
            "",
        )
    }

    #[test]
    fn candidate_order_is_independent_of_input_order() {
        let a = CandidateBlock::new(Hash::ZERO, 0, Account::ZERO, vec![tx(1), tx(2), tx(3)]);
        let b = CandidateBlock::new(Hash::ZERO, 0, Account::ZERO, vec![tx(3), tx(1), tx(2)]);
        assert_eq!(a.txs(), b.txs());
        assert_eq!(a.with_nonce(7, 100).hash(), b.with_nonce(7, 100).hash());

        let hashes: Vec<Hash> = a.txs().iter().map(SignedTx::hash).collect();
        let mut sorted = hashes.clone();
        sorted.sort();
        assert_eq!(hashes, sorted);
    }

    #[test]
    fn nonce_changes_hash() {
        let c = CandidateBlock::new(Hash::ZERO, 3, Account::ZERO, vec![tx(1)]);
        assert_ne!(c.with_nonce(1, 100).hash(), c.with_nonce(2, 100).hash());
        assert_eq!(c.with_nonce(1, 100).number(), 3);
        assert_eq!(c.hash_for(1, 100), c.with_nonce(1, 100).hash());
    }
}
