//! Transactions.

use serde::{Deserialize, Serialize};

use crate::{Account, Hash};

/// An unsigned transfer of `value` from one account to another.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tx {
    pub from: Account,
    pub to: Account,
    pub value: u64,
    pub nonce: u64,
    #[serde(default)]
    pub data: String,
    pub time: u64,
}

impl Tx {
    pub fn new(from: Account, to: Account, value: u64, nonce: u64, data: impl Into<String>) -> Self {
        Self {
            from,
            to,
            value,
            nonce,
            data: data.into(),
            time: crate::unix_now_secs(),
        }
    }

    fn write_canonical(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.from.as_bytes());
        out.extend_from_slice(self.to.as_bytes());
        out.extend_from_slice(&self.value.to_le_bytes());
        out.extend_from_slice(&self.nonce.to_le_bytes());
        out.extend_from_slice(&self.time.to_le_bytes());
        out.extend_from_slice(&(self.data.len() as u64).to_le_bytes());
        out.extend_from_slice(self.data.as_bytes());
    }
}

/// A transaction together with its signature.
///
/// The signature is carried opaquely as hex; signing and verification belong
/// to the wallet layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTx {
    #[serde(flatten)]
    pub tx: Tx,
    #[serde(default)]
    pub sig: String,
}

impl SignedTx {
    pub fn new(tx: Tx, sig: impl Into<String>) -> Self {
        Self {
            tx,
            sig: sig.into(),
        }
    }

    /// The transaction's identity: Blake2b over a fixed field-by-field encoding.
    pub fn hash(&self) -> Hash {
        let mut buf = Vec::with_capacity(128 + self.tx.data.len() + self.sig.len());
        self.tx.write_canonical(&mut buf);
        buf.extend_from_slice(&(self.sig.len() as u64).to_le_bytes());
        buf.extend_from_slice(self.sig.as_bytes());
        Hash::digest(&buf)
    }
}
