//! Network difficulty, expressed as required leading zero bits.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum number of leading zero bits a sealed block hash must carry.
///
/// Each extra bit doubles the expected number of hash attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Difficulty(u32);

impl Difficulty {
    /// Roughly a million attempts per block.
    pub const DEFAULT: Self = Self(20);

    /// Every hash has at most 256 leading zero bits.
    pub const MAX_BITS: u32 = 256;

    pub fn new(bits: u32) -> Self {
        Self(bits.min(Self::MAX_BITS))
    }

    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bits", self.0)
    }
}
