//! Account address type with `0x` prefix.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// A 20-byte account address, rendered as `0x` followed by 40 lowercase hex digits.
///
/// The node only ever consumes already-resolved addresses: the account it
/// credits with mining rewards, and the senders and recipients of transactions.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Account([u8; 20]);

impl Account {
    /// The standard prefix for all account addresses.
    pub const PREFIX: &'static str = "0x";

    /// The all-zero address, used when no miner account is configured.
    pub const ZERO: Self = Self([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Account({self})")
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, hex::encode(self.0))
    }
}

impl FromStr for Account {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| TypesError::InvalidAccount(s.to_string()))?;
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| TypesError::InvalidAccount(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Account {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Account {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefixed_hex() {
        let account: Account = "0x09ee50f2f37fcba1845de6fe5c762e83e65e755c".parse().unwrap();
        assert_eq!(account.as_bytes()[0], 0x09);
        assert_eq!(
            account.to_string(),
            "0x09ee50f2f37fcba1845de6fe5c762e83e65e755c"
        );
    }

    #[test]
    fn rejects_missing_prefix_and_bad_length() {
        assert!("09ee50f2f37fcba1845de6fe5c762e83e65e755c".parse::<Account>().is_err());
        assert!("0x09ee".parse::<Account>().is_err());
    }

    #[test]
    fn usable_as_json_map_key() {
        let mut balances = std::collections::BTreeMap::new();
        balances.insert(Account::new([1; 20]), 10u64);
        let json = serde_json::to_string(&balances).unwrap();
        let back: std::collections::BTreeMap<Account, u64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, balances);
    }
}
