use proptest::prelude::*;

use tally_types::{Account, CandidateBlock, Hash, SignedTx, Tx};

fn arb_tx() -> impl Strategy<Value = SignedTx> {
    (any::<[u8; 20]>(), any::<[u8; 20]>(), any::<u64>(), 0u64..1000, "[a-z]{0,8}").prop_map(
        |(from, to, value, nonce, data)| {
            SignedTx::new(
                Tx {
                    from: Account::new(from),
                    to: Account::new(to),
                    value,
                    nonce,
                    data,
                    time: 1_700_000_000,
                },
                "",
            )
        },
    )
}

proptest! {
    /// Leading-zero-bit count never exceeds the width and is 256 only for ZERO.
    #[test]
    fn leading_zero_bits_bounded(bytes in prop::array::uniform32(0u8..)) {
        let hash = Hash::new(bytes);
        let bits = hash.leading_zero_bits();
        prop_assert!(bits <= 256);
        prop_assert_eq!(bits == 256, hash.is_zero());
    }

    /// Any permutation of the same transactions yields the same candidate block.
    #[test]
    fn candidate_contents_are_canonical(
        txs in prop::collection::vec(arb_tx(), 0..12),
        seed in any::<u64>(),
    ) {
        let mut shuffled = txs.clone();
        // Deterministic rotation + reversal stands in for an arbitrary permutation.
        if !shuffled.is_empty() {
            let k = (seed as usize) % shuffled.len();
            shuffled.rotate_left(k);
            if seed % 2 == 0 {
                shuffled.reverse();
            }
        }
        let a = CandidateBlock::new(Hash::ZERO, 1, Account::ZERO, txs);
        let b = CandidateBlock::new(Hash::ZERO, 1, Account::ZERO, shuffled);
        prop_assert_eq!(a.with_nonce(9, 9).hash(), b.with_nonce(9, 9).hash());
    }

    /// Account addresses survive their textual form.
    #[test]
    fn account_display_parses(bytes in any::<[u8; 20]>()) {
        let account = Account::new(bytes);
        let parsed: Account = account.to_string().parse().unwrap();
        prop_assert_eq!(parsed, account);
    }
}
