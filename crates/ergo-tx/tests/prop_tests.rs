use proptest::prelude::*;

use assembler_core::{TokenId, TxId};
use ergo_tx::{
    compute_box_id, deserialize_constant, serialize_constant, Constant, ErgoBoxCandidate,
    NativePrimitives, TokenAmount, TokenLedger,
};

fn p2pk_tree(key: [u8; 32]) -> String {
    format!("0008cd02{}", hex::encode(key))
}

proptest! {
    /// Every Int survives encode -> decode with its kind.
    #[test]
    fn int_constant_roundtrip(v in any::<i32>()) {
        let hex = serialize_constant(&NativePrimitives, &Constant::Int(v)).unwrap();
        prop_assert_eq!(deserialize_constant(&NativePrimitives, &hex).unwrap(), Constant::Int(v));
    }

    /// Every Long survives encode -> decode with its kind.
    #[test]
    fn long_constant_roundtrip(v in any::<i64>()) {
        let hex = serialize_constant(&NativePrimitives, &Constant::Long(v)).unwrap();
        prop_assert_eq!(deserialize_constant(&NativePrimitives, &hex).unwrap(), Constant::Long(v));
    }

    /// Every byte sequence survives encode -> decode.
    #[test]
    fn bytes_constant_roundtrip(v in prop::collection::vec(any::<u8>(), 0..512)) {
        let c = Constant::Bytes(v);
        let hex = serialize_constant(&NativePrimitives, &c).unwrap();
        prop_assert_eq!(deserialize_constant(&NativePrimitives, &hex).unwrap(), c);
    }

    /// An Int and a Long of the same value never share an encoding.
    #[test]
    fn int_and_long_encodings_differ(v in any::<i32>()) {
        let int_hex = serialize_constant(&NativePrimitives, &Constant::Int(v)).unwrap();
        let long_hex = serialize_constant(&NativePrimitives, &Constant::Long(v as i64)).unwrap();
        prop_assert_ne!(int_hex, long_hex);
    }

    /// Arbitrary hex never panics the decoder.
    #[test]
    fn decode_arbitrary_bytes(v in prop::collection::vec(any::<u8>(), 0..64)) {
        let _ = deserialize_constant(&NativePrimitives, &hex::encode(v));
    }

    /// Box ids are deterministic and depend on the output index.
    #[test]
    fn box_id_depends_on_index(
        key in prop::array::uniform32(0u8..),
        tx in prop::array::uniform32(0u8..),
        value in 1u64..=i64::MAX as u64,
        index in 0u16..u16::MAX,
    ) {
        let candidate = ErgoBoxCandidate::simple(value, p2pk_tree(key), 1_000);
        let tx_id = TxId::from_digest(tx);
        let a = compute_box_id(&NativePrimitives, &candidate, &tx_id, index).unwrap();
        let b = compute_box_id(&NativePrimitives, &candidate, &tx_id, index).unwrap();
        let c = compute_box_id(&NativePrimitives, &candidate, &tx_id, index + 1).unwrap();
        prop_assert_eq!(&a, &b);
        prop_assert_ne!(a, c);
    }

    /// The ledger keeps every entry in order; merging preserves totals.
    #[test]
    fn ledger_preserves_and_merges(entries in prop::collection::vec((0u8..4, 1i64..1_000_000), 0..20)) {
        let amounts: Vec<_> = entries
            .iter()
            .map(|(id, amount)| TokenAmount::new(TokenId::from_digest([*id; 32]), *amount))
            .collect();
        let ledger = TokenLedger::from_amounts(&amounts).unwrap();
        prop_assert_eq!(ledger.len(), entries.len());
        for (token, (id, amount)) in ledger.iter().zip(&entries) {
            prop_assert_eq!(token.digest, [*id; 32]);
            prop_assert_eq!(token.amount, *amount as u64);
        }

        let merged = ledger.merged().unwrap();
        let total: u64 = entries.iter().map(|(_, a)| *a as u64).sum();
        prop_assert_eq!(merged.iter().map(|t| t.amount).sum::<u64>(), total);
        let merged_ids: Vec<u8> = merged.iter().map(|t| t.digest[0]).collect();
        let mut seen = Vec::new();
        for (id, _) in &entries {
            if !seen.contains(id) {
                seen.push(*id);
            }
        }
        prop_assert_eq!(merged_ids, seen);
    }
}
