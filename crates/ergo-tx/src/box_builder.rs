//! Box candidate construction and box identifiers
//!
//! Turns domain records into validated wire shapes. Output candidates have
//! their register constants decoded and re-encoded so only the three modelled
//! constant kinds reach the chain; boxes being spent keep their registers as
//! given, since their ids were computed over those exact bytes.

use std::collections::BTreeMap;

use assembler_core::{BoxId, TxId};
use num_bigint::BigInt;

use crate::constant::deserialize_constant;
use crate::entities::{ErgoBox, ErgoBoxCandidate, TokenAmount};
use crate::error::TxBuildError;
use crate::primitives::{ChainPrimitives, PrimitiveError};
use crate::tokens::TokenLedger;
use crate::wire::{BoxValue, Contract, RegisterId, Registers, WireBox, WireBoxCandidate};

fn box_value(value: &BigInt, context: impl Into<String>) -> Result<BoxValue, TxBuildError> {
    BoxValue::from_bigint(value).ok_or_else(|| TxBuildError::InvalidValue {
        context: context.into(),
        value: value.to_string(),
    })
}

fn contract<P: ChainPrimitives + ?Sized>(
    primitives: &P,
    ergo_tree_hex: &str,
) -> Result<Contract, TxBuildError> {
    let bytes = hex::decode(ergo_tree_hex)
        .map_err(|e| TxBuildError::InvalidScript(format!("ErgoTree is not hex: {}", e)))?;
    primitives
        .script_contract(&bytes)
        .map_err(|e| TxBuildError::InvalidScript(e.to_string()))
}

fn register_id(name: &str) -> Result<RegisterId, TxBuildError> {
    RegisterId::parse(name).ok_or_else(|| TxBuildError::InvalidRegister {
        register: name.to_string(),
        reason: "expected one of R4..R9".to_string(),
    })
}

fn tokens(assets: &[TokenAmount]) -> Result<TokenLedger, TxBuildError> {
    let ledger = TokenLedger::from_amounts(assets)?;
    ledger.check_box_limit()?;
    Ok(ledger)
}

/// Build a wire candidate from a domain candidate.
pub fn build_candidate<P: ChainPrimitives + ?Sized>(
    primitives: &P,
    candidate: &ErgoBoxCandidate,
) -> Result<WireBoxCandidate, TxBuildError> {
    let value = box_value(&candidate.value, "output value")?;
    let contract = contract(primitives, &candidate.ergo_tree)?;
    let tokens = tokens(&candidate.assets)?;

    let mut registers = BTreeMap::new();
    for (name, constant_hex) in &candidate.additional_registers {
        let id = register_id(name)?;
        let constant = deserialize_constant(primitives, constant_hex).map_err(|e| {
            TxBuildError::InvalidRegister {
                register: name.clone(),
                reason: e.to_string(),
            }
        })?;
        registers.insert(id, primitives.encode_constant(&constant)?);
    }

    Ok(WireBoxCandidate {
        value,
        contract,
        creation_height: candidate.creation_height,
        tokens: tokens.into_tokens(),
        registers: Registers::new(registers)?,
    })
}

/// Identifier of `candidate` placed at `index` of transaction `tx_id`.
pub fn compute_box_id<P: ChainPrimitives + ?Sized>(
    primitives: &P,
    candidate: &ErgoBoxCandidate,
    tx_id: &TxId,
    index: u16,
) -> Result<BoxId, TxBuildError> {
    let wire = WireBox {
        candidate: build_candidate(primitives, candidate)?,
        transaction_id: digest_of(tx_id.as_str(), "transaction")?,
        index,
    };
    Ok(primitives.box_id(&wire)?)
}

fn digest_of(id: &str, kind: &'static str) -> Result<[u8; 32], TxBuildError> {
    hex::decode(id)
        .ok()
        .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
        .ok_or_else(|| TxBuildError::InvalidId {
            kind,
            value: id.to_string(),
        })
}

/// Wire form of an existing box, after checking its claimed id.
///
/// Registers are taken byte for byte.
pub fn box_to_wire<P: ChainPrimitives + ?Sized>(
    primitives: &P,
    ergo_box: &ErgoBox,
) -> Result<WireBox, TxBuildError> {
    let claimed = digest_of(ergo_box.box_id.as_str(), "box")?;

    let mut registers = BTreeMap::new();
    for (name, constant_hex) in &ergo_box.additional_registers {
        let bytes = hex::decode(constant_hex).map_err(|e| TxBuildError::InvalidRegister {
            register: name.clone(),
            reason: format!("not hex: {}", e),
        })?;
        registers.insert(register_id(name)?, bytes);
    }

    let wire = WireBox {
        candidate: WireBoxCandidate {
            value: box_value(&ergo_box.value, format!("box {}", ergo_box.box_id))?,
            contract: contract(primitives, &ergo_box.ergo_tree)?,
            creation_height: ergo_box.creation_height,
            tokens: tokens(&ergo_box.assets)?.into_tokens(),
            registers: Registers::new(registers)?,
        },
        transaction_id: digest_of(ergo_box.transaction_id.as_str(), "transaction")?,
        index: ergo_box.index,
    };

    let derived = primitives.box_id(&wire)?;
    if derived.to_digest() != Some(claimed) {
        return Err(TxBuildError::BoxIdMismatch {
            claimed: ergo_box.box_id.to_string(),
            derived: derived.to_string(),
        });
    }
    Ok(wire)
}

/// Domain box for a wire box whose id is already known.
pub fn wire_to_box(wire: &WireBox, box_id: BoxId) -> ErgoBox {
    let candidate = &wire.candidate;
    ErgoBox {
        box_id,
        value: BigInt::from(candidate.value.as_u64()),
        ergo_tree: hex::encode(candidate.contract.ergo_tree()),
        creation_height: candidate.creation_height,
        assets: candidate
            .tokens
            .iter()
            .map(|t| TokenAmount::new(t.token_id.clone(), t.amount))
            .collect(),
        additional_registers: candidate.registers.to_hex_map(),
        transaction_id: TxId::from_digest(wire.transaction_id),
        index: wire.index,
    }
}

/// Smallest value `candidate` may hold as output `index`, at `per_byte`
/// nanoERG per serialized byte.
pub fn min_box_value(
    candidate: &WireBoxCandidate,
    index: u16,
    per_byte: u64,
) -> Result<u64, PrimitiveError> {
    Ok((candidate.box_size(index)? as u64).saturating_mul(per_byte))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::NativePrimitives;
    use assembler_core::TokenId;

    fn p2pk_hex(key_byte: u8) -> String {
        format!("0008cd02{}", hex::encode([key_byte; 32]))
    }

    fn candidate() -> ErgoBoxCandidate {
        let mut c = ErgoBoxCandidate::simple(1_000_000, p2pk_hex(0x11), 900_000);
        c.assets = vec![TokenAmount::new(TokenId::from_digest([0xaa; 32]), 10)];
        c.additional_registers = BTreeMap::from([
            ("R4".to_string(), "04c801".to_string()),
            ("R5".to_string(), "0e020102".to_string()),
        ]);
        c
    }

    #[test]
    fn test_build_candidate_fields() {
        let wire = build_candidate(&NativePrimitives, &candidate()).unwrap();
        assert_eq!(wire.value.as_u64(), 1_000_000);
        assert_eq!(wire.creation_height, 900_000);
        assert_eq!(wire.tokens.len(), 1);
        assert_eq!(wire.registers.get(RegisterId::R4), Some(&[0x04, 0xc8, 0x01][..]));
        assert_eq!(wire.registers.get(RegisterId::R5), Some(&[0x0e, 0x02, 0x01, 0x02][..]));
    }

    #[test]
    fn test_build_candidate_rejects_value() {
        for value in [BigInt::from(0), BigInt::from(-5), BigInt::from(i64::MAX) + 1] {
            let mut c = candidate();
            c.value = value;
            assert!(matches!(
                build_candidate(&NativePrimitives, &c),
                Err(TxBuildError::InvalidValue { .. })
            ));
        }
    }

    #[test]
    fn test_build_candidate_rejects_script() {
        let mut c = candidate();
        c.ergo_tree = "not hex".into();
        assert!(matches!(
            build_candidate(&NativePrimitives, &c),
            Err(TxBuildError::InvalidScript(_))
        ));
        c.ergo_tree = "ff".into();
        assert!(matches!(
            build_candidate(&NativePrimitives, &c),
            Err(TxBuildError::InvalidScript(_))
        ));
    }

    #[test]
    fn test_build_candidate_rejects_registers() {
        let mut c = candidate();
        c.additional_registers.insert("R3".into(), "0400".into());
        assert!(matches!(
            build_candidate(&NativePrimitives, &c),
            Err(TxBuildError::InvalidRegister { register, .. }) if register == "R3"
        ));

        let mut c = candidate();
        c.additional_registers.insert("R6".into(), "0101".into());
        assert!(matches!(
            build_candidate(&NativePrimitives, &c),
            Err(TxBuildError::InvalidRegister { register, .. }) if register == "R6"
        ));

        let mut c = candidate();
        c.additional_registers.insert("R7".into(), "0400".into());
        assert!(matches!(
            build_candidate(&NativePrimitives, &c),
            Err(TxBuildError::InvalidRegister { .. })
        ));
    }

    #[test]
    fn test_compute_box_id_is_deterministic() {
        let tx_id = TxId::from_digest([0x33; 32]);
        let a = compute_box_id(&NativePrimitives, &candidate(), &tx_id, 0).unwrap();
        let b = compute_box_id(&NativePrimitives, &candidate(), &tx_id, 0).unwrap();
        assert_eq!(a, b);
        let c = compute_box_id(&NativePrimitives, &candidate(), &tx_id, 1).unwrap();
        assert_ne!(a, c);
        let other_tx = TxId::from_digest([0x34; 32]);
        let d = compute_box_id(&NativePrimitives, &candidate(), &other_tx, 0).unwrap();
        assert_ne!(a, d);
    }

    #[test]
    fn test_compute_box_id_covers_registers() {
        let tx_id = TxId::from_digest([0x33; 32]);
        let a = compute_box_id(&NativePrimitives, &candidate(), &tx_id, 0).unwrap();
        let mut changed = candidate();
        changed.additional_registers.insert("R4".into(), "04ca01".into());
        let b = compute_box_id(&NativePrimitives, &changed, &tx_id, 0).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_compute_box_id_rejects_bad_tx_id() {
        let err = compute_box_id(&NativePrimitives, &candidate(), &TxId::new("00"), 0)
            .unwrap_err();
        assert!(matches!(err, TxBuildError::InvalidId { kind: "transaction", .. }));
    }

    fn existing_box() -> ErgoBox {
        let tx_id = TxId::from_digest([0x77; 32]);
        let c = candidate();
        let box_id = compute_box_id(&NativePrimitives, &c, &tx_id, 3).unwrap();
        ErgoBox {
            box_id,
            value: c.value,
            ergo_tree: c.ergo_tree,
            creation_height: c.creation_height,
            assets: c.assets,
            additional_registers: c.additional_registers,
            transaction_id: tx_id,
            index: 3,
        }
    }

    #[test]
    fn test_box_to_wire_round_trip() {
        let b = existing_box();
        let wire = box_to_wire(&NativePrimitives, &b).unwrap();
        assert_eq!(wire_to_box(&wire, b.box_id.clone()), b);
    }

    #[test]
    fn test_box_to_wire_detects_mismatch() {
        let mut b = existing_box();
        b.value = BigInt::from(2_000_000);
        assert!(matches!(
            box_to_wire(&NativePrimitives, &b),
            Err(TxBuildError::BoxIdMismatch { .. })
        ));

        let mut b = existing_box();
        b.box_id = BoxId::new("1234");
        assert!(matches!(
            box_to_wire(&NativePrimitives, &b),
            Err(TxBuildError::InvalidId { kind: "box", .. })
        ));
    }

    #[test]
    fn test_box_to_wire_keeps_unmodelled_registers() {
        // SBoolean in R4 would be rejected on an output candidate
        let mut b = existing_box();
        b.additional_registers = BTreeMap::from([("R4".to_string(), "0101".to_string())]);
        let derived = match box_to_wire(&NativePrimitives, &b) {
            Err(TxBuildError::BoxIdMismatch { derived, .. }) => derived,
            other => panic!("expected id mismatch, got {:?}", other),
        };
        b.box_id = BoxId::new(derived);
        let wire = box_to_wire(&NativePrimitives, &b).unwrap();
        assert_eq!(wire.candidate.registers.get(RegisterId::R4), Some(&[0x01, 0x01][..]));
    }

    #[test]
    fn test_min_box_value_scales_with_size() {
        let wire = build_candidate(&NativePrimitives, &candidate()).unwrap();
        let size = wire.box_size(0).unwrap() as u64;
        assert_eq!(min_box_value(&wire, 0, 360).unwrap(), size * 360);
        assert_eq!(min_box_value(&wire, 0, 0).unwrap(), 0);
        // two-byte VLQ index from 128 on
        assert_eq!(min_box_value(&wire, 127, 360).unwrap(), size * 360);
        assert_eq!(min_box_value(&wire, 128, 360).unwrap(), (size + 1) * 360);
    }
}
