//! Domain model
//!
//! Immutable records as callers think about them: amounts are arbitrary
//! precision so out-of-range input is reported instead of wrapping, and
//! scripts and registers stay hex text. Fixed-width shapes live in
//! [`crate::wire`]; JSON shapes in [`crate::proxy`].

use std::collections::BTreeMap;

use assembler_core::{Address, BlockHeight, BoxId, HexString, TokenId, TxId};
use num_bigint::BigInt;

/// Amount of one token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAmount {
    pub token_id: TokenId,
    pub amount: BigInt,
}

impl TokenAmount {
    pub fn new(token_id: TokenId, amount: impl Into<BigInt>) -> Self {
        Self {
            token_id,
            amount: amount.into(),
        }
    }
}

/// Unconfirmed output description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErgoBoxCandidate {
    pub value: BigInt,
    pub ergo_tree: HexString,
    pub creation_height: BlockHeight,
    pub assets: Vec<TokenAmount>,
    /// Register name ("R4".."R9") to hex-encoded constant
    pub additional_registers: BTreeMap<String, HexString>,
}

impl ErgoBoxCandidate {
    /// A plain value transfer with no tokens or registers.
    pub fn simple(value: impl Into<BigInt>, ergo_tree: impl Into<HexString>, height: u32) -> Self {
        Self {
            value: value.into(),
            ergo_tree: ergo_tree.into(),
            creation_height: height,
            assets: vec![],
            additional_registers: BTreeMap::new(),
        }
    }
}

/// A box created by `transaction_id` at output position `index`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErgoBox {
    pub box_id: BoxId,
    pub value: BigInt,
    pub ergo_tree: HexString,
    pub creation_height: BlockHeight,
    pub assets: Vec<TokenAmount>,
    pub additional_registers: BTreeMap<String, HexString>,
    pub transaction_id: TxId,
    pub index: u16,
}

impl ErgoBox {
    /// The candidate fields of this box.
    pub fn candidate(&self) -> ErgoBoxCandidate {
        ErgoBoxCandidate {
            value: self.value.clone(),
            ergo_tree: self.ergo_tree.clone(),
            creation_height: self.creation_height,
            assets: self.assets.clone(),
            additional_registers: self.additional_registers.clone(),
        }
    }
}

/// Value and tokens of a box, without a script (the change descriptor)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxAssets {
    pub value: BigInt,
    pub tokens: Vec<TokenAmount>,
}

/// Inputs chosen for spending plus the change to return
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxSelection {
    /// Ordered inputs; the first is the primary input
    pub inputs: Vec<ErgoBox>,
    pub change: Option<BoxAssets>,
}

impl BoxSelection {
    pub fn new(inputs: Vec<ErgoBox>, change: Option<BoxAssets>) -> Self {
        Self { inputs, change }
    }

    pub fn primary(&self) -> Option<&ErgoBox> {
        self.inputs.first()
    }
}

/// Everything needed to assemble one transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub inputs: BoxSelection,
    /// Boxes read by scripts but not spent
    pub data_inputs: Vec<ErgoBox>,
    pub outputs: Vec<ErgoBoxCandidate>,
    /// Miner fee in nanoERG; absent means zero
    pub fee_nergs: Option<BigInt>,
    pub change_address: Address,
}

/// Chain facts the assembler needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkContext {
    pub height: BlockHeight,
}

/// Spent box reference
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Input {
    pub box_id: BoxId,
}

/// Read-only box reference
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataInput {
    pub box_id: BoxId,
}

/// Transaction as a flat record: ids, references and output boxes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErgoTx {
    pub id: TxId,
    pub inputs: Vec<Input>,
    pub data_inputs: Vec<DataInput>,
    pub outputs: Vec<ErgoBox>,
    /// Byte length of the canonical serialization
    pub size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_of_box() {
        let b = ErgoBox {
            box_id: BoxId::from_digest([1; 32]),
            value: BigInt::from(5_000_000),
            ergo_tree: "0008cd".into(),
            creation_height: 7,
            assets: vec![TokenAmount::new(TokenId::from_digest([2; 32]), 3)],
            additional_registers: BTreeMap::from([("R4".to_string(), "0402".to_string())]),
            transaction_id: TxId::from_digest([3; 32]),
            index: 2,
        };
        let c = b.candidate();
        assert_eq!(c.value, b.value);
        assert_eq!(c.assets, b.assets);
        assert_eq!(c.additional_registers, b.additional_registers);
    }

    #[test]
    fn test_primary_input() {
        let selection = BoxSelection::new(vec![], None);
        assert!(selection.primary().is_none());
    }
}
