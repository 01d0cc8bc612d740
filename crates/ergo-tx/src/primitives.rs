//! Cryptographic and serialization primitive service
//!
//! The assembler never hashes or serializes chain objects itself; it asks a
//! [`ChainPrimitives`] implementation. [`NativePrimitives`] does the work in
//! process over the canonical byte layout from [`crate::wire`]. With the
//! `ergo-lib` feature, [`crate::sigma_rust::SigmaRustPrimitives`] answers the
//! same calls through sigma-rust.

use assembler_core::{BoxId, TxId};
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use thiserror::Error;

use crate::constant::{self, Constant, ParsedConstant};
use crate::reduce::{self, ReducedTransaction, StateContext};
use crate::wire::{Contract, WireBox, WireTransaction};

type Blake2b256 = Blake2b<U32>;

#[derive(Debug, Error)]
pub enum PrimitiveError {
    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Reduction error: {0}")]
    Reduction(String),
}

/// Chain-level encodings, derived ids and reduction.
///
/// Implementations must be deterministic and free of side effects.
pub trait ChainPrimitives: Send + Sync {
    /// Sigma-serialize a register constant.
    fn encode_constant(&self, constant: &Constant) -> Result<Vec<u8>, PrimitiveError>;

    /// Parse a sigma-serialized constant, consuming every byte.
    fn parse_constant(&self, bytes: &[u8]) -> Result<ParsedConstant, PrimitiveError>;

    /// Build the pay-to-address contract for serialized ErgoTree bytes.
    fn script_contract(&self, ergo_tree: &[u8]) -> Result<Contract, PrimitiveError>;

    fn box_id(&self, ergo_box: &WireBox) -> Result<BoxId, PrimitiveError>;

    /// Bytes a prover signs: the transaction with empty proofs.
    fn serialize_transaction(&self, tx: &WireTransaction) -> Result<Vec<u8>, PrimitiveError>;

    fn transaction_id(&self, tx: &WireTransaction) -> Result<TxId, PrimitiveError>;

    /// Reduce every input's script to a sigma proposition under `context`.
    ///
    /// `inputs` and `data_inputs` are the boxes referenced by `tx`, in order.
    fn reduce_transaction(
        &self,
        tx: &WireTransaction,
        inputs: &[WireBox],
        data_inputs: &[WireBox],
        context: &StateContext,
    ) -> Result<ReducedTransaction, PrimitiveError>;
}

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// In-process primitive service over the canonical Ergo byte layout
#[derive(Debug, Clone, Copy, Default)]
pub struct NativePrimitives;

impl ChainPrimitives for NativePrimitives {
    fn encode_constant(&self, constant: &Constant) -> Result<Vec<u8>, PrimitiveError> {
        Ok(constant::encode_native(constant))
    }

    fn parse_constant(&self, bytes: &[u8]) -> Result<ParsedConstant, PrimitiveError> {
        constant::parse_native(bytes).map_err(|e| PrimitiveError::Encoding(e.to_string()))
    }

    fn script_contract(&self, ergo_tree: &[u8]) -> Result<Contract, PrimitiveError> {
        Contract::parse_native(ergo_tree)
    }

    fn box_id(&self, ergo_box: &WireBox) -> Result<BoxId, PrimitiveError> {
        Ok(BoxId::from_digest(blake2b_256(&ergo_box.to_bytes()?)))
    }

    fn serialize_transaction(&self, tx: &WireTransaction) -> Result<Vec<u8>, PrimitiveError> {
        tx.bytes_to_sign()
    }

    fn transaction_id(&self, tx: &WireTransaction) -> Result<TxId, PrimitiveError> {
        Ok(TxId::from_digest(blake2b_256(&tx.bytes_to_sign()?)))
    }

    fn reduce_transaction(
        &self,
        tx: &WireTransaction,
        inputs: &[WireBox],
        _data_inputs: &[WireBox],
        _context: &StateContext,
    ) -> Result<ReducedTransaction, PrimitiveError> {
        let bytes_to_sign = tx.bytes_to_sign()?;
        let tx_id = TxId::from_digest(blake2b_256(&bytes_to_sign));
        reduce::reduce_by_contract(tx_id, bytes_to_sign, inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{BoxValue, Registers, WireBoxCandidate, P2PK_PREFIX};

    fn wire_box(index: u16) -> WireBox {
        let mut tree = P2PK_PREFIX.to_vec();
        tree.push(0x03);
        tree.extend_from_slice(&[0x44; 32]);
        WireBox {
            candidate: WireBoxCandidate {
                value: BoxValue::new(1_000_000).unwrap(),
                contract: NativePrimitives.script_contract(&tree).unwrap(),
                creation_height: 500_000,
                tokens: vec![],
                registers: Registers::empty(),
            },
            transaction_id: [0x55; 32],
            index,
        }
    }

    #[test]
    fn blake2b_known_vector() {
        // Blake2b-256 of the empty string
        assert_eq!(
            hex::encode(blake2b_256(b"")),
            "0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8"
        );
    }

    #[test]
    fn box_id_hashes_full_box_bytes() {
        let b = wire_box(0);
        let id = NativePrimitives.box_id(&b).unwrap();
        assert_eq!(id.to_digest(), Some(blake2b_256(&b.to_bytes().unwrap())));
        assert_ne!(id, NativePrimitives.box_id(&wire_box(1)).unwrap());
    }

    #[test]
    fn transaction_id_hashes_bytes_to_sign() {
        let tx = WireTransaction {
            inputs: vec![[0x01; 32]],
            data_inputs: vec![],
            outputs: vec![wire_box(0).candidate],
        };
        let bytes = NativePrimitives.serialize_transaction(&tx).unwrap();
        let id = NativePrimitives.transaction_id(&tx).unwrap();
        assert_eq!(id, TxId::from_digest(blake2b_256(&bytes)));
    }

    #[test]
    fn parse_constant_maps_errors() {
        let err = NativePrimitives.parse_constant(&[0x04]).unwrap_err();
        assert!(matches!(err, PrimitiveError::Encoding(_)));
    }
}
