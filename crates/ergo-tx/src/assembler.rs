//! Transaction assembly
//!
//! [`TxAssembler`] turns a [`TxRequest`] into an unsigned transaction:
//!
//! 1. Inputs: primary first, then the rest; every claimed box id is re-derived
//! 2. Outputs: requested outputs in order, then change (if any)
//! 3. Fee: a separate miner-fee box after all outputs
//! 4. Policy: minimum box value, ERG and token balance
//! 5. Ids: transaction id from the bytes to sign, then every output's box id
//!
//! Optionally the unsigned transaction is reduced against block headers.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use assembler_core::{AssemblerConfig, BlockHeight, TokenId, TxId};
use indexmap::IndexMap;
use num_bigint::BigInt;

use crate::address::AddressCodec;
use crate::box_builder::{box_to_wire, build_candidate, min_box_value, wire_to_box};
use crate::entities::{
    DataInput, ErgoBox, ErgoBoxCandidate, ErgoTx, Input, NetworkContext, TxRequest,
};
use crate::error::TxBuildError;
use crate::primitives::{ChainPrimitives, PrimitiveError};
use crate::reduce::{BlockHeader, ReducedTransaction, StateContext};
use crate::wire::{BoxValue, Registers, WireBox, WireBoxCandidate, WireTransaction};

/// Assembled transaction, ready for reduction or signing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub id: TxId,
    pub inputs: Vec<Input>,
    pub data_inputs: Vec<DataInput>,
    /// Requested outputs followed by change
    pub outputs: Vec<ErgoBox>,
    /// Miner fee box, serialized after `outputs`
    pub fee_output: Option<ErgoBox>,
    /// Byte length of the bytes to sign
    pub size: usize,
    pub wire: WireTransaction,
    /// Wire forms of the spent boxes, in input order
    pub spent_boxes: Vec<WireBox>,
    pub data_boxes: Vec<WireBox>,
}

impl UnsignedTransaction {
    /// Flat transaction record. Its outputs include the fee box.
    pub fn to_ergo_tx(&self) -> ErgoTx {
        ErgoTx {
            id: self.id.clone(),
            inputs: self.inputs.clone(),
            data_inputs: self.data_inputs.clone(),
            outputs: self
                .outputs
                .iter()
                .chain(self.fee_output.iter())
                .cloned()
                .collect(),
            size: self.size,
        }
    }

    pub fn bytes_to_sign(&self) -> Result<Vec<u8>, PrimitiveError> {
        self.wire.bytes_to_sign()
    }
}

/// Builds transactions with injected primitive and address services.
#[derive(Clone)]
pub struct TxAssembler {
    primitives: Arc<dyn ChainPrimitives>,
    addresses: Arc<dyn AddressCodec>,
    config: AssemblerConfig,
}

impl TxAssembler {
    pub fn new(
        primitives: Arc<dyn ChainPrimitives>,
        addresses: Arc<dyn AddressCodec>,
        config: AssemblerConfig,
    ) -> Self {
        Self {
            primitives,
            addresses,
            config,
        }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    pub fn build_unsigned_transaction(
        &self,
        request: &TxRequest,
        network: &NetworkContext,
    ) -> Result<UnsignedTransaction, TxBuildError> {
        let p = self.primitives.as_ref();
        let selection = &request.inputs;
        let primary = selection.primary().ok_or(TxBuildError::EmptyInputs)?;

        let spent_boxes = selection
            .inputs
            .iter()
            .map(|b| box_to_wire(p, b))
            .collect::<Result<Vec<_>, _>>()?;
        let data_boxes = request
            .data_inputs
            .iter()
            .map(|b| box_to_wire(p, b))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(
            "Verified {} inputs and {} data inputs (primary {})",
            spent_boxes.len(),
            data_boxes.len(),
            primary.box_id
        );

        let mut outputs = request
            .outputs
            .iter()
            .map(|c| build_candidate(p, c))
            .collect::<Result<Vec<_>, _>>()?;

        let change_index = match &selection.change {
            Some(change) => {
                let tree = self.addresses.ergo_tree(&request.change_address)?;
                let candidate = ErgoBoxCandidate {
                    value: change.value.clone(),
                    ergo_tree: hex::encode(tree),
                    creation_height: network.height,
                    assets: change.tokens.clone(),
                    additional_registers: Default::default(),
                };
                outputs.push(build_candidate(p, &candidate)?);
                tracing::debug!(
                    "Change output of {} nanoERG with {} tokens to {}",
                    change.value,
                    change.tokens.len(),
                    request.change_address
                );
                Some(outputs.len() - 1)
            }
            None => None,
        };

        let fee = parse_fee(request.fee_nergs.as_ref())?;
        let fee_box = match BoxValue::new(fee) {
            Some(value) => Some(self.fee_candidate(value, network.height)?),
            None => None,
        };

        let input_ids = selection
            .inputs
            .iter()
            .map(claimed_digest)
            .collect::<Result<Vec<_>, _>>()?;
        check_distinct_inputs(&selection.inputs, &input_ids)?;
        let data_input_ids = request
            .data_inputs
            .iter()
            .map(claimed_digest)
            .collect::<Result<Vec<_>, _>>()?;

        check_balance(&spent_boxes, &claimed_digest(primary)?, &outputs, fee)?;

        let requested = outputs.len();
        let wire = WireTransaction {
            inputs: input_ids,
            data_inputs: data_input_ids,
            outputs: outputs.into_iter().chain(fee_box).collect(),
        };
        self.check_min_values(&wire.outputs, change_index)?;

        let size = p.serialize_transaction(&wire)?.len();
        let id = p.transaction_id(&wire)?;
        let tx_digest = id.to_digest().ok_or_else(|| {
            PrimitiveError::Serialization(format!("transaction id {} is not a digest", id))
        })?;

        let mut boxes = wire
            .outputs
            .iter()
            .enumerate()
            .map(|(index, candidate)| {
                let index = u16::try_from(index).map_err(|_| {
                    PrimitiveError::Serialization(format!("output index {} exceeds u16", index))
                })?;
                let placed = WireBox {
                    candidate: candidate.clone(),
                    transaction_id: tx_digest,
                    index,
                };
                let box_id = p.box_id(&placed)?;
                Ok(wire_to_box(&placed, box_id))
            })
            .collect::<Result<Vec<_>, TxBuildError>>()?;
        let fee_output = (boxes.len() > requested).then(|| boxes.remove(requested));

        tracing::info!(
            "Assembled transaction {}: {} inputs, {} outputs, fee {} nanoERG, {} bytes",
            id,
            spent_boxes.len(),
            boxes.len(),
            fee,
            size
        );

        Ok(UnsignedTransaction {
            id,
            inputs: selection
                .inputs
                .iter()
                .map(|b| Input {
                    box_id: b.box_id.clone(),
                })
                .collect(),
            data_inputs: request
                .data_inputs
                .iter()
                .map(|b| DataInput {
                    box_id: b.box_id.clone(),
                })
                .collect(),
            outputs: boxes,
            fee_output,
            size,
            wire,
            spent_boxes,
            data_boxes,
        })
    }

    /// Build the unsigned transaction, then reduce it against `headers`
    /// (newest first; only the newest ten are used).
    pub fn build_reduced_transaction(
        &self,
        request: &TxRequest,
        headers: &[BlockHeader],
        network: &NetworkContext,
    ) -> Result<ReducedTransaction, TxBuildError> {
        let unsigned = self.build_unsigned_transaction(request, network)?;
        let context = StateContext::from_headers(headers)?;
        tracing::debug!(
            "Reducing transaction {} at pre-header height {}",
            unsigned.id,
            context.pre_header().height
        );
        let reduced = self.primitives.reduce_transaction(
            &unsigned.wire,
            &unsigned.spent_boxes,
            &unsigned.data_boxes,
            &context,
        )?;
        Ok(reduced)
    }

    fn fee_candidate(
        &self,
        value: BoxValue,
        height: BlockHeight,
    ) -> Result<WireBoxCandidate, TxBuildError> {
        let tree = hex::decode(&self.config.miner_fee_ergo_tree)
            .map_err(|e| TxBuildError::InvalidScript(format!("miner fee ErgoTree: {}", e)))?;
        let contract = self
            .primitives
            .script_contract(&tree)
            .map_err(|e| TxBuildError::InvalidScript(format!("miner fee ErgoTree: {}", e)))?;
        Ok(WireBoxCandidate {
            value,
            contract,
            creation_height: height,
            tokens: vec![],
            registers: Registers::empty(),
        })
    }

    fn check_min_values(
        &self,
        outputs: &[WireBoxCandidate],
        change_index: Option<usize>,
    ) -> Result<(), TxBuildError> {
        for (index, output) in outputs.iter().enumerate() {
            let position = u16::try_from(index).map_err(|_| {
                PrimitiveError::Serialization(format!("output index {} exceeds u16", index))
            })?;
            let mut min = min_box_value(output, position, self.config.min_value_per_byte)?;
            if change_index == Some(index) {
                min = min.max(self.config.min_change_value);
            }
            let value = output.value.as_u64();
            if value < min {
                return Err(TxBuildError::BelowMinimumValue {
                    output: index,
                    value,
                    min,
                });
            }
        }
        Ok(())
    }
}

fn parse_fee(fee: Option<&BigInt>) -> Result<u64, TxBuildError> {
    let Some(fee) = fee else {
        return Ok(0);
    };
    u64::try_from(fee)
        .ok()
        .filter(|f| *f <= BoxValue::MAX_RAW)
        .ok_or_else(|| TxBuildError::InvalidFee(format!("{} is outside 0..=i64::MAX", fee)))
}

/// Id of a box already checked by `box_to_wire`.
fn claimed_digest(b: &ErgoBox) -> Result<[u8; 32], TxBuildError> {
    b.box_id.to_digest().ok_or_else(|| TxBuildError::InvalidId {
        kind: "box",
        value: b.box_id.to_string(),
    })
}

/// A box may be spent only once per transaction.
fn check_distinct_inputs(inputs: &[ErgoBox], digests: &[[u8; 32]]) -> Result<(), TxBuildError> {
    let mut seen = HashSet::with_capacity(digests.len());
    for (input, digest) in inputs.iter().zip(digests) {
        if !seen.insert(digest) {
            return Err(TxBuildError::DuplicateInput {
                box_id: input.box_id.to_string(),
            });
        }
    }
    Ok(())
}

fn saturate(v: u128) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}

/// Inputs must cover outputs plus fee, in ERG and in every token. A token
/// whose id equals the primary input's box id is being minted.
fn check_balance(
    inputs: &[WireBox],
    primary_id: &[u8; 32],
    outputs: &[WireBoxCandidate],
    fee: u64,
) -> Result<(), TxBuildError> {
    let available: u128 = inputs
        .iter()
        .map(|b| b.candidate.value.as_u64() as u128)
        .sum();
    let required: u128 = outputs
        .iter()
        .map(|o| o.value.as_u64() as u128)
        .sum::<u128>()
        + fee as u128;
    if available < required {
        return Err(TxBuildError::InsufficientInputs {
            required: saturate(required),
            available: saturate(available),
        });
    }
    if available > required {
        tracing::warn!(
            "Inputs exceed outputs plus fee by {} nanoERG with no output to receive it",
            available - required
        );
    }

    let mut token_in: HashMap<[u8; 32], u128> = HashMap::new();
    for token in inputs.iter().flat_map(|b| &b.candidate.tokens) {
        *token_in.entry(token.digest).or_default() += token.amount as u128;
    }
    let mut token_out: IndexMap<[u8; 32], (&TokenId, u128)> = IndexMap::new();
    for token in outputs.iter().flat_map(|o| &o.tokens) {
        token_out
            .entry(token.digest)
            .or_insert((&token.token_id, 0))
            .1 += token.amount as u128;
    }

    for (digest, (token_id, required)) in token_out {
        if &digest == primary_id {
            tracing::debug!("Minting {} of token {}", required, token_id);
            continue;
        }
        let available = token_in.get(&digest).copied().unwrap_or(0);
        if available < required {
            return Err(TxBuildError::InsufficientTokens {
                token_id: token_id.to_string(),
                required: saturate(required),
                available: saturate(available),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{Contract, WireToken, P2PK_PREFIX};

    fn candidate(value: u64, tokens: Vec<WireToken>) -> WireBoxCandidate {
        let mut tree = P2PK_PREFIX.to_vec();
        tree.push(0x02);
        tree.extend_from_slice(&[0x01; 32]);
        WireBoxCandidate {
            value: BoxValue::new(value).unwrap(),
            contract: Contract::parse_native(&tree).unwrap(),
            creation_height: 1,
            tokens,
            registers: Registers::empty(),
        }
    }

    fn spent(value: u64, tokens: Vec<WireToken>) -> WireBox {
        WireBox {
            candidate: candidate(value, tokens),
            transaction_id: [0x09; 32],
            index: 0,
        }
    }

    fn token(byte: u8, amount: u64) -> WireToken {
        WireToken {
            token_id: TokenId::from_digest([byte; 32]),
            digest: [byte; 32],
            amount,
        }
    }

    #[test]
    fn test_parse_fee() {
        assert_eq!(parse_fee(None).unwrap(), 0);
        assert_eq!(parse_fee(Some(&BigInt::from(0))).unwrap(), 0);
        assert_eq!(parse_fee(Some(&BigInt::from(1_100_000))).unwrap(), 1_100_000);
        assert!(matches!(
            parse_fee(Some(&BigInt::from(-1))),
            Err(TxBuildError::InvalidFee(_))
        ));
        assert!(matches!(
            parse_fee(Some(&(BigInt::from(i64::MAX) + 1))),
            Err(TxBuildError::InvalidFee(_))
        ));
    }

    #[test]
    fn test_balance_erg() {
        let inputs = [spent(1_000_000, vec![])];
        let primary = [0xee; 32];
        assert!(check_balance(&inputs, &primary, &[candidate(900_000, vec![])], 100_000).is_ok());
        assert!(matches!(
            check_balance(&inputs, &primary, &[candidate(900_001, vec![])], 100_000),
            Err(TxBuildError::InsufficientInputs {
                required: 1_000_001,
                available: 1_000_000
            })
        ));
    }

    #[test]
    fn test_balance_tokens() {
        let inputs = [spent(2_000_000, vec![token(0xaa, 10)])];
        let primary = [0xee; 32];
        let outputs = [
            candidate(1_000_000, vec![token(0xaa, 6)]),
            candidate(1_000_000, vec![token(0xaa, 4)]),
        ];
        assert!(check_balance(&inputs, &primary, &outputs, 0).is_ok());

        let outputs = [
            candidate(1_000_000, vec![token(0xaa, 6)]),
            candidate(1_000_000, vec![token(0xaa, 5)]),
        ];
        assert!(matches!(
            check_balance(&inputs, &primary, &outputs, 0),
            Err(TxBuildError::InsufficientTokens { required: 11, available: 10, .. })
        ));

        let outputs = [candidate(1_000_000, vec![token(0xbb, 1)])];
        assert!(matches!(
            check_balance(&inputs, &primary, &outputs, 0),
            Err(TxBuildError::InsufficientTokens { available: 0, .. })
        ));
    }

    #[test]
    fn test_balance_allows_minting_with_primary_id() {
        let inputs = [spent(2_000_000, vec![])];
        let outputs = [candidate(1_000_000, vec![token(0xee, 1_000)])];
        assert!(check_balance(&inputs, &[0xee; 32], &outputs, 0).is_ok());
        assert!(check_balance(&inputs, &[0xef; 32], &outputs, 0).is_err());
    }
}
