//! Primitive service backed by sigma-rust (`ergo-lib`)
//!
//! Wire shapes are handed over as their canonical bytes and parsed by
//! sigma-rust, so both services agree byte for byte on everything they accept.
//! Reduction runs the real interpreter and needs a full ten-header context.

use assembler_core::constants::STATE_CONTEXT_HEADERS;
use assembler_core::{BoxId, TxId};
use ergo_lib::chain::ergo_state_context::ErgoStateContext;
use ergo_lib::chain::parameters::Parameters;
use ergo_lib::chain::transaction::input::UnsignedInput;
use ergo_lib::chain::transaction::reduced::reduce_tx;
use ergo_lib::chain::transaction::unsigned::UnsignedTransaction;
use ergo_lib::chain::transaction::{Transaction, TxIoVec};
use ergo_lib::ergo_chain_types::{Header, PreHeader};
use ergo_lib::ergotree_interpreter::sigma_protocol::prover::ContextExtension;
use ergo_lib::ergotree_ir::chain::ergo_box::ErgoBox;
use ergo_lib::ergotree_ir::ergo_tree::ErgoTree;
use ergo_lib::ergotree_ir::mir::constant::{Constant as SigmaConstant, Literal};
use ergo_lib::ergotree_ir::mir::value::{CollKind, NativeColl};
use ergo_lib::ergotree_ir::serialization::SigmaSerializable;
use ergo_lib::wallet::tx_context::TransactionContext;

use crate::constant::{Constant, ParsedConstant};
use crate::primitives::{ChainPrimitives, PrimitiveError};
use crate::reduce::{ReducedInput, ReducedTransaction, StateContext};
use crate::sigma::SigmaReader;
use crate::wire::{Contract, WireBox, WireTransaction};

#[derive(Debug, Clone, Copy, Default)]
pub struct SigmaRustPrimitives;

fn parse_box(wire: &WireBox) -> Result<ErgoBox, PrimitiveError> {
    ErgoBox::sigma_parse_bytes(&wire.to_bytes()?)
        .map_err(|e| PrimitiveError::Serialization(format!("box: {}", e)))
}

fn parse_transaction(tx: &WireTransaction) -> Result<Transaction, PrimitiveError> {
    Transaction::sigma_parse_bytes(&tx.bytes_to_sign()?)
        .map_err(|e| PrimitiveError::Serialization(format!("transaction: {}", e)))
}

fn unsigned(tx: Transaction) -> Result<UnsignedTransaction, PrimitiveError> {
    let inputs: Vec<UnsignedInput> = tx
        .inputs
        .iter()
        .map(|i| UnsignedInput::new(i.box_id, ContextExtension::empty()))
        .collect();
    let inputs = TxIoVec::from_vec(inputs)
        .map_err(|e| PrimitiveError::Reduction(format!("Inputs: {}", e)))?;
    UnsignedTransaction::new(inputs, tx.data_inputs.clone(), tx.output_candidates.clone())
        .map_err(|e| PrimitiveError::Reduction(e.to_string()))
}

/// sigma-rust state context from the kept headers.
fn state_context(context: &StateContext) -> Result<ErgoStateContext, PrimitiveError> {
    let headers = context
        .headers()
        .iter()
        .map(|h| {
            serde_json::to_value(h)
                .and_then(serde_json::from_value::<Header>)
                .map_err(|e| PrimitiveError::Reduction(format!("header {}: {}", h.id, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let count = headers.len();
    let headers: [Header; STATE_CONTEXT_HEADERS] = headers.try_into().map_err(|_| {
        PrimitiveError::Reduction(format!(
            "{} block headers supplied, {} required",
            count, STATE_CONTEXT_HEADERS
        ))
    })?;
    let pre_header = PreHeader::from(headers[0].clone());
    Ok(ErgoStateContext::new(
        pre_header,
        headers,
        Parameters::default(),
    ))
}

impl ChainPrimitives for SigmaRustPrimitives {
    fn encode_constant(&self, constant: &Constant) -> Result<Vec<u8>, PrimitiveError> {
        let c = match constant {
            Constant::Int(v) => SigmaConstant::from(*v),
            Constant::Long(v) => SigmaConstant::from(*v),
            Constant::Bytes(b) => SigmaConstant::from(b.clone()),
        };
        c.sigma_serialize_bytes()
            .map_err(|e| PrimitiveError::Encoding(e.to_string()))
    }

    fn parse_constant(&self, bytes: &[u8]) -> Result<ParsedConstant, PrimitiveError> {
        let c = SigmaConstant::sigma_parse_bytes(bytes)
            .map_err(|e| PrimitiveError::Encoding(e.to_string()))?;
        let canonical = c
            .sigma_serialize_bytes()
            .map_err(|e| PrimitiveError::Encoding(e.to_string()))?;
        if canonical.len() != bytes.len() {
            return Err(PrimitiveError::Encoding(format!(
                "{} trailing bytes after constant",
                bytes.len().saturating_sub(canonical.len())
            )));
        }
        Ok(match &c.v {
            Literal::Int(v) => ParsedConstant::Int(*v),
            Literal::Long(v) => ParsedConstant::Long(*v),
            Literal::Coll(CollKind::NativeColl(NativeColl::CollByte(b))) => {
                ParsedConstant::CollByte(b.iter().map(|x| *x as u8).collect())
            }
            _ => ParsedConstant::Other {
                type_code: canonical.first().copied().unwrap_or_default(),
            },
        })
    }

    fn script_contract(&self, ergo_tree: &[u8]) -> Result<Contract, PrimitiveError> {
        ErgoTree::sigma_parse_bytes(ergo_tree)
            .map_err(|e| PrimitiveError::Script(format!("Parse error: {}", e)))?;
        Contract::parse_native(ergo_tree)
    }

    fn box_id(&self, ergo_box: &WireBox) -> Result<BoxId, PrimitiveError> {
        Ok(BoxId::new(String::from(parse_box(ergo_box)?.box_id())))
    }

    fn serialize_transaction(&self, tx: &WireTransaction) -> Result<Vec<u8>, PrimitiveError> {
        parse_transaction(tx)?
            .sigma_serialize_bytes()
            .map_err(|e| PrimitiveError::Serialization(e.to_string()))
    }

    fn transaction_id(&self, tx: &WireTransaction) -> Result<TxId, PrimitiveError> {
        Ok(TxId::new(String::from(parse_transaction(tx)?.id())))
    }

    fn reduce_transaction(
        &self,
        tx: &WireTransaction,
        inputs: &[WireBox],
        data_inputs: &[WireBox],
        context: &StateContext,
    ) -> Result<ReducedTransaction, PrimitiveError> {
        let unsigned_tx = unsigned(parse_transaction(tx)?)?;
        let tx_id = TxId::new(String::from(unsigned_tx.id()));
        let input_boxes = inputs.iter().map(parse_box).collect::<Result<Vec<_>, _>>()?;
        let data_input_boxes = data_inputs
            .iter()
            .map(parse_box)
            .collect::<Result<Vec<_>, _>>()?;

        let tx_context = TransactionContext::new(unsigned_tx, input_boxes, data_input_boxes)
            .map_err(|e| PrimitiveError::Reduction(e.to_string()))?;
        let reduced = reduce_tx(tx_context, &state_context(context)?)
            .map_err(|e| PrimitiveError::Reduction(e.to_string()))?;

        let sigma_booleans = reduced
            .reduced_inputs()
            .iter()
            .map(|input| {
                input
                    .sigma_prop
                    .sigma_serialize_bytes()
                    .map_err(|e| PrimitiveError::Serialization(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let encoded = reduced
            .sigma_serialize_bytes()
            .map_err(|e| PrimitiveError::Serialization(e.to_string()))?;

        // Recover bytes to sign and costs from the encoding
        let malformed = |e: crate::sigma::SigmaDecodeError| {
            PrimitiveError::Serialization(format!("reduced transaction: {}", e))
        };
        let mut r = SigmaReader::new(&encoded);
        let len = r.get_vlq_u32().map_err(malformed)? as usize;
        let bytes_to_sign = r.get_bytes(len).map_err(malformed)?.to_vec();
        let mut reduced_inputs = Vec::with_capacity(sigma_booleans.len());
        for sigma_boolean in sigma_booleans {
            r.get_bytes(sigma_boolean.len()).map_err(malformed)?;
            let cost = r.get_vlq_u64().map_err(malformed)?;
            reduced_inputs.push(ReducedInput {
                sigma_boolean,
                cost,
            });
        }
        let cost = r.get_vlq_u32().map_err(malformed)?;
        r.finish().map_err(malformed)?;

        Ok(ReducedTransaction {
            tx_id,
            bytes_to_sign,
            inputs: reduced_inputs,
            cost,
        })
    }
}
