//! Transaction reduction
//!
//! A reduced transaction (EIP-19) carries the bytes to sign plus, for every
//! input, the sigma proposition its script reduces to. Wallets sign it
//! without access to the chain.
//!
//! Layout:
//!
//! ```text
//! VLQ(len) ‖ bytes_to_sign ‖ (sigma_boolean ‖ VLQ(cost))* ‖ VLQ(tx_cost)
//! ```

use assembler_core::constants::STATE_CONTEXT_HEADERS;
use assembler_core::{BlockHeight, TxId};
use serde::{Deserialize, Serialize};

use crate::error::TxBuildError;
use crate::primitives::PrimitiveError;
use crate::sigma::vlq_put_u64;
use crate::wire::{ContractKind, WireBox};

/// SigmaBoolean opcode for ProveDlog
pub const SIGMA_PROVE_DLOG: u8 = 0xCD;
/// SigmaBoolean opcode for TrivialProp(true)
pub const SIGMA_TRIVIAL_TRUE: u8 = 0xD3;

/// Autolykos solution of a block header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowSolutions {
    /// Miner public key (hex)
    pub pk: String,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

/// Block header as served by an Ergo node
///
/// Fields the assembler does not read are kept in `extra` so a header
/// re-serializes unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    pub id: String,
    pub parent_id: String,
    pub version: u8,
    pub height: BlockHeight,
    pub timestamp: u64,
    pub n_bits: u64,
    pub votes: String,
    pub pow_solutions: PowSolutions,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Header fields of the block being built, as seen by scripts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreHeader {
    pub version: u8,
    pub parent_id: String,
    pub timestamp: u64,
    pub n_bits: u64,
    pub height: BlockHeight,
    pub miner_pk: String,
    pub votes: String,
}

impl From<&BlockHeader> for PreHeader {
    fn from(header: &BlockHeader) -> Self {
        Self {
            version: header.version,
            parent_id: header.parent_id.clone(),
            timestamp: header.timestamp,
            n_bits: header.n_bits,
            height: header.height,
            miner_pk: header.pow_solutions.pk.clone(),
            votes: header.votes.clone(),
        }
    }
}

/// Chain state scripts are reduced against
#[derive(Debug, Clone, PartialEq)]
pub struct StateContext {
    pre_header: PreHeader,
    headers: Vec<BlockHeader>,
}

impl StateContext {
    /// Build from headers ordered newest first.
    ///
    /// Only the newest [`STATE_CONTEXT_HEADERS`] are kept; heights must be
    /// strictly descending.
    pub fn from_headers(headers: &[BlockHeader]) -> Result<Self, TxBuildError> {
        let newest = headers
            .first()
            .ok_or_else(|| TxBuildError::StateContext("no block headers".to_string()))?;

        if headers.len() > STATE_CONTEXT_HEADERS {
            tracing::warn!(
                "Ignoring {} of {} block headers beyond the state context window",
                headers.len() - STATE_CONTEXT_HEADERS,
                headers.len()
            );
        }
        let window = &headers[..headers.len().min(STATE_CONTEXT_HEADERS)];

        for pair in window.windows(2) {
            if pair[1].height >= pair[0].height {
                return Err(TxBuildError::StateContext(format!(
                    "headers must be newest first: height {} follows {}",
                    pair[1].height, pair[0].height
                )));
            }
        }

        Ok(Self {
            pre_header: PreHeader::from(newest),
            headers: window.to_vec(),
        })
    }

    pub fn pre_header(&self) -> &PreHeader {
        &self.pre_header
    }

    /// Kept headers, newest first
    pub fn headers(&self) -> &[BlockHeader] {
        &self.headers
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReducedInput {
    /// Serialized SigmaBoolean the input's script reduced to
    pub sigma_boolean: Vec<u8>,
    pub cost: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReducedTransaction {
    pub tx_id: TxId,
    pub bytes_to_sign: Vec<u8>,
    pub inputs: Vec<ReducedInput>,
    pub cost: u32,
}

impl ReducedTransaction {
    /// EIP-19 encoding
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.bytes_to_sign.len() + 64 * self.inputs.len() + 8);
        vlq_put_u64(&mut out, self.bytes_to_sign.len() as u64);
        out.extend_from_slice(&self.bytes_to_sign);
        for input in &self.inputs {
            out.extend_from_slice(&input.sigma_boolean);
            vlq_put_u64(&mut out, input.cost);
        }
        vlq_put_u64(&mut out, self.cost as u64);
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

/// Reduce each input by its contract alone: P2PK inputs to ProveDlog of the
/// key, every other script to TrivialProp(true). Costs are zero.
pub(crate) fn reduce_by_contract(
    tx_id: TxId,
    bytes_to_sign: Vec<u8>,
    inputs: &[WireBox],
) -> Result<ReducedTransaction, PrimitiveError> {
    if inputs.is_empty() {
        return Err(PrimitiveError::Reduction("no inputs to reduce".to_string()));
    }
    let inputs = inputs
        .iter()
        .map(|input| {
            let sigma_boolean = match input.candidate.contract.kind() {
                ContractKind::P2pk(pk) => {
                    let mut bytes = Vec::with_capacity(34);
                    bytes.push(SIGMA_PROVE_DLOG);
                    bytes.extend_from_slice(pk);
                    bytes
                }
                ContractKind::P2s => vec![SIGMA_TRIVIAL_TRUE],
            };
            ReducedInput {
                sigma_boolean,
                cost: 0,
            }
        })
        .collect();
    Ok(ReducedTransaction {
        tx_id,
        bytes_to_sign,
        inputs,
        cost: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{BoxValue, Contract, Registers, WireBoxCandidate, P2PK_PREFIX};

    fn header(height: u32) -> BlockHeader {
        serde_json::from_value(serde_json::json!({
            "id": format!("{:064x}", height),
            "parentId": format!("{:064x}", height.saturating_sub(1)),
            "version": 3,
            "height": height,
            "timestamp": 1_700_000_000_000u64 + height as u64,
            "nBits": 117_811_961u64,
            "votes": "000000",
            "stateRoot": "00".repeat(33),
            "powSolutions": { "pk": format!("02{}", "11".repeat(32)), "w": "", "n": "0000000000000000", "d": 0 }
        }))
        .unwrap()
    }

    fn headers_newest_first(count: u32, top: u32) -> Vec<BlockHeader> {
        (0..count).map(|i| header(top - i)).collect()
    }

    fn input(tree: Vec<u8>) -> WireBox {
        WireBox {
            candidate: WireBoxCandidate {
                value: BoxValue::new(1_000_000).unwrap(),
                contract: Contract::parse_native(&tree).unwrap(),
                creation_height: 1,
                tokens: vec![],
                registers: Registers::empty(),
            },
            transaction_id: [0; 32],
            index: 0,
        }
    }

    #[test]
    fn test_header_keeps_unknown_fields() {
        let h = header(10);
        assert_eq!(h.extra.get("stateRoot").and_then(|v| v.as_str()).map(str::len), Some(66));
        let json = serde_json::to_value(&h).unwrap();
        assert_eq!(json["powSolutions"]["n"], "0000000000000000");
        assert_eq!(json["nBits"], 117_811_961u64);
    }

    #[test]
    fn test_state_context_window() {
        let fifteen = headers_newest_first(15, 1000);
        let ten = headers_newest_first(10, 1000);
        let a = StateContext::from_headers(&fifteen).unwrap();
        let b = StateContext::from_headers(&ten).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.headers().len(), 10);
        assert_eq!(a.pre_header().height, 1000);
        assert_eq!(a.headers()[9].height, 991);
    }

    #[test]
    fn test_state_context_short_window() {
        let ctx = StateContext::from_headers(&headers_newest_first(3, 50)).unwrap();
        assert_eq!(ctx.headers().len(), 3);
    }

    #[test]
    fn test_state_context_rejects_bad_order() {
        assert!(matches!(
            StateContext::from_headers(&[]),
            Err(TxBuildError::StateContext(_))
        ));
        let ascending = vec![header(5), header(6)];
        assert!(matches!(
            StateContext::from_headers(&ascending),
            Err(TxBuildError::StateContext(_))
        ));
        let repeated = vec![header(5), header(5)];
        assert!(StateContext::from_headers(&repeated).is_err());
    }

    #[test]
    fn test_out_of_order_beyond_window_is_ignored() {
        let mut headers = headers_newest_first(10, 100);
        headers.push(header(500));
        assert!(StateContext::from_headers(&headers).is_ok());
    }

    #[test]
    fn test_reduce_by_contract_layout() {
        let mut p2pk = P2PK_PREFIX.to_vec();
        p2pk.push(0x02);
        p2pk.extend_from_slice(&[0x99; 32]);
        let script = vec![0x10, 0x01, 0x01, 0x01, 0xd1, 0x73, 0x00];

        let reduced = reduce_by_contract(
            TxId::zero(),
            vec![0xaa, 0xbb],
            &[input(p2pk.clone()), input(script)],
        )
        .unwrap();
        let bytes = reduced.to_bytes();

        let mut expected = vec![0x02, 0xaa, 0xbb, SIGMA_PROVE_DLOG];
        expected.extend_from_slice(&p2pk[3..]);
        expected.push(0x00);
        expected.extend_from_slice(&[SIGMA_TRIVIAL_TRUE, 0x00]);
        expected.push(0x00);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_reduce_requires_inputs() {
        assert!(reduce_by_contract(TxId::zero(), vec![], &[]).is_err());
    }
}
