//! Wire-level shapes and the canonical Ergo byte layout
//!
//! Everything here is fixed-width and already validated: values fit the
//! chain's money type, token ids are raw digests, registers are dense.
//!
//! Layouts written by this module:
//!
//! ```text
//! candidate   := VLQ(value) ‖ ergo_tree ‖ VLQ(creation_height)
//!                ‖ u8(token count) ‖ token* ‖ u8(register count) ‖ constant*
//! token       := id(32)  ‖ VLQ(amount)        -- standalone box
//!              | VLQ(idx) ‖ VLQ(amount)        -- inside a transaction
//! box         := candidate ‖ tx_id(32) ‖ VLQ(index)
//! unsigned tx := VLQ(#inputs) ‖ (box_id(32) ‖ VLQ(0) ‖ u8(0))*
//!                ‖ VLQ(#data_inputs) ‖ box_id(32)*
//!                ‖ VLQ(#distinct tokens) ‖ token_id(32)*
//!                ‖ VLQ(#outputs) ‖ candidate*
//! ```

use std::collections::BTreeMap;
use std::fmt;

use assembler_core::{HexString, TokenId};
use indexmap::IndexSet;
use num_bigint::BigInt;

use crate::error::TxBuildError;
use crate::primitives::PrimitiveError;
use crate::sigma::{self, vlq_put_u64, SigmaReader};

/// Box value in nanoERG, within the chain's money range
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BoxValue(u64);

impl BoxValue {
    pub const MIN_RAW: u64 = 1;
    pub const MAX_RAW: u64 = i64::MAX as u64;

    pub fn new(value: u64) -> Option<Self> {
        (Self::MIN_RAW..=Self::MAX_RAW)
            .contains(&value)
            .then_some(Self(value))
    }

    pub fn from_bigint(value: &BigInt) -> Option<Self> {
        u64::try_from(value).ok().and_then(Self::new)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Token entry with its id already decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireToken {
    pub token_id: TokenId,
    pub digest: [u8; 32],
    pub amount: u64,
}

/// Non-mandatory register slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RegisterId {
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
    R8 = 8,
    R9 = 9,
}

impl RegisterId {
    pub const ALL: [RegisterId; 6] = [
        RegisterId::R4,
        RegisterId::R5,
        RegisterId::R6,
        RegisterId::R7,
        RegisterId::R8,
        RegisterId::R9,
    ];

    /// Parse "R4".."R9". The digit is the slot ordinal.
    pub fn parse(name: &str) -> Option<Self> {
        let mut chars = name.chars();
        if chars.next() != Some('R') {
            return None;
        }
        let slot = chars.next()?.to_digit(10)?;
        if chars.next().is_some() {
            return None;
        }
        Self::ALL.into_iter().find(|r| r.slot() as u32 == slot)
    }

    pub fn slot(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::R4 => "R4",
            Self::R5 => "R5",
            Self::R6 => "R6",
            Self::R7 => "R7",
            Self::R8 => "R8",
            Self::R9 => "R9",
        }
    }
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sigma-serialized register values, densely packed from R4
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registers(BTreeMap<RegisterId, Vec<u8>>);

impl Registers {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(values: BTreeMap<RegisterId, Vec<u8>>) -> Result<Self, TxBuildError> {
        for (expected, id) in RegisterId::ALL.iter().zip(values.keys()) {
            if id != expected {
                return Err(TxBuildError::InvalidRegister {
                    register: expected.name().to_string(),
                    reason: format!(
                        "registers must be densely packed from R4 ({} set)",
                        values.len()
                    ),
                });
            }
        }
        Ok(Self(values))
    }

    pub fn get(&self, id: RegisterId) -> Option<&[u8]> {
        self.0.get(&id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RegisterId, &[u8])> {
        self.0.iter().map(|(id, v)| (*id, v.as_slice()))
    }

    /// Register name to hex constant, as carried by domain records.
    pub fn to_hex_map(&self) -> BTreeMap<String, HexString> {
        self.iter()
            .map(|(id, v)| (id.name().to_string(), hex::encode(v)))
            .collect()
    }
}

/// P2PK ErgoTree prefix: header(0x00) + SigmaProp constant type(0x08) + ProveDlog(0xCD)
pub const P2PK_PREFIX: [u8; 3] = [0x00, sigma::TYPE_SIGMA_PROP, 0xCD];
/// P2PK ErgoTree total length: 3 bytes prefix + 33 bytes compressed EC point
pub const P2PK_TREE_LEN: usize = 36;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractKind {
    /// Pay to public key (compressed point)
    P2pk([u8; 33]),
    /// Pay to script
    P2s,
}

/// Pay-to-address contract guarding a box
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    ergo_tree: Vec<u8>,
    kind: ContractKind,
}

impl Contract {
    pub fn new(ergo_tree: Vec<u8>, kind: ContractKind) -> Self {
        Self { ergo_tree, kind }
    }

    /// Validate the ErgoTree header and classify the script.
    ///
    /// Header byte: bits 0-2 version, bit 3 size flag, bit 4 constant
    /// segregation, bits 5-7 reserved. Version > 0 requires the size flag,
    /// and a declared size must match the remaining bytes.
    pub fn parse_native(ergo_tree: &[u8]) -> Result<Self, PrimitiveError> {
        let mut r = SigmaReader::new(ergo_tree);
        let header = r
            .get_u8()
            .map_err(|_| PrimitiveError::Script("empty ErgoTree".to_string()))?;
        if header & 0xE0 != 0 {
            return Err(PrimitiveError::Script(format!(
                "reserved header bits set: 0x{:02x}",
                header
            )));
        }
        let version = header & 0x07;
        let has_size = header & 0x08 != 0;
        if version > 0 && !has_size {
            return Err(PrimitiveError::Script(format!(
                "version {} ErgoTree must declare its size",
                version
            )));
        }
        if has_size {
            let size = r
                .get_vlq_u32()
                .map_err(|e| PrimitiveError::Script(format!("bad size field: {}", e)))?;
            if size as usize != r.remaining() {
                return Err(PrimitiveError::Script(format!(
                    "declared size {} but {} bytes follow",
                    size,
                    r.remaining()
                )));
            }
        }
        if r.is_empty() {
            return Err(PrimitiveError::Script("ErgoTree has no body".to_string()));
        }

        let kind = if ergo_tree.len() == P2PK_TREE_LEN
            && ergo_tree[..3] == P2PK_PREFIX
            && matches!(ergo_tree[3], 0x02 | 0x03)
        {
            let mut pk = [0u8; 33];
            pk.copy_from_slice(&ergo_tree[3..P2PK_TREE_LEN]);
            ContractKind::P2pk(pk)
        } else {
            ContractKind::P2s
        };
        Ok(Self::new(ergo_tree.to_vec(), kind))
    }

    pub fn ergo_tree(&self) -> &[u8] {
        &self.ergo_tree
    }

    pub fn kind(&self) -> &ContractKind {
        &self.kind
    }
}

/// Output box candidate ready for serialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireBoxCandidate {
    pub value: BoxValue,
    pub contract: Contract,
    pub creation_height: u32,
    pub tokens: Vec<WireToken>,
    pub registers: Registers,
}

impl WireBoxCandidate {
    /// Write the candidate. With a token table, tokens are written as
    /// indexes into it (transaction form); without, ids are inline.
    pub fn write(
        &self,
        w: &mut Vec<u8>,
        token_table: Option<&IndexSet<[u8; 32]>>,
    ) -> Result<(), PrimitiveError> {
        vlq_put_u64(w, self.value.as_u64());
        w.extend_from_slice(self.contract.ergo_tree());
        vlq_put_u64(w, self.creation_height as u64);

        w.push(u8::try_from(self.tokens.len()).map_err(|_| {
            PrimitiveError::Serialization(format!("{} tokens in one box", self.tokens.len()))
        })?);
        for token in &self.tokens {
            match token_table {
                Some(table) => {
                    let idx = table.get_index_of(&token.digest).ok_or_else(|| {
                        PrimitiveError::Serialization(format!(
                            "Token {} not in distinct table",
                            token.token_id
                        ))
                    })?;
                    vlq_put_u64(w, idx as u64);
                }
                None => w.extend_from_slice(&token.digest),
            }
            vlq_put_u64(w, token.amount);
        }

        w.push(self.registers.len() as u8);
        for (_, bytes) in self.registers.iter() {
            w.extend_from_slice(bytes);
        }
        Ok(())
    }

    /// Serialized size of this candidate as output `index` of a transaction.
    pub fn box_size(&self, index: u16) -> Result<usize, PrimitiveError> {
        let sized = WireBox {
            candidate: self.clone(),
            transaction_id: [0u8; 32],
            index,
        };
        Ok(sized.to_bytes()?.len())
    }
}

/// A candidate placed at `index` of transaction `transaction_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireBox {
    pub candidate: WireBoxCandidate,
    pub transaction_id: [u8; 32],
    pub index: u16,
}

impl WireBox {
    pub fn to_bytes(&self) -> Result<Vec<u8>, PrimitiveError> {
        let mut w = Vec::with_capacity(128);
        self.candidate.write(&mut w, None)?;
        w.extend_from_slice(&self.transaction_id);
        vlq_put_u64(&mut w, self.index as u64);
        Ok(w)
    }
}

/// Unsigned transaction: input and data-input box ids plus output candidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireTransaction {
    pub inputs: Vec<[u8; 32]>,
    pub data_inputs: Vec<[u8; 32]>,
    pub outputs: Vec<WireBoxCandidate>,
}

impl WireTransaction {
    /// Distinct token ids across all outputs, in first-seen order.
    pub fn distinct_token_ids(&self) -> IndexSet<[u8; 32]> {
        self.outputs
            .iter()
            .flat_map(|o| o.tokens.iter().map(|t| t.digest))
            .collect()
    }

    /// Transaction bytes with empty spending proofs and context extensions.
    pub fn bytes_to_sign(&self) -> Result<Vec<u8>, PrimitiveError> {
        let mut w = Vec::with_capacity(1024);

        vlq_put_u64(&mut w, self.inputs.len() as u64);
        for box_id in &self.inputs {
            w.extend_from_slice(box_id);
            vlq_put_u64(&mut w, 0); // proof length
            w.push(0); // context extension entries
        }

        vlq_put_u64(&mut w, self.data_inputs.len() as u64);
        for box_id in &self.data_inputs {
            w.extend_from_slice(box_id);
        }

        let distinct = self.distinct_token_ids();
        vlq_put_u64(&mut w, distinct.len() as u64);
        for token_id in &distinct {
            w.extend_from_slice(token_id);
        }

        vlq_put_u64(&mut w, self.outputs.len() as u64);
        for output in &self.outputs {
            output.write(&mut w, Some(&distinct))?;
        }

        Ok(w)
    }
}
