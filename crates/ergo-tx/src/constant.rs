//! Register constant codec
//!
//! Register values travel as hex-encoded sigma constants. Only three shapes
//! are modelled here: `Int`, `Long` and `Coll[Byte]`.
//!
//! Decoding is two-phase: the primitive service parses the bytes into a
//! [`ParsedConstant`], then type recovery walks [`DECODE_PRIORITY`] and keeps
//! the first kind that matches. The wire format carries a type code, so at
//! most one kind can ever match.

use assembler_core::HexString;
use thiserror::Error;

use crate::primitives::{ChainPrimitives, PrimitiveError};
use crate::sigma::{self, SigmaDecodeError, SigmaReader};

/// A typed register value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Int(i32),
    Long(i64),
    Bytes(Vec<u8>),
}

/// The variant of a [`Constant`], for callers carrying type metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstantKind {
    Int,
    Long,
    Bytes,
}

/// Order in which decoded constants are matched against the supported kinds.
pub const DECODE_PRIORITY: [ConstantKind; 3] =
    [ConstantKind::Int, ConstantKind::Long, ConstantKind::Bytes];

impl Constant {
    pub fn kind(&self) -> ConstantKind {
        match self {
            Self::Int(_) => ConstantKind::Int,
            Self::Long(_) => ConstantKind::Long,
            Self::Bytes(_) => ConstantKind::Bytes,
        }
    }
}

impl From<i32> for Constant {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for Constant {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<Vec<u8>> for Constant {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

/// A sigma constant as parsed by a primitive service, before type recovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedConstant {
    Int(i32),
    Long(i64),
    CollByte(Vec<u8>),
    /// Well-formed constant of a type this codec does not model
    Other { type_code: u8 },
}

impl ConstantKind {
    /// Recover a [`Constant`] of this kind, if the parsed value has it.
    pub fn recover(self, parsed: &ParsedConstant) -> Option<Constant> {
        match (self, parsed) {
            (Self::Int, ParsedConstant::Int(v)) => Some(Constant::Int(*v)),
            (Self::Long, ParsedConstant::Long(v)) => Some(Constant::Long(*v)),
            (Self::Bytes, ParsedConstant::CollByte(b)) => Some(Constant::Bytes(b.clone())),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConstantError {
    #[error("Invalid constant hex: {0}")]
    InvalidHex(String),

    #[error("Constant decode failed: {0}")]
    DecodeFailed(String),

    #[error(transparent)]
    Primitive(#[from] PrimitiveError),
}

/// Encode a constant into its canonical hex form.
pub fn serialize_constant<P: ChainPrimitives + ?Sized>(
    primitives: &P,
    constant: &Constant,
) -> Result<HexString, ConstantError> {
    Ok(hex::encode(primitives.encode_constant(constant)?))
}

/// Decode hex into a [`Constant`], recovering its kind by [`DECODE_PRIORITY`].
pub fn deserialize_constant<P: ChainPrimitives + ?Sized>(
    primitives: &P,
    hex_str: &str,
) -> Result<Constant, ConstantError> {
    let bytes = hex::decode(hex_str).map_err(|e| ConstantError::InvalidHex(e.to_string()))?;
    let parsed = primitives
        .parse_constant(&bytes)
        .map_err(|e| ConstantError::DecodeFailed(e.to_string()))?;

    DECODE_PRIORITY
        .iter()
        .find_map(|kind| kind.recover(&parsed))
        .ok_or_else(|| match parsed {
            ParsedConstant::Other { type_code } => ConstantError::DecodeFailed(format!(
                "type code 0x{:02x} is not Int, Long or Coll[Byte]",
                type_code
            )),
            _ => ConstantError::DecodeFailed("no kind matched".to_string()),
        })
}

/// Sigma-serialize a constant with the in-process encoder.
pub fn encode_native(constant: &Constant) -> Vec<u8> {
    let mut bytes = Vec::new();
    match constant {
        Constant::Int(v) => {
            bytes.push(sigma::TYPE_INT);
            sigma::put_int(&mut bytes, *v);
        }
        Constant::Long(v) => {
            bytes.push(sigma::TYPE_LONG);
            sigma::put_long(&mut bytes, *v);
        }
        Constant::Bytes(data) => {
            bytes.push(sigma::TYPE_COLL_BYTE);
            sigma::put_coll_byte(&mut bytes, data);
        }
    }
    bytes
}

/// Parse a sigma-serialized constant with the in-process decoder.
///
/// Primitive types with fixed or self-delimiting payloads are understood;
/// every byte must be consumed.
pub fn parse_native(bytes: &[u8]) -> Result<ParsedConstant, SigmaDecodeError> {
    if bytes.is_empty() {
        return Err(SigmaDecodeError::EmptyInput);
    }
    let mut r = SigmaReader::new(bytes);
    let type_code = r.get_u8()?;
    let parsed = match type_code {
        sigma::TYPE_INT => ParsedConstant::Int(r.get_int()?),
        sigma::TYPE_LONG => ParsedConstant::Long(r.get_long()?),
        sigma::TYPE_COLL_BYTE => ParsedConstant::CollByte(r.get_coll_byte()?.to_vec()),
        sigma::TYPE_BOOLEAN | sigma::TYPE_BYTE => {
            r.get_u8()?;
            ParsedConstant::Other { type_code }
        }
        sigma::TYPE_SHORT => {
            let short = sigma::unzigzag_u32(r.get_vlq_u32()?);
            if i16::try_from(short).is_err() {
                return Err(SigmaDecodeError::Overflow);
            }
            ParsedConstant::Other { type_code }
        }
        sigma::TYPE_BIG_INT => {
            r.get_coll_byte()?;
            ParsedConstant::Other { type_code }
        }
        sigma::TYPE_GROUP_ELEMENT => {
            r.get_bytes(33)?;
            ParsedConstant::Other { type_code }
        }
        other => return Err(SigmaDecodeError::UnsupportedType(other)),
    };
    r.finish()?;
    Ok(parsed)
}
