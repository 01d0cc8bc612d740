//! Sigma serialization primitives
//!
//! Ergo's canonical byte layout is built from a handful of encodings:
//! - VLQ (little-endian base-128) for unsigned integers
//! - ZigZag + VLQ for signed integers
//! - One type-code byte in front of every constant
//!
//! These are the building blocks for the constant codec and the wire layer.

/// Type code of `SBoolean`
pub const TYPE_BOOLEAN: u8 = 0x01;
/// Type code of `SByte`
pub const TYPE_BYTE: u8 = 0x02;
/// Type code of `SShort`
pub const TYPE_SHORT: u8 = 0x03;
/// Type code of `SInt`
pub const TYPE_INT: u8 = 0x04;
/// Type code of `SLong`
pub const TYPE_LONG: u8 = 0x05;
/// Type code of `SBigInt`
pub const TYPE_BIG_INT: u8 = 0x06;
/// Type code of `SGroupElement`
pub const TYPE_GROUP_ELEMENT: u8 = 0x07;
/// Type code of `SSigmaProp`
pub const TYPE_SIGMA_PROP: u8 = 0x08;
/// Type code of `Coll[SByte]`
pub const TYPE_COLL_BYTE: u8 = 0x0e;

/// ZigZag-encode a signed 32-bit value
pub fn zigzag_i32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

/// ZigZag-encode a signed 64-bit value
///
/// Bitwise form handles `i64::MIN` (arithmetic negation would overflow).
pub fn zigzag_i64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

pub fn unzigzag_u32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

pub fn unzigzag_u64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// VLQ-encode a u64 value and append to buffer
pub fn vlq_put_u64(buf: &mut Vec<u8>, mut n: u64) {
    loop {
        let mut byte = (n & 0x7F) as u8;
        n >>= 7;
        if n != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if n == 0 {
            break;
        }
    }
}

/// Append a sigma `Int` payload (no type code)
pub fn put_int(buf: &mut Vec<u8>, value: i32) {
    vlq_put_u64(buf, zigzag_i32(value) as u64);
}

/// Append a sigma `Long` payload (no type code)
pub fn put_long(buf: &mut Vec<u8>, value: i64) {
    vlq_put_u64(buf, zigzag_i64(value));
}

/// Append a length-prefixed byte collection payload (no type code)
pub fn put_coll_byte(buf: &mut Vec<u8>, data: &[u8]) {
    vlq_put_u64(buf, data.len() as u64);
    buf.extend_from_slice(data);
}

/// Errors that can occur during Sigma decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigmaDecodeError {
    EmptyInput,
    UnexpectedEnd { needed: usize, remaining: usize },
    UnsupportedType(u8),
    Overflow,
    TrailingBytes(usize),
}

impl std::fmt::Display for SigmaDecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "Empty input"),
            Self::UnexpectedEnd { needed, remaining } => {
                write!(
                    f,
                    "Unexpected end of input: needed {} bytes, {} remaining",
                    needed, remaining
                )
            }
            Self::UnsupportedType(code) => write!(f, "Unsupported type code 0x{:02x}", code),
            Self::Overflow => write!(f, "Value overflow during VLQ decoding"),
            Self::TrailingBytes(n) => write!(f, "{} trailing bytes after value", n),
        }
    }
}

impl std::error::Error for SigmaDecodeError {}

/// Cursor over sigma-serialized bytes
pub struct SigmaReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> SigmaReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn get_u8(&mut self) -> Result<u8, SigmaDecodeError> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or(SigmaDecodeError::UnexpectedEnd {
                needed: 1,
                remaining: 0,
            })?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn get_bytes(&mut self, len: usize) -> Result<&'a [u8], SigmaDecodeError> {
        if self.remaining() < len {
            return Err(SigmaDecodeError::UnexpectedEnd {
                needed: len,
                remaining: self.remaining(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn get_vlq_u64(&mut self) -> Result<u64, SigmaDecodeError> {
        let mut result: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.get_u8()?;
            if shift == 63 && byte > 1 {
                return Err(SigmaDecodeError::Overflow);
            }
            result |= ((byte & 0x7F) as u64) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
            if shift > 63 {
                return Err(SigmaDecodeError::Overflow);
            }
        }
    }

    pub fn get_vlq_u32(&mut self) -> Result<u32, SigmaDecodeError> {
        u32::try_from(self.get_vlq_u64()?).map_err(|_| SigmaDecodeError::Overflow)
    }

    pub fn get_int(&mut self) -> Result<i32, SigmaDecodeError> {
        Ok(unzigzag_u32(self.get_vlq_u32()?))
    }

    pub fn get_long(&mut self) -> Result<i64, SigmaDecodeError> {
        Ok(unzigzag_u64(self.get_vlq_u64()?))
    }

    pub fn get_coll_byte(&mut self) -> Result<&'a [u8], SigmaDecodeError> {
        let len = self.get_vlq_u64()?;
        let len = usize::try_from(len).map_err(|_| SigmaDecodeError::Overflow)?;
        self.get_bytes(len)
    }

    /// Fail unless every byte has been consumed.
    pub fn finish(self) -> Result<(), SigmaDecodeError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(SigmaDecodeError::TrailingBytes(n)),
        }
    }
}
