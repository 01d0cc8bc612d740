//! Core type definitions shared by the assembler crates

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hex text as it appears in proxies, registers and ErgoTrees.
pub type HexString = String;

/// Block height
pub type BlockHeight = u32;

macro_rules! digest_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Build from raw digest bytes (lowercase hex).
            pub fn from_digest(bytes: [u8; 32]) -> Self {
                Self(hex::encode(bytes))
            }

            /// Raw digest bytes, or `None` when the text is not 32 bytes of hex.
            pub fn to_digest(&self) -> Option<[u8; 32]> {
                hex::decode(&self.0).ok()?.try_into().ok()
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

digest_id!(
    /// Box ID (32 bytes, hex-encoded)
    BoxId
);

digest_id!(
    /// Token ID (32 bytes, hex-encoded)
    TokenId
);

digest_id!(
    /// Transaction ID (32 bytes, hex-encoded)
    TxId
);

impl TxId {
    /// All-zero id, used when sizing a box that has no owning transaction yet.
    pub fn zero() -> Self {
        Self::from_digest([0u8; 32])
    }
}

impl From<&BoxId> for TokenId {
    /// A newly minted token takes the id of the transaction's first input.
    fn from(id: &BoxId) -> Self {
        Self(id.0.clone())
    }
}

/// Ergo address (P2PK or P2S), base58 text passed through unmodified
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Network type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Constants
pub mod constants {
    /// Minimum nanoERG per serialized box byte (chain storage rent rule)
    pub const MIN_VALUE_PER_BOX_BYTE: u64 = 360;

    /// Minimum value of a change box (0.001 ERG)
    pub const SAFE_MIN_BOX_VALUE: u64 = 1_000_000;

    /// Maximum number of distinct token entries in a single box
    pub const MAX_TOKENS_PER_BOX: usize = 122;

    /// Number of most recent headers kept in a state context
    pub const STATE_CONTEXT_HEADERS: usize = 10;

    /// Miner-fee ErgoTree: the block's miner collects it into a height-locked reward box
    pub const MINER_FEE_ERGO_TREE: &str = "1005040004000e36100204a00b08cd0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798ea02d192a39a8cc7a701730073011001020402d19683030193a38cc7b2a57300000193c2b2a57301007473027303830108cdeeac93b1a57304";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_serializes_as_plain_string() {
        let addr = Address::new("9fRusAarL1KkrWQVsxSRVYnvWxaAT2A96cKtNn9tvPh5XUyCisd");
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"9fRusAarL1KkrWQVsxSRVYnvWxaAT2A96cKtNn9tvPh5XUyCisd\"");
    }

    #[test]
    fn test_digest_roundtrip() {
        let bytes = [0xabu8; 32];
        let id = BoxId::from_digest(bytes);
        assert_eq!(id.as_str().len(), 64);
        assert_eq!(id.to_digest(), Some(bytes));
    }

    #[test]
    fn test_digest_rejects_bad_text() {
        assert_eq!(TxId::new("xyz").to_digest(), None);
        assert_eq!(TokenId::new("abcd").to_digest(), None);
    }

    #[test]
    fn test_zero_tx_id() {
        assert_eq!(TxId::zero().as_str(), "0".repeat(64));
    }

    #[test]
    fn test_network_display() {
        assert_eq!(Network::Mainnet.as_str(), "mainnet");
        assert_eq!(Network::Testnet.to_string(), "testnet");
    }
}
