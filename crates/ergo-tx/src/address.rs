//! Ergo address resolution
//!
//! The assembler only needs an address when it pays change; everywhere else
//! addresses pass through untouched. [`AddressCodec`] turns one into the
//! ErgoTree bytes that guard the change box.

use std::collections::HashMap;
use std::path::Path;

use assembler_core::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("Unknown address: {0}")]
    Unknown(String),

    #[error("Invalid Ergo address: {0}")]
    InvalidAddress(String),
}

/// Resolves an address to the serialized ErgoTree it pays to.
pub trait AddressCodec: Send + Sync {
    fn ergo_tree(&self, address: &Address) -> Result<Vec<u8>, AddressError>;
}

/// Fixed address to ErgoTree table
///
/// Deserializes from a JSON object mapping address text to ErgoTree hex.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressBook(HashMap<Address, String>);

impl AddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: Address, ergo_tree_hex: impl Into<String>) {
        self.0.insert(address, ergo_tree_hex.into());
    }

    pub fn with(mut self, address: Address, ergo_tree_hex: impl Into<String>) -> Self {
        self.insert(address, ergo_tree_hex);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn from_json_str(s: &str) -> Result<Self, AddressError> {
        serde_json::from_str(s).map_err(|e| AddressError::InvalidAddress(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, AddressError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AddressError::Unknown(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }
}

impl AddressCodec for AddressBook {
    fn ergo_tree(&self, address: &Address) -> Result<Vec<u8>, AddressError> {
        let tree_hex = self
            .0
            .get(address)
            .ok_or_else(|| AddressError::Unknown(address.to_string()))?;
        hex::decode(tree_hex)
            .map_err(|e| AddressError::InvalidAddress(format!("{}: {}", address, e)))
    }
}

/// Base58 addresses decoded through sigma-rust
#[cfg(feature = "ergo-lib")]
#[derive(Debug, Clone, Copy)]
pub struct Base58Addresses {
    network: assembler_core::Network,
}

#[cfg(feature = "ergo-lib")]
impl Base58Addresses {
    pub fn new(network: assembler_core::Network) -> Self {
        Self { network }
    }
}

#[cfg(feature = "ergo-lib")]
impl AddressCodec for Base58Addresses {
    /// Tries the configured network's prefix first, then the other one.
    fn ergo_tree(&self, address: &Address) -> Result<Vec<u8>, AddressError> {
        use assembler_core::Network;
        use ergo_lib::ergotree_ir::chain::address::{AddressEncoder, NetworkPrefix};
        use ergo_lib::ergotree_ir::serialization::SigmaSerializable;

        let prefixes = match self.network {
            Network::Mainnet => [NetworkPrefix::Mainnet, NetworkPrefix::Testnet],
            Network::Testnet => [NetworkPrefix::Testnet, NetworkPrefix::Mainnet],
        };
        for prefix in prefixes {
            let encoder = AddressEncoder::new(prefix);
            if let Ok(addr) = encoder.parse_address_from_str(address.as_str()) {
                let tree = addr
                    .script()
                    .map_err(|e| AddressError::InvalidAddress(format!("{}: {}", address, e)))?;
                return tree
                    .sigma_serialize_bytes()
                    .map_err(|e| AddressError::InvalidAddress(format!("{}: {}", address, e)));
            }
        }

        Err(AddressError::InvalidAddress(address.to_string()))
    }
}
