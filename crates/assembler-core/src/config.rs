//! Configuration types for the transaction assembler

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{MIN_VALUE_PER_BOX_BYTE, MINER_FEE_ERGO_TREE, SAFE_MIN_BOX_VALUE};
use crate::{ConfigError, Network};

/// Assembly policy applied to every transaction build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblerConfig {
    /// Network (mainnet or testnet), used for address decoding
    #[serde(default = "default_network")]
    pub network: Network,

    /// Minimum nanoERG per serialized byte of every constructed output
    #[serde(default = "default_min_value_per_byte")]
    pub min_value_per_byte: u64,

    /// Minimum value of the change output, in nanoERG
    #[serde(default = "default_min_change_value")]
    pub min_change_value: u64,

    /// ErgoTree (hex) that receives the miner fee
    #[serde(default = "default_miner_fee_ergo_tree")]
    pub miner_fee_ergo_tree: String,
}

fn default_network() -> Network {
    Network::Mainnet
}

fn default_min_value_per_byte() -> u64 {
    MIN_VALUE_PER_BOX_BYTE
}

fn default_min_change_value() -> u64 {
    SAFE_MIN_BOX_VALUE
}

fn default_miner_fee_ergo_tree() -> String {
    MINER_FEE_ERGO_TREE.to_string()
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            min_value_per_byte: default_min_value_per_byte(),
            min_change_value: default_min_change_value(),
            miner_fee_ergo_tree: default_miner_fee_ergo_tree(),
        }
    }
}

impl AssemblerConfig {
    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document; missing keys take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, choosing the format by extension (`.json`, otherwise TOML).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_toml_str(&text),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_change_value > i64::MAX as u64 {
            return Err(ConfigError::Invalid {
                field: "min_change_value",
                reason: "exceeds the chain's money range".to_string(),
            });
        }
        let tree = hex::decode(&self.miner_fee_ergo_tree).map_err(|e| ConfigError::Invalid {
            field: "miner_fee_ergo_tree",
            reason: e.to_string(),
        })?;
        if tree.is_empty() {
            return Err(ConfigError::Invalid {
                field: "miner_fee_ergo_tree",
                reason: "empty ErgoTree".to_string(),
            });
        }
        Ok(())
    }
}
