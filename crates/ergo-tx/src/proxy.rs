//! EIP-12 JSON proxies
//!
//! Wire-friendly mirrors of the domain records: camelCase keys, every amount
//! as a decimal string so no JSON number ever loses precision. Mapping to a
//! proxy is total; mapping back fails only on a malformed decimal.

use std::collections::BTreeMap;
use std::str::FromStr;

use assembler_core::{Address, BoxId, HexString, TokenId, TxId};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entities::{
    BoxAssets, BoxSelection, DataInput, ErgoBox, ErgoBoxCandidate, ErgoTx, Input, TokenAmount,
    TxRequest,
};

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Invalid decimal for {field}: {value:?}")]
    InvalidDecimal { field: &'static str, value: String },
}

fn decimal(field: &'static str, value: &str) -> Result<BigInt, ProxyError> {
    BigInt::from_str(value).map_err(|_| ProxyError::InvalidDecimal {
        field,
        value: value.to_string(),
    })
}

/// A domain record with a JSON proxy counterpart
pub trait Proxied: Sized {
    type Proxy;

    fn to_proxy(&self) -> Self::Proxy;

    fn from_proxy(proxy: &Self::Proxy) -> Result<Self, ProxyError>;
}

fn to_proxies<T: Proxied>(items: &[T]) -> Vec<T::Proxy> {
    items.iter().map(Proxied::to_proxy).collect()
}

fn from_proxies<T: Proxied>(proxies: &[T::Proxy]) -> Result<Vec<T>, ProxyError> {
    proxies.iter().map(T::from_proxy).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAmountProxy {
    pub token_id: TokenId,
    pub amount: String,
}

impl Proxied for TokenAmount {
    type Proxy = TokenAmountProxy;

    fn to_proxy(&self) -> TokenAmountProxy {
        TokenAmountProxy {
            token_id: self.token_id.clone(),
            amount: self.amount.to_string(),
        }
    }

    fn from_proxy(proxy: &TokenAmountProxy) -> Result<Self, ProxyError> {
        Ok(Self::new(proxy.token_id.clone(), decimal("amount", &proxy.amount)?))
    }
}

/// EIP-12 output box candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErgoBoxCandidateProxy {
    pub value: String,
    pub ergo_tree: HexString,
    pub creation_height: u32,
    #[serde(default)]
    pub assets: Vec<TokenAmountProxy>,
    #[serde(default)]
    pub additional_registers: BTreeMap<String, HexString>,
}

impl Proxied for ErgoBoxCandidate {
    type Proxy = ErgoBoxCandidateProxy;

    fn to_proxy(&self) -> ErgoBoxCandidateProxy {
        ErgoBoxCandidateProxy {
            value: self.value.to_string(),
            ergo_tree: self.ergo_tree.clone(),
            creation_height: self.creation_height,
            assets: to_proxies(&self.assets),
            additional_registers: self.additional_registers.clone(),
        }
    }

    fn from_proxy(proxy: &ErgoBoxCandidateProxy) -> Result<Self, ProxyError> {
        Ok(Self {
            value: decimal("value", &proxy.value)?,
            ergo_tree: proxy.ergo_tree.clone(),
            creation_height: proxy.creation_height,
            assets: from_proxies(&proxy.assets)?,
            additional_registers: proxy.additional_registers.clone(),
        })
    }
}

/// EIP-12 box with its id and origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErgoBoxProxy {
    pub box_id: BoxId,
    pub value: String,
    pub ergo_tree: HexString,
    pub creation_height: u32,
    #[serde(default)]
    pub assets: Vec<TokenAmountProxy>,
    #[serde(default)]
    pub additional_registers: BTreeMap<String, HexString>,
    /// Transaction ID where this box was created
    pub transaction_id: TxId,
    /// Output index in that transaction
    pub index: u16,
}

impl Proxied for ErgoBox {
    type Proxy = ErgoBoxProxy;

    fn to_proxy(&self) -> ErgoBoxProxy {
        ErgoBoxProxy {
            box_id: self.box_id.clone(),
            value: self.value.to_string(),
            ergo_tree: self.ergo_tree.clone(),
            creation_height: self.creation_height,
            assets: to_proxies(&self.assets),
            additional_registers: self.additional_registers.clone(),
            transaction_id: self.transaction_id.clone(),
            index: self.index,
        }
    }

    fn from_proxy(proxy: &ErgoBoxProxy) -> Result<Self, ProxyError> {
        Ok(Self {
            box_id: proxy.box_id.clone(),
            value: decimal("value", &proxy.value)?,
            ergo_tree: proxy.ergo_tree.clone(),
            creation_height: proxy.creation_height,
            assets: from_proxies(&proxy.assets)?,
            additional_registers: proxy.additional_registers.clone(),
            transaction_id: proxy.transaction_id.clone(),
            index: proxy.index,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxAssetsProxy {
    pub value: String,
    #[serde(default)]
    pub assets: Vec<TokenAmountProxy>,
}

impl Proxied for BoxAssets {
    type Proxy = BoxAssetsProxy;

    fn to_proxy(&self) -> BoxAssetsProxy {
        BoxAssetsProxy {
            value: self.value.to_string(),
            assets: to_proxies(&self.tokens),
        }
    }

    fn from_proxy(proxy: &BoxAssetsProxy) -> Result<Self, ProxyError> {
        Ok(Self {
            value: decimal("change value", &proxy.value)?,
            tokens: from_proxies(&proxy.assets)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxSelectionProxy {
    pub inputs: Vec<ErgoBoxProxy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<BoxAssetsProxy>,
}

impl Proxied for BoxSelection {
    type Proxy = BoxSelectionProxy;

    fn to_proxy(&self) -> BoxSelectionProxy {
        BoxSelectionProxy {
            inputs: to_proxies(&self.inputs),
            change: self.change.as_ref().map(Proxied::to_proxy),
        }
    }

    fn from_proxy(proxy: &BoxSelectionProxy) -> Result<Self, ProxyError> {
        Ok(Self {
            inputs: from_proxies(&proxy.inputs)?,
            change: proxy.change.as_ref().map(BoxAssets::from_proxy).transpose()?,
        })
    }
}

/// Assembly request as submitted over JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxRequestProxy {
    pub inputs: BoxSelectionProxy,
    #[serde(default)]
    pub data_inputs: Vec<ErgoBoxProxy>,
    pub outputs: Vec<ErgoBoxCandidateProxy>,
    #[serde(default, rename = "feeNErgs", skip_serializing_if = "Option::is_none")]
    pub fee_nergs: Option<String>,
    pub change_address: Address,
}

impl Proxied for TxRequest {
    type Proxy = TxRequestProxy;

    fn to_proxy(&self) -> TxRequestProxy {
        TxRequestProxy {
            inputs: self.inputs.to_proxy(),
            data_inputs: to_proxies(&self.data_inputs),
            outputs: to_proxies(&self.outputs),
            fee_nergs: self.fee_nergs.as_ref().map(BigInt::to_string),
            change_address: self.change_address.clone(),
        }
    }

    fn from_proxy(proxy: &TxRequestProxy) -> Result<Self, ProxyError> {
        Ok(Self {
            inputs: BoxSelection::from_proxy(&proxy.inputs)?,
            data_inputs: from_proxies(&proxy.data_inputs)?,
            outputs: from_proxies(&proxy.outputs)?,
            fee_nergs: proxy
                .fee_nergs
                .as_deref()
                .map(|fee| decimal("feeNErgs", fee))
                .transpose()?,
            change_address: proxy.change_address.clone(),
        })
    }
}

/// Unsigned transaction as JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErgoTxProxy {
    pub id: TxId,
    pub inputs: Vec<Input>,
    pub data_inputs: Vec<DataInput>,
    pub outputs: Vec<ErgoBoxProxy>,
    pub size: usize,
}

impl Proxied for ErgoTx {
    type Proxy = ErgoTxProxy;

    fn to_proxy(&self) -> ErgoTxProxy {
        ErgoTxProxy {
            id: self.id.clone(),
            inputs: self.inputs.clone(),
            data_inputs: self.data_inputs.clone(),
            outputs: to_proxies(&self.outputs),
            size: self.size,
        }
    }

    fn from_proxy(proxy: &ErgoTxProxy) -> Result<Self, ProxyError> {
        Ok(Self {
            id: proxy.id.clone(),
            inputs: proxy.inputs.clone(),
            data_inputs: proxy.data_inputs.clone(),
            outputs: from_proxies(&proxy.outputs)?,
            size: proxy.size,
        })
    }
}

impl TxRequestProxy {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl ErgoTxProxy {
    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty JSON string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
