//! Token ledger
//!
//! Ordered token balances for one box. Entries are kept exactly as given;
//! duplicates are only combined by an explicit [`TokenLedger::merged`].

use assembler_core::constants::MAX_TOKENS_PER_BOX;
use assembler_core::TokenId;
use indexmap::IndexMap;
use num_bigint::BigInt;

use crate::entities::TokenAmount;
use crate::error::TxBuildError;
use crate::wire::WireToken;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenLedger {
    entries: Vec<WireToken>,
}

/// Token amount as a wire integer, rejecting anything outside `1..=i64::MAX`.
pub fn wire_amount(token_id: &TokenId, amount: &BigInt) -> Result<u64, TxBuildError> {
    u64::try_from(amount)
        .ok()
        .filter(|a| (1..=i64::MAX as u64).contains(a))
        .ok_or_else(|| TxBuildError::Overflow {
            token_id: token_id.to_string(),
            amount: amount.to_string(),
        })
}

impl TokenLedger {
    /// Build a ledger preserving order and every (id, amount) pair.
    pub fn from_amounts(amounts: &[TokenAmount]) -> Result<Self, TxBuildError> {
        let entries = amounts
            .iter()
            .map(|t| {
                let digest = t.token_id.to_digest().ok_or_else(|| TxBuildError::InvalidToken {
                    token_id: t.token_id.to_string(),
                    reason: "token id must be 32 bytes of hex".to_string(),
                })?;
                Ok(WireToken {
                    token_id: t.token_id.clone(),
                    digest,
                    amount: wire_amount(&t.token_id, &t.amount)?,
                })
            })
            .collect::<Result<Vec<_>, TxBuildError>>()?;
        Ok(Self { entries })
    }

    /// Combine entries sharing an id, in first-occurrence order.
    pub fn merged(&self) -> Result<Self, TxBuildError> {
        let mut totals: IndexMap<[u8; 32], WireToken> = IndexMap::new();
        for token in &self.entries {
            match totals.get_mut(&token.digest) {
                Some(total) => {
                    total.amount = total
                        .amount
                        .checked_add(token.amount)
                        .filter(|a| *a <= i64::MAX as u64)
                        .ok_or_else(|| TxBuildError::Overflow {
                            token_id: token.token_id.to_string(),
                            amount: (BigInt::from(total.amount) + token.amount).to_string(),
                        })?;
                }
                None => {
                    totals.insert(token.digest, token.clone());
                }
            }
        }
        Ok(Self {
            entries: totals.into_values().collect(),
        })
    }

    /// Fail if the ledger does not fit in a single box.
    pub fn check_box_limit(&self) -> Result<(), TxBuildError> {
        if self.entries.len() > MAX_TOKENS_PER_BOX {
            return Err(TxBuildError::TooManyTokens {
                count: self.entries.len(),
                max: MAX_TOKENS_PER_BOX,
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WireToken> {
        self.entries.iter()
    }

    pub fn into_tokens(self) -> Vec<WireToken> {
        self.entries
    }
}
