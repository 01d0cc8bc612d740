//! Error types for transaction assembly

use thiserror::Error;

use crate::address::AddressError;
use crate::constant::ConstantError;
use crate::primitives::PrimitiveError;

/// Failure of a single build. Every variant is a deterministic function of
/// the input; nothing is retried and no partial transaction is returned.
#[derive(Debug, Error)]
pub enum TxBuildError {
    #[error("Invalid value for {context}: {value} is outside 1..=i64::MAX nanoERG")]
    InvalidValue { context: String, value: String },

    #[error("Invalid script: {0}")]
    InvalidScript(String),

    #[error("Invalid register {register}: {reason}")]
    InvalidRegister { register: String, reason: String },

    #[error("Invalid fee: {0}")]
    InvalidFee(String),

    #[error("Output {output} value {value} nanoERG is below minimum box value of {min} nanoERG")]
    BelowMinimumValue { output: usize, value: u64, min: u64 },

    #[error("Token {token_id} amount {amount} is outside 1..=i64::MAX")]
    Overflow { token_id: String, amount: String },

    #[error("Invalid token {token_id}: {reason}")]
    InvalidToken { token_id: String, reason: String },

    #[error("Too many tokens in one box: {count} exceeds maximum of {max}")]
    TooManyTokens { count: usize, max: usize },

    #[error("Box selection has no inputs")]
    EmptyInputs,

    #[error("Box {box_id} is selected more than once")]
    DuplicateInput { box_id: String },

    #[error("Invalid {kind} id: {value}")]
    InvalidId { kind: &'static str, value: String },

    #[error("Box id mismatch: box claims {claimed}, its contents hash to {derived}")]
    BoxIdMismatch { claimed: String, derived: String },

    #[error("Invalid change address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("Insufficient inputs: need {required} nanoERG, have {available}")]
    InsufficientInputs { required: u64, available: u64 },

    #[error("Insufficient tokens ({token_id}): need {required}, have {available}")]
    InsufficientTokens {
        token_id: String,
        required: u64,
        available: u64,
    },

    #[error("Invalid state context: {0}")]
    StateContext(String),

    #[error(transparent)]
    Constant(#[from] ConstantError),

    #[error("Primitive service failed: {0}")]
    Primitive(#[from] PrimitiveError),
}

impl TxBuildError {
    /// Stable machine-readable code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidValue { .. } => "invalid_value",
            Self::InvalidScript(_) => "invalid_script",
            Self::InvalidRegister { .. } => "invalid_register",
            Self::InvalidFee(_) => "invalid_fee",
            Self::BelowMinimumValue { .. } => "below_minimum_value",
            Self::Overflow { .. } => "overflow",
            Self::InvalidToken { .. } => "invalid_token",
            Self::TooManyTokens { .. } => "too_many_tokens",
            Self::EmptyInputs => "empty_inputs",
            Self::DuplicateInput { .. } => "duplicate_input",
            Self::InvalidId { .. } => "invalid_id",
            Self::BoxIdMismatch { .. } => "box_id_mismatch",
            Self::InvalidAddress(_) => "invalid_address",
            Self::InsufficientInputs { .. } => "insufficient_inputs",
            Self::InsufficientTokens { .. } => "insufficient_tokens",
            Self::StateContext(_) => "state_context",
            Self::Constant(_) => "decode_failed",
            Self::Primitive(_) => "primitive",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = TxBuildError::BelowMinimumValue {
            output: 1,
            value: 10,
            min: 360,
        };
        assert_eq!(err.error_code(), "below_minimum_value");
        assert!(err.to_string().contains("Output 1"));

        let err: TxBuildError = ConstantError::DecodeFailed("x".into()).into();
        assert_eq!(err.error_code(), "decode_failed");

        let err = TxBuildError::DuplicateInput {
            box_id: "ab".repeat(32),
        };
        assert_eq!(err.error_code(), "duplicate_input");
        assert!(err.to_string().contains(&"ab".repeat(32)));
    }
}
