//! ergo-tx: Unsigned transaction assembly for Ergo
//!
//! Builds box candidates, box and transaction ids, change outputs and
//! reduced transactions from a domain-level request. Hashing and chain
//! serialization go through an injected [`ChainPrimitives`] service.

pub mod address;
pub mod assembler;
pub mod box_builder;
pub mod constant;
pub mod entities;
pub mod error;
pub mod primitives;
pub mod proxy;
pub mod reduce;
pub mod sigma;
pub mod tokens;
pub mod wire;

#[cfg(feature = "ergo-lib")]
pub mod sigma_rust;

pub use address::{AddressBook, AddressCodec, AddressError};
#[cfg(feature = "ergo-lib")]
pub use address::Base58Addresses;
pub use assembler::{TxAssembler, UnsignedTransaction};
pub use box_builder::{build_candidate, compute_box_id};
pub use constant::{
    deserialize_constant, serialize_constant, Constant, ConstantError, ConstantKind,
    ParsedConstant, DECODE_PRIORITY,
};
pub use entities::*;
pub use error::TxBuildError;
pub use primitives::{ChainPrimitives, NativePrimitives, PrimitiveError};
pub use proxy::*;
pub use reduce::{BlockHeader, PreHeader, ReducedInput, ReducedTransaction, StateContext};
#[cfg(feature = "ergo-lib")]
pub use sigma_rust::SigmaRustPrimitives;
pub use tokens::TokenLedger;
