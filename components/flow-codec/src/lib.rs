pub extern crate rlp;

#[macro_use]
mod macros;

mod address;
pub mod cadence;
mod transaction;

pub use address::{Address, ChainId, Identifier, ADDRESS_LENGTH, IDENTIFIER_LENGTH};
pub use cadence::{parse_json_arguments, Composite, CompositeKind, Value};
pub use transaction::{ProposalKey, Transaction, TransactionSignature, TRANSACTION_DOMAIN_TAG};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("invalid {kind} {value}")]
    InvalidHex { kind: &'static str, value: String },
    #[error("rlp decoding failed: {0}")]
    Rlp(String),
    #[error("cadence value: {0}")]
    Cadence(String),
    #[error("{0}")]
    Message(String),
}

impl From<rlp::DecoderError> for CodecError {
    fn from(e: rlp::DecoderError) -> Self {
        CodecError::Rlp(e.to_string())
    }
}
