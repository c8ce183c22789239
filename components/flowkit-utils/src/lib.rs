pub extern crate bip39;

mod algorithms;
mod keys;
mod mnemonic;
pub mod slip10;

pub use algorithms::{HashAlgorithm, SignatureAlgorithm};
pub use keys::{InMemorySigner, PrivateKey, PublicKey, Signer};
pub use mnemonic::{
    mnemonic_from_phrase, private_key_from_mnemonic, random_mnemonic, random_seed,
    MIN_MNEMONIC_SEED_LEN,
};
pub use slip10::{DerivationPath, DEFAULT_DERIVATION_PATH};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("unsupported signature algorithm {0}")]
    UnsupportedSignatureAlgorithm(String),
    #[error("unsupported hash algorithm {0}")]
    UnsupportedHashAlgorithm(String),
    #[error("signature algorithm {sig_algo} is not compatible with hash algorithm {hash_algo}")]
    IncompatibleAlgorithms {
        sig_algo: SignatureAlgorithm,
        hash_algo: HashAlgorithm,
    },
    #[error("seed too short, required at least {required} bytes, provided {provided}")]
    SeedTooShort { required: usize, provided: usize },
    #[error("seed too long, at most {max} bytes allowed, provided {provided}")]
    SeedTooLong { max: usize, provided: usize },
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("invalid derivation path {0}")]
    InvalidDerivationPath(String),
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Fails unless `sig_algo` keys may sign `hash_algo` digests.
pub fn check_compatibility(
    sig_algo: SignatureAlgorithm,
    hash_algo: HashAlgorithm,
) -> Result<(), CryptoError> {
    if sig_algo.is_compatible_with(hash_algo) {
        Ok(())
    } else {
        Err(CryptoError::IncompatibleAlgorithms {
            sig_algo,
            hash_algo,
        })
    }
}
