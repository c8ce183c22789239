use bip39::Mnemonic;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::slip10::{derive_private_key, DerivationPath};
use crate::{CryptoError, PrivateKey, SignatureAlgorithm};

/// Minimum seed length accepted after BIP-39 expansion.
pub const MIN_MNEMONIC_SEED_LEN: usize = 16;

pub fn mnemonic_from_phrase(phrase: &str) -> Result<Mnemonic, CryptoError> {
    Mnemonic::parse(phrase).map_err(|e| CryptoError::InvalidMnemonic(e.to_string()))
}

/// Twelve words backed by 128 bits of OS entropy.
pub fn random_mnemonic() -> Result<Mnemonic, CryptoError> {
    let mut entropy = [0u8; 16];
    OsRng.fill_bytes(&mut entropy);
    Mnemonic::from_entropy(&entropy).map_err(|e| CryptoError::InvalidMnemonic(e.to_string()))
}

/// Random seed suitable for [`PrivateKey::from_seed`].
pub fn random_seed(algo: SignatureAlgorithm) -> Vec<u8> {
    let mut seed = vec![0u8; algo.min_seed_len()];
    OsRng.fill_bytes(&mut seed);
    seed
}

pub fn private_key_from_mnemonic(
    phrase: &str,
    algo: SignatureAlgorithm,
    path: &DerivationPath,
) -> Result<PrivateKey, CryptoError> {
    let mnemonic = mnemonic_from_phrase(phrase)?;
    let seed = mnemonic.to_seed("");
    if seed.len() < MIN_MNEMONIC_SEED_LEN {
        return Err(CryptoError::SeedTooShort {
            required: MIN_MNEMONIC_SEED_LEN,
            provided: seed.len(),
        });
    }
    derive_private_key(&seed, algo, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn random_mnemonic_has_twelve_words() {
        let mnemonic = random_mnemonic().unwrap();
        assert_eq!(mnemonic.to_string().split(' ').count(), 12);
        assert!(mnemonic_from_phrase(&mnemonic.to_string()).is_ok());
    }

    #[test]
    fn derivation_is_stable_per_curve() {
        let path = DerivationPath::default();
        let k1 = private_key_from_mnemonic(PHRASE, SignatureAlgorithm::EcdsaSecp256k1, &path)
            .unwrap();
        let k2 = private_key_from_mnemonic(PHRASE, SignatureAlgorithm::EcdsaSecp256k1, &path)
            .unwrap();
        let p = private_key_from_mnemonic(PHRASE, SignatureAlgorithm::EcdsaP256, &path).unwrap();
        assert_eq!(k1, k2);
        assert_eq!(p.algorithm(), SignatureAlgorithm::EcdsaP256);
        assert_ne!(k1.to_bytes(), p.to_bytes());
    }

    #[test]
    fn invalid_phrase_is_rejected() {
        let err = private_key_from_mnemonic(
            "not a real mnemonic",
            SignatureAlgorithm::EcdsaP256,
            &DerivationPath::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CryptoError::InvalidMnemonic(_)));
    }

    #[test]
    fn bls_derivation_is_unsupported() {
        assert!(private_key_from_mnemonic(
            PHRASE,
            SignatureAlgorithm::BlsBls12381,
            &DerivationPath::default()
        )
        .is_err());
    }
}
