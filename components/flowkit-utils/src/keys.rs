use std::fmt;

use hmac::{Hmac, Mac};
use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use sha2::Sha512;

use crate::{CryptoError, HashAlgorithm, SignatureAlgorithm};

type HmacSha512 = Hmac<Sha512>;

const KEYGEN_DOMAIN: &[u8] = b"FLOW-V0.0-keygen";

/// ECDSA private key on one of the two curves account keys can use.
#[derive(Clone)]
pub enum PrivateKey {
    P256(p256::ecdsa::SigningKey),
    Secp256k1(k256::ecdsa::SigningKey),
}

impl PrivateKey {
    /// Deterministically derives a key from `seed`.
    ///
    /// The seed must carry at least [`SignatureAlgorithm::min_seed_len`] bytes.
    pub fn from_seed(algo: SignatureAlgorithm, seed: &[u8]) -> Result<PrivateKey, CryptoError> {
        if !algo.is_ecdsa() {
            return Err(CryptoError::UnsupportedSignatureAlgorithm(
                algo.as_str().to_string(),
            ));
        }
        if seed.len() < algo.min_seed_len() {
            return Err(CryptoError::SeedTooShort {
                required: algo.min_seed_len(),
                provided: seed.len(),
            });
        }
        if seed.len() > algo.max_seed_len() {
            return Err(CryptoError::SeedTooLong {
                max: algo.max_seed_len(),
                provided: seed.len(),
            });
        }

        let mut counter: u32 = 0;
        loop {
            let mut mac = HmacSha512::new_from_slice(KEYGEN_DOMAIN)
                .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
            mac.update(algo.as_str().as_bytes());
            mac.update(seed);
            mac.update(&counter.to_be_bytes());
            let okm = mac.finalize().into_bytes();
            if let Ok(key) = PrivateKey::from_bytes(algo, &okm[..32]) {
                return Ok(key);
            }
            counter += 1;
        }
    }

    pub fn from_bytes(algo: SignatureAlgorithm, bytes: &[u8]) -> Result<PrivateKey, CryptoError> {
        match algo {
            SignatureAlgorithm::EcdsaP256 => p256::ecdsa::SigningKey::from_slice(bytes)
                .map(PrivateKey::P256)
                .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string())),
            SignatureAlgorithm::EcdsaSecp256k1 => k256::ecdsa::SigningKey::from_slice(bytes)
                .map(PrivateKey::Secp256k1)
                .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string())),
            SignatureAlgorithm::BlsBls12381 => Err(CryptoError::UnsupportedSignatureAlgorithm(
                algo.as_str().to_string(),
            )),
        }
    }

    /// Parses a hex encoded key, with or without the `0x` prefix.
    pub fn from_hex(algo: SignatureAlgorithm, value: &str) -> Result<PrivateKey, CryptoError> {
        let trimmed = value.trim();
        let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes =
            hex::decode(trimmed).map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
        PrivateKey::from_bytes(algo, &bytes)
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        match self {
            PrivateKey::P256(_) => SignatureAlgorithm::EcdsaP256,
            PrivateKey::Secp256k1(_) => SignatureAlgorithm::EcdsaSecp256k1,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            PrivateKey::P256(key) => key.to_bytes().to_vec(),
            PrivateKey::Secp256k1(key) => key.to_bytes().to_vec(),
        }
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::P256(key) => PublicKey::P256(key.verifying_key().clone()),
            PrivateKey::Secp256k1(key) => PublicKey::Secp256k1(key.verifying_key().clone()),
        }
    }

    /// Signs the `hash` digest of `message`, returning `r || s` (64 bytes).
    pub fn sign(&self, message: &[u8], hash: HashAlgorithm) -> Result<Vec<u8>, CryptoError> {
        let digest = hash.digest(message)?;
        match self {
            PrivateKey::P256(key) => {
                let signature: p256::ecdsa::Signature = key
                    .sign_prehash(&digest)
                    .map_err(|e| CryptoError::Signing(e.to_string()))?;
                Ok(signature.to_bytes().to_vec())
            }
            PrivateKey::Secp256k1(key) => {
                let signature: k256::ecdsa::Signature = key
                    .sign_prehash(&digest)
                    .map_err(|e| CryptoError::Signing(e.to_string()))?;
                Ok(signature.to_bytes().to_vec())
            }
        }
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.algorithm() == other.algorithm() && self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PrivateKey {}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({}, {})", self.algorithm(), self.public_key())
    }
}

/// ECDSA public key, rendered as the 64-byte uncompressed point without its
/// SEC1 tag.
#[derive(Clone, PartialEq, Eq)]
pub enum PublicKey {
    P256(p256::ecdsa::VerifyingKey),
    Secp256k1(k256::ecdsa::VerifyingKey),
}

impl PublicKey {
    pub fn from_bytes(algo: SignatureAlgorithm, bytes: &[u8]) -> Result<PublicKey, CryptoError> {
        let mut sec1 = Vec::with_capacity(65);
        match bytes.len() {
            64 => {
                sec1.push(0x04);
                sec1.extend_from_slice(bytes);
            }
            33 | 65 => sec1.extend_from_slice(bytes),
            len => {
                return Err(CryptoError::InvalidPublicKey(format!(
                    "unexpected public key length {len}"
                )))
            }
        }
        match algo {
            SignatureAlgorithm::EcdsaP256 => p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                .map(PublicKey::P256)
                .map_err(|e| CryptoError::InvalidPublicKey(e.to_string())),
            SignatureAlgorithm::EcdsaSecp256k1 => {
                k256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                    .map(PublicKey::Secp256k1)
                    .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
            }
            SignatureAlgorithm::BlsBls12381 => Err(CryptoError::UnsupportedSignatureAlgorithm(
                algo.as_str().to_string(),
            )),
        }
    }

    pub fn from_hex(algo: SignatureAlgorithm, value: &str) -> Result<PublicKey, CryptoError> {
        let trimmed = value.trim();
        let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes =
            hex::decode(trimmed).map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        PublicKey::from_bytes(algo, &bytes)
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        match self {
            PublicKey::P256(_) => SignatureAlgorithm::EcdsaP256,
            PublicKey::Secp256k1(_) => SignatureAlgorithm::EcdsaSecp256k1,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let point = match self {
            PublicKey::P256(key) => key.to_encoded_point(false).as_bytes().to_vec(),
            PublicKey::Secp256k1(key) => key.to_encoded_point(false).as_bytes().to_vec(),
        };
        point[1..].to_vec()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn verify(
        &self,
        signature: &[u8],
        message: &[u8],
        hash: HashAlgorithm,
    ) -> Result<bool, CryptoError> {
        let digest = hash.digest(message)?;
        let valid = match self {
            PublicKey::P256(key) => {
                let signature = p256::ecdsa::Signature::from_slice(signature)
                    .map_err(|e| CryptoError::Signing(e.to_string()))?;
                key.verify_prehash(&digest, &signature).is_ok()
            }
            PublicKey::Secp256k1(key) => {
                let signature = k256::ecdsa::Signature::from_slice(signature)
                    .map_err(|e| CryptoError::Signing(e.to_string()))?;
                key.verify_prehash(&digest, &signature).is_ok()
            }
        };
        Ok(valid)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}, 0x{})", self.algorithm(), self.to_hex())
    }
}

/// Anything able to produce signatures for an account key.
pub trait Signer: Send + Sync {
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// Signer backed by a private key held in memory.
#[derive(Clone, Debug)]
pub struct InMemorySigner {
    pub private_key: PrivateKey,
    pub hash_algo: HashAlgorithm,
}

impl InMemorySigner {
    pub fn new(private_key: PrivateKey, hash_algo: HashAlgorithm) -> InMemorySigner {
        InMemorySigner {
            private_key,
            hash_algo,
        }
    }
}

impl Signer for InMemorySigner {
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.private_key.sign(message, self.hash_algo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &[u8] = b"elephant ears space cowboy octopus rodeo potato cannon pineapple";

    #[test]
    fn seed_shorter_than_minimum_is_rejected() {
        let err = PrivateKey::from_seed(SignatureAlgorithm::EcdsaP256, &[1u8; 31]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "seed too short, required at least 32 bytes, provided 31"
        );
        assert!(PrivateKey::from_seed(SignatureAlgorithm::EcdsaP256, &[1u8; 32]).is_ok());
    }

    #[test]
    fn key_generation_is_deterministic() {
        let a = PrivateKey::from_seed(SignatureAlgorithm::EcdsaSecp256k1, SEED).unwrap();
        let b = PrivateKey::from_seed(SignatureAlgorithm::EcdsaSecp256k1, SEED).unwrap();
        assert_eq!(a, b);
        let c = PrivateKey::from_seed(SignatureAlgorithm::EcdsaP256, SEED).unwrap();
        assert_ne!(a.to_bytes(), c.to_bytes());
    }

    #[test]
    fn hex_round_trip_and_public_key_width() {
        let key = PrivateKey::from_seed(SignatureAlgorithm::EcdsaP256, SEED).unwrap();
        let parsed =
            PrivateKey::from_hex(SignatureAlgorithm::EcdsaP256, &format!("0x{}", key.to_hex()))
                .unwrap();
        assert_eq!(key, parsed);
        let public = key.public_key();
        assert_eq!(public.to_bytes().len(), 64);
        assert_eq!(
            PublicKey::from_hex(SignatureAlgorithm::EcdsaP256, &public.to_hex()).unwrap(),
            public
        );
    }

    #[test]
    fn signatures_verify_against_public_key() {
        for algo in [
            SignatureAlgorithm::EcdsaP256,
            SignatureAlgorithm::EcdsaSecp256k1,
        ] {
            let key = PrivateKey::from_seed(algo, SEED).unwrap();
            let signer = InMemorySigner::new(key.clone(), HashAlgorithm::Sha3_256);
            let signature = signer.sign(b"hello").unwrap();
            assert_eq!(signature.len(), 64);
            assert!(key
                .public_key()
                .verify(&signature, b"hello", HashAlgorithm::Sha3_256)
                .unwrap());
            assert!(!key
                .public_key()
                .verify(&signature, b"world", HashAlgorithm::Sha3_256)
                .unwrap());
        }
    }

    #[test]
    fn bls_keys_are_not_generated() {
        assert!(PrivateKey::from_seed(SignatureAlgorithm::BlsBls12381, SEED).is_err());
    }
}
