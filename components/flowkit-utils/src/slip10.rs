//! SLIP-10 hierarchical derivation for the secp256k1 and NIST P-256 curves.

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::{CryptoError, PrivateKey, SignatureAlgorithm};

type HmacSha512 = Hmac<Sha512>;

pub const DEFAULT_DERIVATION_PATH: &str = "m/44'/539'/0'/0/0";

const HARDENED_OFFSET: u32 = 0x8000_0000;

/// Parsed `m/a'/b/...` derivation path. Hardened indexes carry the high bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationPath(Vec<u32>);

impl DerivationPath {
    pub fn indexes(&self) -> &[u32] {
        &self.0
    }
}

impl Default for DerivationPath {
    fn default() -> Self {
        DerivationPath(vec![
            44 | HARDENED_OFFSET,
            539 | HARDENED_OFFSET,
            HARDENED_OFFSET,
            0,
            0,
        ])
    }
}

impl FromStr for DerivationPath {
    type Err = CryptoError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let invalid = || CryptoError::InvalidDerivationPath(path.to_string());
        let mut segments = path.trim().split('/');
        if segments.next() != Some("m") {
            return Err(invalid());
        }
        let mut indexes = vec![];
        for segment in segments {
            let (digits, hardened) = match segment
                .strip_suffix('\'')
                .or_else(|| segment.strip_suffix('h'))
            {
                Some(digits) => (digits, true),
                None => (segment, false),
            };
            let index: u32 = digits.parse().map_err(|_| invalid())?;
            if index >= HARDENED_OFFSET {
                return Err(invalid());
            }
            indexes.push(if hardened { index | HARDENED_OFFSET } else { index });
        }
        Ok(DerivationPath(indexes))
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for index in self.0.iter() {
            if index & HARDENED_OFFSET != 0 {
                write!(f, "/{}'", index & !HARDENED_OFFSET)?;
            } else {
                write!(f, "/{}", index)?;
            }
        }
        Ok(())
    }
}

fn hmac_sha512(key: &[u8], chunks: &[&[u8]]) -> Result<[u8; 64], CryptoError> {
    let mut mac = HmacSha512::new_from_slice(key)
        .map_err(|e| CryptoError::InvalidDerivationPath(e.to_string()))?;
    for chunk in chunks {
        mac.update(chunk);
    }
    let mut out = [0u8; 64];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

macro_rules! impl_slip10_curve {
    ($fn_name:ident, $curve:ident, $seed_key:expr) => {
        fn $fn_name(seed: &[u8], path: &DerivationPath) -> Result<Vec<u8>, CryptoError> {
            use $curve::elliptic_curve::sec1::ToEncodedPoint;
            use $curve::elliptic_curve::{Field, PrimeField};
            use $curve::{FieldBytes, Scalar, SecretKey};

            let parse_scalar = |bytes: &[u8]| -> Option<Scalar> {
                Option::from(Scalar::from_repr(FieldBytes::clone_from_slice(bytes)))
            };

            // Master key, retried on out of range values.
            let mut digest = hmac_sha512($seed_key, &[seed])?;
            let mut key = loop {
                match parse_scalar(&digest[..32]) {
                    Some(scalar) if !bool::from(scalar.is_zero()) => break scalar,
                    _ => digest = hmac_sha512($seed_key, &[&digest[..]])?,
                }
            };
            let mut chain_code = [0u8; 32];
            chain_code.copy_from_slice(&digest[32..]);

            for index in path.indexes() {
                let index_bytes = index.to_be_bytes();
                let mut data = if index & HARDENED_OFFSET != 0 {
                    let mut data = vec![0u8];
                    data.extend_from_slice(&key.to_repr());
                    data
                } else {
                    let secret = SecretKey::from_bytes(&key.to_repr())
                        .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
                    secret
                        .public_key()
                        .to_encoded_point(true)
                        .as_bytes()
                        .to_vec()
                };
                data.extend_from_slice(&index_bytes);

                let child = loop {
                    let digest = hmac_sha512(&chain_code, &[&data])?;
                    let candidate = parse_scalar(&digest[..32]).map(|tweak| tweak + key);
                    match candidate {
                        Some(child) if !bool::from(child.is_zero()) => {
                            chain_code.copy_from_slice(&digest[32..]);
                            break child;
                        }
                        _ => {
                            data = vec![1u8];
                            data.extend_from_slice(&digest[32..]);
                            data.extend_from_slice(&index_bytes);
                        }
                    }
                };
                key = child;
            }
            Ok(key.to_repr().to_vec())
        }
    };
}

impl_slip10_curve!(derive_secp256k1, k256, b"Bitcoin seed");
impl_slip10_curve!(derive_p256, p256, b"Nist256p1 seed");

/// Derives the private key found at `path` below `seed`, on the curve of `algo`.
pub fn derive_private_key(
    seed: &[u8],
    algo: SignatureAlgorithm,
    path: &DerivationPath,
) -> Result<PrivateKey, CryptoError> {
    let bytes = match algo {
        SignatureAlgorithm::EcdsaSecp256k1 => derive_secp256k1(seed, path)?,
        SignatureAlgorithm::EcdsaP256 => derive_p256(seed, path)?,
        SignatureAlgorithm::BlsBls12381 => {
            return Err(CryptoError::UnsupportedSignatureAlgorithm(
                algo.as_str().to_string(),
            ))
        }
    };
    PrivateKey::from_bytes(algo, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_renders_default_path() {
        let path: DerivationPath = DEFAULT_DERIVATION_PATH.parse().unwrap();
        assert_eq!(path, DerivationPath::default());
        assert_eq!(path.to_string(), DEFAULT_DERIVATION_PATH);
        assert_eq!(path.indexes()[0], 44 | HARDENED_OFFSET);
        assert_eq!(path.indexes()[4], 0);
    }

    #[test]
    fn rejects_malformed_paths() {
        assert!("44'/539'".parse::<DerivationPath>().is_err());
        assert!("m/abc".parse::<DerivationPath>().is_err());
        assert!("m/2147483648".parse::<DerivationPath>().is_err());
    }

    #[test]
    fn slip10_secp256k1_master_vector() {
        // SLIP-10 test vector 1 for secp256k1, chain m.
        let seed = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let key = derive_private_key(
            &seed,
            SignatureAlgorithm::EcdsaSecp256k1,
            &"m".parse().unwrap(),
        )
        .unwrap();
        assert_eq!(
            key.to_hex(),
            "e8f32e723decf4051aefac8e2c93c9c5b214313817cdb01a1494b917c8436b35"
        );
    }

    #[test]
    fn slip10_p256_master_vector() {
        // SLIP-10 test vector 1 for nist256p1, chain m.
        let seed = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let key =
            derive_private_key(&seed, SignatureAlgorithm::EcdsaP256, &"m".parse().unwrap())
                .unwrap();
        assert_eq!(
            key.to_hex(),
            "612091aaa12e22dd2abef664f8a01a82cae99ad7441b7ef8110424915c268bc2"
        );
    }

    #[test]
    fn slip10_secp256k1_hardened_child_vector() {
        // SLIP-10 test vector 1 for secp256k1, chain m/0H.
        let seed = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let key = derive_private_key(
            &seed,
            SignatureAlgorithm::EcdsaSecp256k1,
            &"m/0'".parse().unwrap(),
        )
        .unwrap();
        assert_eq!(
            key.to_hex(),
            "edb2e14f9ee77d26dd93b4ecede8d16ed408ce149b6cd80b0715a2d911a0afea"
        );
    }
}
