use std::fmt;
use std::str::FromStr;

use sha2::Digest;

use crate::CryptoError;

/// Signature schemes an account key can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignatureAlgorithm {
    #[default]
    EcdsaP256,
    EcdsaSecp256k1,
    BlsBls12381,
}

impl SignatureAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureAlgorithm::EcdsaP256 => "ECDSA_P256",
            SignatureAlgorithm::EcdsaSecp256k1 => "ECDSA_secp256k1",
            SignatureAlgorithm::BlsBls12381 => "BLS_BLS12_381",
        }
    }

    /// Numeric code used on the wire by account keys.
    pub fn code(&self) -> u32 {
        match self {
            SignatureAlgorithm::EcdsaP256 => 2,
            SignatureAlgorithm::EcdsaSecp256k1 => 3,
            SignatureAlgorithm::BlsBls12381 => 4,
        }
    }

    pub fn from_code(code: u32) -> Result<SignatureAlgorithm, CryptoError> {
        match code {
            2 => Ok(SignatureAlgorithm::EcdsaP256),
            3 => Ok(SignatureAlgorithm::EcdsaSecp256k1),
            4 => Ok(SignatureAlgorithm::BlsBls12381),
            _ => Err(CryptoError::UnsupportedSignatureAlgorithm(code.to_string())),
        }
    }

    pub fn min_seed_len(&self) -> usize {
        32
    }

    pub fn max_seed_len(&self) -> usize {
        256
    }

    pub fn is_ecdsa(&self) -> bool {
        !matches!(self, SignatureAlgorithm::BlsBls12381)
    }

    /// Whether a key of this scheme may be used with the given hasher.
    pub fn is_compatible_with(&self, hash: HashAlgorithm) -> bool {
        match self {
            SignatureAlgorithm::EcdsaP256 | SignatureAlgorithm::EcdsaSecp256k1 => {
                matches!(hash, HashAlgorithm::Sha2_256 | HashAlgorithm::Sha3_256)
            }
            SignatureAlgorithm::BlsBls12381 => matches!(hash, HashAlgorithm::Kmac128),
        }
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = CryptoError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_uppercase().as_str() {
            "ECDSA_P256" | "ECDSA_P-256" | "P256" => Ok(SignatureAlgorithm::EcdsaP256),
            "ECDSA_SECP256K1" | "SECP256K1" => Ok(SignatureAlgorithm::EcdsaSecp256k1),
            "BLS_BLS12_381" | "BLS_BLS12381" => Ok(SignatureAlgorithm::BlsBls12381),
            _ => Err(CryptoError::UnsupportedSignatureAlgorithm(value.to_string())),
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Hashers used to produce the digest an account key signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    Sha2_256,
    #[default]
    Sha3_256,
    Kmac128,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha2_256 => "SHA2_256",
            HashAlgorithm::Sha3_256 => "SHA3_256",
            HashAlgorithm::Kmac128 => "KMAC128_BLS_BLS12_381",
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            HashAlgorithm::Sha2_256 => 1,
            HashAlgorithm::Sha3_256 => 3,
            HashAlgorithm::Kmac128 => 5,
        }
    }

    pub fn from_code(code: u32) -> Result<HashAlgorithm, CryptoError> {
        match code {
            1 => Ok(HashAlgorithm::Sha2_256),
            3 => Ok(HashAlgorithm::Sha3_256),
            5 => Ok(HashAlgorithm::Kmac128),
            _ => Err(CryptoError::UnsupportedHashAlgorithm(code.to_string())),
        }
    }

    /// 32-byte digest of `message`.
    pub fn digest(&self, message: &[u8]) -> Result<[u8; 32], CryptoError> {
        let mut out = [0u8; 32];
        match self {
            HashAlgorithm::Sha2_256 => out.copy_from_slice(&sha2::Sha256::digest(message)),
            HashAlgorithm::Sha3_256 => out.copy_from_slice(&sha3::Sha3_256::digest(message)),
            HashAlgorithm::Kmac128 => {
                return Err(CryptoError::UnsupportedHashAlgorithm(
                    self.as_str().to_string(),
                ))
            }
        }
        Ok(out)
    }
}

impl FromStr for HashAlgorithm {
    type Err = CryptoError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_uppercase().as_str() {
            "SHA2_256" | "SHA256" => Ok(HashAlgorithm::Sha2_256),
            "SHA3_256" => Ok(HashAlgorithm::Sha3_256),
            "KMAC128_BLS_BLS12_381" | "KMAC128" => Ok(HashAlgorithm::Kmac128),
            _ => Err(CryptoError::UnsupportedHashAlgorithm(value.to_string())),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_algorithm_names_case_insensitively() {
        assert_eq!(
            "ecdsa_p256".parse::<SignatureAlgorithm>().unwrap(),
            SignatureAlgorithm::EcdsaP256
        );
        assert_eq!(
            "ECDSA_secp256k1".parse::<SignatureAlgorithm>().unwrap(),
            SignatureAlgorithm::EcdsaSecp256k1
        );
        assert_eq!(
            "sha2_256".parse::<HashAlgorithm>().unwrap(),
            HashAlgorithm::Sha2_256
        );
        assert!("RSA".parse::<SignatureAlgorithm>().is_err());
    }

    #[test]
    fn ecdsa_rejects_kmac() {
        assert!(SignatureAlgorithm::EcdsaP256.is_compatible_with(HashAlgorithm::Sha3_256));
        assert!(SignatureAlgorithm::EcdsaSecp256k1.is_compatible_with(HashAlgorithm::Sha2_256));
        assert!(!SignatureAlgorithm::EcdsaP256.is_compatible_with(HashAlgorithm::Kmac128));
        assert!(SignatureAlgorithm::BlsBls12381.is_compatible_with(HashAlgorithm::Kmac128));
    }

    #[test]
    fn sha3_digest_of_empty_input() {
        let digest = HashAlgorithm::Sha3_256.digest(b"").unwrap();
        assert_eq!(
            hex::encode(digest),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
    }
}
