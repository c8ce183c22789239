use std::fmt;
use std::sync::{Arc, OnceLock};

use flow_codec::Address;
use flowkit_utils::{
    check_compatibility, private_key_from_mnemonic, DerivationPath, HashAlgorithm,
    InMemorySigner, PrivateKey, SignatureAlgorithm, Signer, DEFAULT_DERIVATION_PATH,
};

use crate::{ConfigError, ReaderWriter};

pub const GOOGLE_APPLICATION_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Remote key management service able to sign on behalf of a `kms` key.
pub trait KmsClient: Send + Sync {
    fn signer(
        &self,
        resource_id: &str,
        hash_algo: HashAlgorithm,
    ) -> Result<Box<dyn Signer>, ConfigError>;
}

/// Called by `kms` key validation when no ambient credentials are found.
pub type CredentialHook = dyn Fn(&str) -> Result<(), String> + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Hex,
    Bip44,
    Kms,
    File,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Hex => "hex",
            KeyType::Bip44 => "bip44",
            KeyType::Kms => "google-kms",
            KeyType::File => "file",
        }
    }

    pub fn parse(value: &str) -> Option<KeyType> {
        match value {
            "hex" => Some(KeyType::Hex),
            "bip44" => Some(KeyType::Bip44),
            "google-kms" | "kms" => Some(KeyType::Kms),
            "file" => Some(KeyType::File),
            _ => None,
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HexKey {
    pub index: u32,
    pub sig_algo: SignatureAlgorithm,
    pub hash_algo: HashAlgorithm,
    pub private_key: PrivateKey,
    /// `$NAME` token the key was read from, written back on save.
    pub env_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Bip44Key {
    pub index: u32,
    pub sig_algo: SignatureAlgorithm,
    pub hash_algo: HashAlgorithm,
    pub mnemonic: String,
    pub derivation_path: String,
    pub env_token: Option<String>,
    resolved: Arc<OnceLock<PrivateKey>>,
}

impl Bip44Key {
    pub fn new(
        mnemonic: &str,
        derivation_path: Option<&str>,
        sig_algo: SignatureAlgorithm,
        hash_algo: HashAlgorithm,
        index: u32,
    ) -> Bip44Key {
        Bip44Key {
            index,
            sig_algo,
            hash_algo,
            mnemonic: mnemonic.to_string(),
            derivation_path: derivation_path.unwrap_or(DEFAULT_DERIVATION_PATH).to_string(),
            env_token: None,
            resolved: Arc::new(OnceLock::new()),
        }
    }

    fn private_key(&self) -> Result<PrivateKey, ConfigError> {
        if let Some(key) = self.resolved.get() {
            return Ok(key.clone());
        }
        let path: DerivationPath = self
            .derivation_path
            .parse()
            .map_err(|e: flowkit_utils::CryptoError| ConfigError::KeyInvalid(e.to_string()))?;
        let key = private_key_from_mnemonic(&self.mnemonic, self.sig_algo, &path)
            .map_err(|e| ConfigError::KeyInvalid(e.to_string()))?;
        Ok(self.resolved.get_or_init(|| key).clone())
    }
}

impl PartialEq for Bip44Key {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.sig_algo == other.sig_algo
            && self.hash_algo == other.hash_algo
            && self.mnemonic == other.mnemonic
            && self.derivation_path == other.derivation_path
            && self.env_token == other.env_token
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KmsKey {
    pub index: u32,
    pub sig_algo: SignatureAlgorithm,
    pub hash_algo: HashAlgorithm,
    pub resource_id: String,
    pub env_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FileKey {
    pub index: u32,
    pub sig_algo: SignatureAlgorithm,
    pub hash_algo: HashAlgorithm,
    pub location: String,
    resolved: Arc<OnceLock<PrivateKey>>,
}

impl FileKey {
    pub fn new(
        location: &str,
        sig_algo: SignatureAlgorithm,
        hash_algo: HashAlgorithm,
        index: u32,
    ) -> FileKey {
        FileKey {
            index,
            sig_algo,
            hash_algo,
            location: location.to_string(),
            resolved: Arc::new(OnceLock::new()),
        }
    }

    fn private_key(&self, rw: &dyn ReaderWriter) -> Result<PrivateKey, ConfigError> {
        if let Some(key) = self.resolved.get() {
            return Ok(key.clone());
        }
        let content = rw.read_file(&self.location).map_err(|e| {
            ConfigError::KeyInvalid(format!(
                "could not load the key for the account from provided location {}: {}",
                self.location, e
            ))
        })?;
        let content = String::from_utf8_lossy(&content);
        let key = PrivateKey::from_hex(self.sig_algo, content.trim()).map_err(|e| {
            ConfigError::KeyInvalid(format!(
                "could not decode the key from {}: {}",
                self.location, e
            ))
        })?;
        Ok(self.resolved.get_or_init(|| key).clone())
    }
}

impl PartialEq for FileKey {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.sig_algo == other.sig_algo
            && self.hash_algo == other.hash_algo
            && self.location == other.location
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AccountKey {
    Hex(HexKey),
    Bip44(Bip44Key),
    Kms(KmsKey),
    File(FileKey),
}

impl AccountKey {
    /// Hex key with index 0 and the given algorithms.
    pub fn hex(
        private_key: PrivateKey,
        hash_algo: HashAlgorithm,
    ) -> AccountKey {
        AccountKey::Hex(HexKey {
            index: 0,
            sig_algo: private_key.algorithm(),
            hash_algo,
            private_key,
            env_token: None,
        })
    }

    pub fn key_type(&self) -> KeyType {
        match self {
            AccountKey::Hex(_) => KeyType::Hex,
            AccountKey::Bip44(_) => KeyType::Bip44,
            AccountKey::Kms(_) => KeyType::Kms,
            AccountKey::File(_) => KeyType::File,
        }
    }

    pub fn index(&self) -> u32 {
        match self {
            AccountKey::Hex(k) => k.index,
            AccountKey::Bip44(k) => k.index,
            AccountKey::Kms(k) => k.index,
            AccountKey::File(k) => k.index,
        }
    }

    pub fn sig_algo(&self) -> SignatureAlgorithm {
        match self {
            AccountKey::Hex(k) => k.sig_algo,
            AccountKey::Bip44(k) => k.sig_algo,
            AccountKey::Kms(k) => k.sig_algo,
            AccountKey::File(k) => k.sig_algo,
        }
    }

    pub fn hash_algo(&self) -> HashAlgorithm {
        match self {
            AccountKey::Hex(k) => k.hash_algo,
            AccountKey::Bip44(k) => k.hash_algo,
            AccountKey::Kms(k) => k.hash_algo,
            AccountKey::File(k) => k.hash_algo,
        }
    }

    pub fn env_token(&self) -> Option<&str> {
        match self {
            AccountKey::Hex(k) => k.env_token.as_deref(),
            AccountKey::Bip44(k) => k.env_token.as_deref(),
            AccountKey::Kms(k) => k.env_token.as_deref(),
            AccountKey::File(_) => None,
        }
    }

    /// Private key material. `kms` keys never expose theirs.
    pub fn private_key(&self, rw: &dyn ReaderWriter) -> Result<PrivateKey, ConfigError> {
        match self {
            AccountKey::Hex(k) => Ok(k.private_key.clone()),
            AccountKey::Bip44(k) => k.private_key(),
            AccountKey::Kms(_) => Err(ConfigError::KeyInaccessible),
            AccountKey::File(k) => k.private_key(rw),
        }
    }

    pub fn signer(
        &self,
        rw: &dyn ReaderWriter,
        kms: Option<&dyn KmsClient>,
    ) -> Result<Box<dyn Signer>, ConfigError> {
        match self {
            AccountKey::Kms(k) => {
                let client = kms.ok_or_else(|| {
                    ConfigError::KeyInvalid(format!(
                        "no key management client available for {}",
                        k.resource_id
                    ))
                })?;
                client.signer(&k.resource_id, k.hash_algo)
            }
            other => Ok(Box::new(InMemorySigner::new(
                other.private_key(rw)?,
                other.hash_algo(),
            ))),
        }
    }

    /// Checks algorithm compatibility and that the key material is usable.
    pub fn validate(&self, credential_hook: Option<&CredentialHook>) -> Result<(), ConfigError> {
        check_compatibility(self.sig_algo(), self.hash_algo())
            .map_err(|e| ConfigError::KeyInvalid(e.to_string()))?;
        match self {
            AccountKey::Hex(_) | AccountKey::File(_) => Ok(()),
            AccountKey::Bip44(k) => k.private_key().map(|_| ()),
            AccountKey::Kms(k) => {
                let has_credentials = std::env::var(GOOGLE_APPLICATION_CREDENTIALS)
                    .map(|v| !v.is_empty())
                    .unwrap_or(false);
                if has_credentials {
                    return Ok(());
                }
                match credential_hook {
                    Some(hook) => hook(&k.resource_id).map_err(|e| {
                        ConfigError::KeyInvalid(format!(
                            "could not acquire credentials for {}: {}",
                            k.resource_id, e
                        ))
                    }),
                    None => Err(ConfigError::KeyInvalid(format!(
                        "missing {} for key {}",
                        GOOGLE_APPLICATION_CREDENTIALS, k.resource_id
                    ))),
                }
            }
        }
    }

    /// Fully default keys are written in the short form.
    pub fn is_default(&self) -> bool {
        match self {
            AccountKey::Hex(k) => {
                k.index == 0
                    && k.sig_algo == SignatureAlgorithm::EcdsaP256
                    && k.hash_algo == HashAlgorithm::Sha3_256
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub name: String,
    pub address: Address,
    pub key: AccountKey,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accounts(Vec<Account>);
impl_named_collection!(Accounts, Account, "account");

impl Accounts {
    pub fn by_address(&self, address: &Address) -> Result<&Account, ConfigError> {
        self.0
            .iter()
            .find(|account| account.address == *address)
            .ok_or_else(|| ConfigError::NotFound {
                kind: "account",
                name: address.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryReaderWriter;

    fn hex_account(name: &str, address: &str) -> Account {
        let key = PrivateKey::from_seed(SignatureAlgorithm::EcdsaP256, &[7u8; 32]).unwrap();
        Account {
            name: name.into(),
            address: Address::from_hex(address).unwrap(),
            key: AccountKey::hex(key, HashAlgorithm::Sha3_256),
        }
    }

    #[test]
    fn lookups_report_missing_names() {
        let mut accounts = Accounts::new();
        accounts.add_or_update(hex_account("alice", "01"));
        accounts.add_or_update(hex_account("bob", "01"));
        assert_eq!(accounts.by_address(&Address::from_hex("01").unwrap()).unwrap().name, "alice");
        assert_eq!(
            accounts.by_name("carol").unwrap_err().to_string(),
            "account named carol does not exist in configuration"
        );
        assert!(accounts.remove("carol").is_err());
        accounts.remove("alice").unwrap();
        assert_eq!(accounts.names(), vec!["bob".to_string()]);
    }

    #[test]
    fn add_or_update_replaces_existing_entry() {
        let mut accounts = Accounts::new();
        accounts.add_or_update(hex_account("alice", "01"));
        accounts.add_or_update(hex_account("alice", "02"));
        assert_eq!(accounts.len(), 1);
        assert_eq!(
            accounts.by_name("alice").unwrap().address,
            Address::from_hex("02").unwrap()
        );
    }

    #[test]
    fn mutation_through_lookup_is_visible() {
        let mut accounts = Accounts::new();
        accounts.add_or_update(hex_account("alice", "01"));
        accounts.by_name_mut("alice").unwrap().address = Address::from_hex("03").unwrap();
        assert_eq!(
            accounts.by_name("alice").unwrap().address,
            Address::from_hex("03").unwrap()
        );
    }

    #[test]
    fn kms_keys_never_expose_private_material() {
        let key = AccountKey::Kms(KmsKey {
            index: 0,
            sig_algo: SignatureAlgorithm::EcdsaP256,
            hash_algo: HashAlgorithm::Sha3_256,
            resource_id: "projects/p/locations/l/keyRings/r/cryptoKeys/k/cryptoKeyVersions/1"
                .into(),
            env_token: None,
        });
        let rw = MemoryReaderWriter::new();
        assert!(matches!(
            key.private_key(&rw),
            Err(ConfigError::KeyInaccessible)
        ));
        assert!(key.signer(&rw, None).is_err());
    }

    #[test]
    fn kms_validation_runs_credential_hook() {
        let key = AccountKey::Kms(KmsKey {
            index: 0,
            sig_algo: SignatureAlgorithm::EcdsaP256,
            hash_algo: HashAlgorithm::Sha3_256,
            resource_id: "res".into(),
            env_token: None,
        });
        let ok_hook: &CredentialHook = &|_| Ok(());
        let failing_hook: &CredentialHook = &|_| Err("denied".to_string());
        if std::env::var(GOOGLE_APPLICATION_CREDENTIALS).is_err() {
            assert!(key.validate(Some(ok_hook)).is_ok());
            assert!(key.validate(Some(failing_hook)).is_err());
        }
    }

    #[test]
    fn file_keys_load_lazily_and_cache() {
        let private = PrivateKey::from_seed(SignatureAlgorithm::EcdsaP256, &[9u8; 32]).unwrap();
        let rw = MemoryReaderWriter::new()
            .with_file("alice.pkey", &format!("0x{}\n", private.to_hex()));
        let key = AccountKey::File(FileKey::new(
            "alice.pkey",
            SignatureAlgorithm::EcdsaP256,
            HashAlgorithm::Sha3_256,
            0,
        ));
        assert_eq!(key.private_key(&rw).unwrap(), private);
        // cached: a reader without the file still answers
        assert_eq!(key.private_key(&MemoryReaderWriter::new()).unwrap(), private);
        let missing = AccountKey::File(FileKey::new(
            "missing.pkey",
            SignatureAlgorithm::EcdsaP256,
            HashAlgorithm::Sha3_256,
            0,
        ));
        assert!(missing.private_key(&rw).is_err());
    }

    #[test]
    fn bip44_keys_derive_once() {
        let key = AccountKey::Bip44(Bip44Key::new(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
            None,
            SignatureAlgorithm::EcdsaSecp256k1,
            HashAlgorithm::Sha2_256,
            0,
        ));
        let rw = MemoryReaderWriter::new();
        let first = key.private_key(&rw).unwrap();
        assert_eq!(first, key.private_key(&rw).unwrap());
        assert!(key.validate(None).is_ok());
    }

    #[test]
    fn incompatible_algorithms_fail_validation() {
        let private = PrivateKey::from_seed(SignatureAlgorithm::EcdsaP256, &[1u8; 32]).unwrap();
        let key = AccountKey::hex(private, HashAlgorithm::Kmac128);
        assert!(matches!(key.validate(None), Err(ConfigError::KeyInvalid(_))));
    }
}
