use flowkit_utils::{PublicKey, SignatureAlgorithm};

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub name: String,
    pub host: String,
    /// Hex ECDSA-P256 public key of the access node, for secure connections.
    pub key: Option<String>,
}

impl Network {
    pub fn new(name: &str, host: &str) -> Network {
        Network {
            name: name.to_string(),
            host: host.to_string(),
            key: None,
        }
    }

    pub fn with_key(name: &str, host: &str, key: &str) -> Result<Network, ConfigError> {
        let key = key.trim_start_matches("0x");
        PublicKey::from_hex(SignatureAlgorithm::EcdsaP256, key).map_err(|e| {
            ConfigError::InvalidValue(format!("invalid key {key} for network {name}: {e}"))
        })?;
        Ok(Network {
            name: name.to_string(),
            host: host.to_string(),
            key: Some(key.to_string()),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Networks(Vec<Network>);
impl_named_collection!(Networks, Network, "network");

pub const EMULATOR_HOST: &str = "127.0.0.1:3569";
pub const TESTNET_HOST: &str = "access.devnet.nodes.onflow.org:9000";
pub const MAINNET_HOST: &str = "access.mainnet.nodes.onflow.org:9000";
pub const CRESCENDO_HOST: &str = "access.crescendo.nodes.onflow.org:9000";

impl Networks {
    pub fn default_networks() -> Networks {
        Networks(vec![
            Network::new("emulator", EMULATOR_HOST),
            Network::new("testing", EMULATOR_HOST),
            Network::new("testnet", TESTNET_HOST),
            Network::new("mainnet", MAINNET_HOST),
            Network::new("crescendo", CRESCENDO_HOST),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowkit_utils::PrivateKey;

    #[test]
    fn default_networks_in_order() {
        let networks = Networks::default_networks();
        assert_eq!(
            networks.names(),
            vec!["emulator", "testing", "testnet", "mainnet", "crescendo"]
        );
        assert_eq!(networks.by_name("testnet").unwrap().host, TESTNET_HOST);
    }

    #[test]
    fn network_key_must_be_p256_public_key() {
        let private = PrivateKey::from_seed(SignatureAlgorithm::EcdsaP256, &[3u8; 32]).unwrap();
        let key = private.public_key().to_hex();
        assert!(Network::with_key("secure", "host:9000", &key).is_ok());
        assert!(Network::with_key("secure", "host:9000", "abcd").is_err());
    }
}
