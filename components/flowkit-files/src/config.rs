use std::collections::HashMap;

use crate::accounts::Accounts;
use crate::contracts::Contracts;
use crate::dependencies::Dependencies;
use crate::deployments::Deployments;
use crate::emulators::{Emulators, DEFAULT_SERVICE_ACCOUNT};
use crate::networks::Networks;
use crate::ConfigError;

/// In-memory project configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub emulators: Emulators,
    pub contracts: Contracts,
    pub dependencies: Dependencies,
    pub networks: Networks,
    pub accounts: Accounts,
    pub deployments: Deployments,
}

impl Config {
    /// Configuration for a fresh project: default networks and emulator.
    pub fn default_config() -> Config {
        Config {
            emulators: Emulators::default_emulators(),
            networks: Networks::default_networks(),
            ..Default::default()
        }
    }

    /// Checks cross references between sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for contract in self.contracts.iter() {
            for alias in contract.aliases.iter() {
                if self.networks.by_name(&alias.network).is_err() {
                    return Err(ConfigError::Validation(format!(
                        "contract {} alias uses non existing network {}",
                        contract.name, alias.network
                    )));
                }
            }
        }

        for emulator in self.emulators.iter() {
            if self.accounts.by_name(&emulator.service_account).is_err() {
                return Err(ConfigError::Validation(format!(
                    "emulator {} contains nonexisting service account {}",
                    emulator.name, emulator.service_account
                )));
            }
        }

        for deployment in self.deployments.iter() {
            if self.networks.by_name(&deployment.network).is_err() {
                return Err(ConfigError::Validation(format!(
                    "deployment contains nonexisting network {}",
                    deployment.network
                )));
            }
            if self.accounts.by_name(&deployment.account).is_err() {
                return Err(ConfigError::Validation(format!(
                    "deployment contains nonexisting account {}",
                    deployment.account
                )));
            }
            for contract in &deployment.contracts {
                if self.contracts.by_name(&contract.name).is_err() {
                    return Err(ConfigError::Validation(format!(
                        "deployment contains nonexisting contract {}",
                        contract.name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Applies every entry of `other` on top of this configuration.
    pub fn merge(&mut self, other: Config) {
        for emulator in other.emulators.iter() {
            self.emulators.add_or_update(emulator.clone());
        }
        for contract in other.contracts.iter() {
            self.contracts.add_or_update(contract.clone());
        }
        for dependency in other.dependencies.iter() {
            self.dependencies.add_or_update(dependency.clone());
        }
        for network in other.networks.iter() {
            self.networks.add_or_update(network.clone());
        }
        for account in other.accounts.iter() {
            self.accounts.add_or_update(account.clone());
        }
        for deployment in other.deployments.iter() {
            self.deployments.add_or_update(deployment.clone());
        }
    }

    /// Adds the default emulator when the service account exists and no
    /// emulator is configured.
    pub fn inject_default_emulator(&mut self) {
        if self.emulators.is_empty() && self.accounts.by_name(DEFAULT_SERVICE_ACCOUNT).is_ok() {
            self.emulators = Emulators::default_emulators();
        }
    }

    /// Addresses of contracts and dependencies already deployed on
    /// `network`, keyed by cleaned location and by name.
    pub fn aliases_for_network(&self, network: &str) -> HashMap<String, String> {
        let mut aliases = HashMap::new();
        for contract in self.contracts.iter() {
            if let Some(alias) = contract.aliases.by_network(network) {
                let address = alias.address.to_hex();
                aliases.insert(crate::paths::clean(&contract.location), address.clone());
                aliases.insert(contract.name.clone(), address);
            }
        }
        for dependency in self.dependencies.iter() {
            if let Some(address) = dependency.address_on(network) {
                aliases
                    .entry(dependency.name.clone())
                    .or_insert_with(|| address.to_hex());
            }
        }
        aliases
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{Account, AccountKey};
    use crate::contracts::Contract;
    use crate::deployments::{ContractDeployment, Deployment};
    use crate::emulators::Emulator;
    use flow_codec::Address;
    use flowkit_utils::{HashAlgorithm, PrivateKey, SignatureAlgorithm};

    fn account(name: &str, address: &str) -> Account {
        let key = PrivateKey::from_seed(SignatureAlgorithm::EcdsaP256, &[1u8; 32]).unwrap();
        Account {
            name: name.into(),
            address: Address::from_hex(address).unwrap(),
            key: AccountKey::hex(key, HashAlgorithm::Sha3_256),
        }
    }

    fn config_with_missing_service_account() -> Config {
        let mut config = Config::default_config();
        config
            .contracts
            .add_or_update(Contract::new("MyContract", "./MyContract.cdc"));
        config.accounts.add_or_update(account("MyAccount", "01"));
        let mut deployment = Deployment::new("testnet", "MyAccount");
        deployment.add_contract(ContractDeployment::new("MyContract"));
        config.deployments.add_or_update(deployment);
        config
    }

    #[test]
    fn validate_reports_missing_service_account() {
        let config = config_with_missing_service_account();
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "emulator default contains nonexisting service account emulator-account"
        );
    }

    #[test]
    fn validate_reports_unknown_references() {
        let mut config = config_with_missing_service_account();
        config.emulators = Emulators::new();
        assert!(config.validate().is_ok());

        config
            .contracts
            .by_name_mut("MyContract")
            .unwrap()
            .aliases
            .add("previewnet", Address::from_hex("02").unwrap());
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "contract MyContract alias uses non existing network previewnet"
        );

        let mut config = config_with_missing_service_account();
        config.emulators = Emulators::new();
        config
            .deployments
            .add_contract("MyAccount", "testnet", ContractDeployment::new("Missing"));
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "deployment contains nonexisting contract Missing"
        );

        config.deployments.add_or_update(Deployment::new("testnet", "Nobody"));
        config.deployments.remove("MyAccount", "testnet").unwrap();
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "deployment contains nonexisting account Nobody"
        );

        config.deployments.add_or_update(Deployment::new("localnet", "MyAccount"));
        config.deployments.remove("Nobody", "testnet").unwrap();
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "deployment contains nonexisting network localnet"
        );
    }

    #[test]
    fn merge_lets_later_entries_win() {
        let mut base = Config::default_config();
        base.accounts.add_or_update(account("alice", "01"));
        let mut overlay = Config::default();
        overlay.accounts.add_or_update(account("alice", "02"));
        overlay.accounts.add_or_update(account("bob", "03"));
        overlay.emulators.add_or_update(Emulator {
            port: 4000,
            ..Emulator::default()
        });

        base.merge(overlay);
        assert_eq!(base.accounts.names(), vec!["alice", "bob"]);
        assert_eq!(
            base.accounts.by_name("alice").unwrap().address,
            Address::from_hex("02").unwrap()
        );
        assert_eq!(base.emulators.by_name("default").unwrap().port, 4000);
        assert_eq!(base.networks.len(), 5);
    }

    #[test]
    fn default_emulator_only_injected_with_service_account() {
        let mut config = Config::default();
        config.inject_default_emulator();
        assert!(config.emulators.is_empty());

        config.accounts.add_or_update(account("emulator-account", "f8d6e0586b0a20c7"));
        config.inject_default_emulator();
        assert!(config.emulators.is_default());
    }

    #[test]
    fn aliases_cover_locations_and_names() {
        let mut config = Config::default_config();
        let mut contract = Contract::new("FungibleToken", "./contracts/FungibleToken.cdc");
        contract
            .aliases
            .add("testnet", Address::from_hex("9a0766d93b6608b7").unwrap());
        config.contracts.add_or_update(contract);

        let aliases = config.aliases_for_network("testnet");
        assert_eq!(
            aliases.get("contracts/FungibleToken.cdc").map(String::as_str),
            Some("9a0766d93b6608b7")
        );
        assert_eq!(
            aliases.get("FungibleToken").map(String::as_str),
            Some("9a0766d93b6608b7")
        );
        assert!(config.aliases_for_network("mainnet").is_empty());
    }
}
