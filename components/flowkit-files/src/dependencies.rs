use std::fmt;
use std::str::FromStr;

use flow_codec::Address;

use crate::contracts::Aliases;
use crate::ConfigError;

/// Where a dependency lives: `network://address.ContractName`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSource {
    pub network: String,
    pub address: Address,
    pub contract_name: String,
}

impl FromStr for RemoteSource {
    type Err = ConfigError;

    /// Accepts `network://address.Name` and the older `network/address.Name`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            ConfigError::InvalidValue(format!(
                "invalid dependency source format: {value}, expected network://address.ContractName"
            ))
        };
        let (network, rest) = match value.split_once("://") {
            Some(parts) => parts,
            None => value.split_once('/').ok_or_else(invalid)?,
        };
        let (address, contract_name) = rest.split_once('.').ok_or_else(invalid)?;
        if network.is_empty() || contract_name.is_empty() {
            return Err(invalid());
        }
        let address = Address::from_hex(address).map_err(|_| invalid())?;
        Ok(RemoteSource {
            network: network.to_string(),
            address,
            contract_name: contract_name.to_string(),
        })
    }
}

impl fmt::Display for RemoteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}.{}",
            self.network,
            self.address.to_hex(),
            self.contract_name
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub source: RemoteSource,
    /// Hash of the installed source, empty until installed.
    pub hash: String,
    pub aliases: Aliases,
}

impl Dependency {
    pub fn new(name: &str, source: RemoteSource) -> Dependency {
        Dependency {
            name: name.to_string(),
            source,
            hash: String::new(),
            aliases: Aliases::new(),
        }
    }

    /// Address the dependency is available at on `network`, if any.
    pub fn address_on(&self, network: &str) -> Option<Address> {
        if let Some(alias) = self.aliases.by_network(network) {
            return Some(alias.address);
        }
        if self.source.network == network {
            return Some(self.source.address);
        }
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies(Vec<Dependency>);
impl_named_collection!(Dependencies, Dependency, "dependency");
