use flow_codec::Address;

use crate::ConfigError;

/// Existing on-chain deployment of a contract on one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub network: String,
    pub address: Address,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aliases(Vec<Alias>);

impl Aliases {
    pub fn new() -> Aliases {
        Aliases(vec![])
    }

    pub fn by_network(&self, network: &str) -> Option<&Alias> {
        self.0.iter().find(|alias| alias.network == network)
    }

    /// Adds an alias unless the network already has one.
    pub fn add(&mut self, network: &str, address: Address) {
        if self.by_network(network).is_none() {
            self.0.push(Alias {
                network: network.to_string(),
                address,
            });
        }
    }

    /// Replaces the alias of `alias.network`, or appends.
    pub fn add_or_update(&mut self, alias: Alias) {
        match self.0.iter_mut().find(|a| a.network == alias.network) {
            Some(existing) => *existing = alias,
            None => self.0.push(alias),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Alias> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Aliases {
    type Item = &'a Alias;
    type IntoIter = std::slice::Iter<'a, Alias>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    pub name: String,
    pub location: String,
    pub aliases: Aliases,
    /// Created from a dependency entry rather than a `contracts` entry.
    pub is_dependency: bool,
}

impl Contract {
    pub fn new(name: &str, location: &str) -> Contract {
        Contract {
            name: name.to_string(),
            location: location.to_string(),
            aliases: Aliases::new(),
            is_dependency: false,
        }
    }

    pub fn is_aliased_on(&self, network: &str) -> bool {
        self.aliases.by_network(network).is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contracts(Vec<Contract>);
impl_named_collection!(Contracts, Contract, "contract");

impl Contracts {
    pub fn by_location(&self, location: &str) -> Result<&Contract, ConfigError> {
        let location = crate::paths::clean(location);
        self.0
            .iter()
            .find(|c| crate::paths::clean(&c.location) == location)
            .ok_or_else(|| ConfigError::NotFound {
                kind: "contract",
                name: location,
            })
    }

    /// Appends `contract` unless a contract with the same name exists.
    pub fn add_if_missing(&mut self, contract: Contract) -> bool {
        if self.by_name(&contract.name).is_ok() {
            return false;
        }
        self.0.push(contract);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_alias_per_network_wins() {
        let mut aliases = Aliases::new();
        aliases.add("testnet", Address::from_hex("01").unwrap());
        aliases.add("testnet", Address::from_hex("02").unwrap());
        aliases.add("mainnet", Address::from_hex("03").unwrap());
        assert_eq!(aliases.len(), 2);
        assert_eq!(
            aliases.by_network("testnet").unwrap().address,
            Address::from_hex("01").unwrap()
        );
    }

    #[test]
    fn finds_contracts_by_clean_location() {
        let mut contracts = Contracts::new();
        contracts.add_or_update(Contract::new("A", "./contracts/A.cdc"));
        assert_eq!(contracts.by_location("contracts/A.cdc").unwrap().name, "A");
        assert_eq!(
            contracts.by_name("B").unwrap_err().to_string(),
            "contract named B does not exist in configuration"
        );
    }

    #[test]
    fn add_if_missing_keeps_existing_aliases() {
        let mut contracts = Contracts::new();
        let mut aliased = Contract::new("A", "A.cdc");
        aliased.aliases.add("testnet", Address::from_hex("01").unwrap());
        contracts.add_or_update(aliased);
        assert!(!contracts.add_if_missing(Contract::new("A", "other/A.cdc")));
        assert!(contracts.by_name("A").unwrap().is_aliased_on("testnet"));
        assert!(contracts.add_if_missing(Contract::new("B", "B.cdc")));
    }
}
