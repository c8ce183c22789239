use flow_codec::Value;

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq)]
pub struct ContractDeployment {
    pub name: String,
    /// Initializer arguments.
    pub args: Vec<Value>,
}

impl ContractDeployment {
    pub fn new(name: &str) -> ContractDeployment {
        ContractDeployment {
            name: name.to_string(),
            args: vec![],
        }
    }

    pub fn with_args(name: &str, args: Vec<Value>) -> ContractDeployment {
        ContractDeployment {
            name: name.to_string(),
            args,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Deployment {
    pub network: String,
    pub account: String,
    pub contracts: Vec<ContractDeployment>,
}

impl Deployment {
    pub fn new(network: &str, account: &str) -> Deployment {
        Deployment {
            network: network.to_string(),
            account: account.to_string(),
            contracts: vec![],
        }
    }

    /// Replaces a contract with the same name, or appends.
    pub fn add_contract(&mut self, contract: ContractDeployment) {
        match self.contracts.iter_mut().find(|c| c.name == contract.name) {
            Some(existing) => *existing = contract,
            None => self.contracts.push(contract),
        }
    }

    pub fn remove_contract(&mut self, name: &str) -> Result<(), ConfigError> {
        let before = self.contracts.len();
        self.contracts.retain(|c| c.name != name);
        if before == self.contracts.len() {
            return Err(ConfigError::NotFound {
                kind: "contract",
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

/// Deployments keyed by (account, network).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deployments(Vec<Deployment>);

impl Deployments {
    pub fn new() -> Deployments {
        Deployments(vec![])
    }

    pub fn by_account_and_network(&self, account: &str, network: &str) -> Option<&Deployment> {
        self.0
            .iter()
            .find(|d| d.account == account && d.network == network)
    }

    pub fn by_account_and_network_mut(
        &mut self,
        account: &str,
        network: &str,
    ) -> Option<&mut Deployment> {
        self.0
            .iter_mut()
            .find(|d| d.account == account && d.network == network)
    }

    pub fn by_network(&self, network: &str) -> Vec<&Deployment> {
        self.0.iter().filter(|d| d.network == network).collect()
    }

    pub fn add_or_update(&mut self, deployment: Deployment) {
        match self.by_account_and_network_mut(&deployment.account, &deployment.network) {
            Some(existing) => *existing = deployment,
            None => self.0.push(deployment),
        }
    }

    pub fn remove(&mut self, account: &str, network: &str) -> Result<(), ConfigError> {
        let before = self.0.len();
        self.0
            .retain(|d| !(d.account == account && d.network == network));
        if before == self.0.len() {
            return Err(ConfigError::NotFound {
                kind: "deployment",
                name: format!("{account} on {network}"),
            });
        }
        Ok(())
    }

    /// Adds `contract` to the (account, network) deployment, creating it if needed.
    pub fn add_contract(&mut self, account: &str, network: &str, contract: ContractDeployment) {
        match self.by_account_and_network_mut(account, network) {
            Some(deployment) => deployment.add_contract(contract),
            None => {
                let mut deployment = Deployment::new(network, account);
                deployment.contracts.push(contract);
                self.0.push(deployment);
            }
        }
    }

    pub fn remove_contract(
        &mut self,
        account: &str,
        network: &str,
        name: &str,
    ) -> Result<(), ConfigError> {
        let deployment = self
            .by_account_and_network_mut(account, network)
            .ok_or_else(|| ConfigError::NotFound {
                kind: "deployment",
                name: format!("{account} on {network}"),
            })?;
        deployment.remove_contract(name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Deployment> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Deployments {
    type Item = &'a Deployment;
    type IntoIter = std::slice::Iter<'a, Deployment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<Deployment>> for Deployments {
    fn from(items: Vec<Deployment>) -> Self {
        Deployments(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_contract_creates_missing_deployment() {
        let mut deployments = Deployments::new();
        deployments.add_contract("alice", "emulator", ContractDeployment::new("A"));
        deployments.add_contract("alice", "emulator", ContractDeployment::new("B"));
        deployments.add_contract("alice", "testnet", ContractDeployment::new("A"));
        assert_eq!(deployments.len(), 2);
        let emulator = deployments.by_account_and_network("alice", "emulator").unwrap();
        assert_eq!(emulator.contracts.len(), 2);
        assert_eq!(deployments.by_network("testnet").len(), 1);
    }

    #[test]
    fn add_contract_replaces_arguments() {
        let mut deployments = Deployments::new();
        deployments.add_contract("alice", "emulator", ContractDeployment::new("A"));
        deployments.add_contract(
            "alice",
            "emulator",
            ContractDeployment::with_args("A", vec![Value::string("hello")]),
        );
        let emulator = deployments.by_account_and_network("alice", "emulator").unwrap();
        assert_eq!(emulator.contracts.len(), 1);
        assert_eq!(emulator.contracts[0].args, vec![Value::string("hello")]);
    }

    #[test]
    fn remove_reports_missing_entries() {
        let mut deployments = Deployments::new();
        deployments.add_contract("alice", "emulator", ContractDeployment::new("A"));
        assert!(deployments.remove_contract("alice", "emulator", "B").is_err());
        assert!(deployments.remove_contract("bob", "emulator", "A").is_err());
        deployments.remove_contract("alice", "emulator", "A").unwrap();
        assert!(deployments
            .by_account_and_network("alice", "emulator")
            .unwrap()
            .contracts
            .is_empty());
        deployments.remove("alice", "emulator").unwrap();
        assert!(deployments.is_empty());
        assert!(deployments.remove("alice", "emulator").is_err());
    }
}
