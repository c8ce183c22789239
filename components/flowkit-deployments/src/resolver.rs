use std::collections::HashMap;

use flowkit_files::{paths, DeploymentContract};

use crate::program::Program;
use crate::DeploymentError;

/// Rewrites string imports of a program to the addresses contracts are
/// deployed or aliased at.
pub struct ImportReplacer {
    location_to_address: HashMap<String, String>,
}

impl ImportReplacer {
    pub fn new(contracts: &[DeploymentContract], aliases: &HashMap<String, String>) -> ImportReplacer {
        let mut location_to_address = HashMap::new();
        for contract in contracts {
            let address = contract.account_address.to_hex();
            location_to_address.insert(paths::clean(&contract.location), address.clone());
            location_to_address.insert(contract.name.clone(), address);
        }
        for (source, address) in aliases {
            location_to_address.insert(paths::clean(source), address.clone());
        }
        ImportReplacer {
            location_to_address,
        }
    }

    /// Address an import of `program` binds to, if any.
    pub fn address_for(&self, program_location: &str, import: &str) -> Option<&String> {
        let absolute = paths::join(&paths::dir(program_location), import);
        self.location_to_address
            .get(&paths::clean(&absolute))
            .or_else(|| self.location_to_address.get(import))
    }

    pub fn replace(&self, program: &mut Program) -> Result<(), DeploymentError> {
        for import in program.imports() {
            let address = self
                .address_for(program.location(), &import)
                .cloned()
                .ok_or_else(|| DeploymentError::ImportNotResolved(import.clone()))?;
            program.replace_import(&import, &address)?;
        }
        Ok(())
    }
}
