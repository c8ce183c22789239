#[macro_use]
extern crate lazy_static;

pub mod cadence;
pub mod planner;
pub mod program;
pub mod resolver;

pub use planner::order_contracts;
pub use program::{AddressImport, Program};
pub use resolver::ImportReplacer;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeploymentError {
    #[error("parsing failed for {location}: {message}")]
    Parse { location: String, message: String },
    #[error("{0}")]
    ContractName(String),
    #[error("import {0} could not be resolved from provided contracts")]
    ImportNotResolved(String),
    #[error("import from {contract} could not be found: {import}, make sure import path is correct, and the contract is added to deployments or has an alias")]
    ImportNotFound { contract: String, import: String },
    #[error("contracts with cyclic imports: {}", format_cycles(.cycles))]
    CyclicImport { cycles: Vec<Vec<String>> },
    #[error("the same contract cannot be deployed to multiple accounts on the same network")]
    DuplicateDeployment(String),
    #[error("{0}")]
    Message(String),
}

fn format_cycles(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .map(|cycle| format!("[{}]", cycle.join(", ")))
        .collect::<Vec<_>>()
        .join(", ")
}
