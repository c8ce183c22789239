extern crate serde;

#[macro_use]
extern crate serde_derive;

pub extern crate slog;

pub mod events;
mod flowkit;
pub mod log;
pub mod query;
pub mod settings;
pub mod transactions;
pub mod utils;

use std::collections::BTreeMap;

pub use events::{EventList, EventWorker};
pub use flowkit::{
    update_existing_contract, DeployedContract, DeploymentStatus, Flowkit, Script,
    TransactionAccountRoles, TransactionAddressesRoles,
};
pub use query::{BlockQuery, ScriptQuery};
pub use settings::FlowkitSettings;
pub use transactions::{AccountSigner, TransactionBuilder, TransactionState};
pub use utils::Context;

use flow_codec::{Address, CodecError, Identifier};
use flow_gateway::GatewayError;
use flowkit_deployments::DeploymentError;
use flowkit_files::ConfigError;
use flowkit_utils::CryptoError;

#[derive(Debug, thiserror::Error)]
pub enum FlowkitError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("not a valid signer {signer}, proposer: {proposer}, payer: {payer}, authorizers: [{}]", join_addresses(.authorizers))]
    NotASigner {
        signer: Address,
        proposer: Address,
        payer: Address,
        authorizers: Vec<Address>,
    },
    #[error("provided authorizers length mismatch, required authorizers {required}, but provided {provided}")]
    AuthorizerMismatch { required: usize, provided: usize },
    #[error("only one transaction declaration allowed per file")]
    MultipleTransactionDeclarations,
    #[error("transaction is {state}, cannot {action}")]
    InvalidTransactionState {
        state: TransactionState,
        action: &'static str,
    },
    #[error("contract already exists and is the same as the contract provided for update")]
    UpdateNoDiff,
    #[error("contract {name} exists in account {account}")]
    ContractExists { name: String, account: String },
    #[error("can not remove a non deployed contract named {name}. Contracts deployed to account {account}: [{}]", .deployed.join(", "))]
    ContractNotFound {
        name: String,
        account: String,
        deployed: Vec<String>,
    },
    #[error("failed deploying contracts: {}", format_failures(.0))]
    ProjectDeployment(BTreeMap<String, FlowkitError>),
    #[error("invalid range: end block {end} is lower than start block {start}")]
    RangeInvalid { start: u64, end: u64 },
    #[error("invalid query {0}, valid are: \"latest\", block height or block id")]
    QueryParse(String),
    #[error("transaction {id} failed: {message}")]
    TransactionFailed { id: Identifier, message: String },
    #[error("no account creation event emitted by transaction {0}")]
    AccountCreatedEventMissing(Identifier),
    #[error("operation cancelled")]
    Cancelled,
    #[error("transaction {0} was not sealed in time")]
    SealTimeout(Identifier),
    #[error("missing project state, initialize a project or specify a configuration file")]
    NoProjectState,
    #[error("missing network, select a network to run this operation")]
    NoNetwork,
    #[error("{0}")]
    Message(String),
}

fn join_addresses(addresses: &[Address]) -> String {
    addresses
        .iter()
        .map(|a| a.to_hex())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_failures(failures: &BTreeMap<String, FlowkitError>) -> String {
    failures
        .iter()
        .map(|(name, err)| format!("{name}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}
