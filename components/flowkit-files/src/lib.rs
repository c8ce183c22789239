extern crate serde;

#[macro_use]
extern crate serde_derive;

#[macro_use]
extern crate lazy_static;

#[macro_use]
mod macros;

pub mod accounts;
pub mod config;
pub mod contracts;
pub mod dependencies;
pub mod deployments;
pub mod emulators;
pub mod env;
pub mod json;
pub mod loader;
pub mod networks;
pub mod paths;
mod reader_writer;
pub mod schema;
pub mod state;

pub use accounts::{
    Account, AccountKey, Accounts, Bip44Key, CredentialHook, FileKey, HexKey, KeyType, KmsClient,
    KmsKey,
};
pub use config::Config;
pub use contracts::{Alias, Aliases, Contract, Contracts};
pub use dependencies::{Dependencies, Dependency, RemoteSource};
pub use deployments::{ContractDeployment, Deployment, Deployments};
pub use emulators::{Emulator, Emulators};
pub use networks::{Network, Networks};
pub use reader_writer::{FileSystemReaderWriter, MemoryReaderWriter, ReaderWriter};
pub use state::{DeploymentContract, State};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing configuration, initialize it with flow init or specify a configuration file")]
    Missing,
    #[error("configuration format is outdated, please migrate it: {0}")]
    Outdated(String),
    #[error("configuration syntax error: {0}")]
    Syntax(String),
    #[error("{0}")]
    Validation(String),
    #[error("required environment variable {0} not set")]
    EnvNotSet(String),
    #[error("invalid key: {0}")]
    KeyInvalid(String),
    #[error("private key is not accessible for keys managed by a key management service")]
    KeyInaccessible,
    #[error("{kind} named {name} does not exist in configuration")]
    NotFound { kind: &'static str, name: String },
    #[error("{0}")]
    InvalidValue(String),
    #[error("{0}")]
    Io(String),
}
