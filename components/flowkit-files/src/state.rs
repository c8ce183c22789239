use std::collections::HashMap;
use std::sync::Arc;

use flow_codec::{Address, ChainId, Value};
use flowkit_utils::{random_seed, HashAlgorithm, PrivateKey, SignatureAlgorithm, Signer};

use crate::accounts::{Account, AccountKey, Accounts, CredentialHook, KmsClient};
use crate::config::Config;
use crate::contracts::Contract;
use crate::emulators::DEFAULT_SERVICE_ACCOUNT;
use crate::env::{self, EnvLookup};
use crate::loader::{self, Loader};
use crate::{paths, ConfigError, ReaderWriter};

/// Directory dependencies are installed into, relative to the project.
pub const DEPENDENCIES_DIR: &str = "imports";

/// Contract scheduled for deployment on a network, with its source loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentContract {
    pub name: String,
    pub location: String,
    pub code: String,
    pub account_address: Address,
    pub account_name: String,
    pub args: Vec<Value>,
}

/// Project configuration together with the means to read and persist it.
pub struct State {
    config: Config,
    rw: Arc<dyn ReaderWriter>,
    loaded_paths: Vec<String>,
    config_dir: Option<String>,
    kms: Option<Arc<dyn KmsClient>>,
    credential_hook: Option<Arc<CredentialHook>>,
}

impl State {
    /// Fresh project holding one emulator service account with a random key.
    pub fn init(
        rw: Arc<dyn ReaderWriter>,
        sig_algo: SignatureAlgorithm,
        hash_algo: HashAlgorithm,
    ) -> Result<State, ConfigError> {
        let seed = random_seed(sig_algo);
        let private_key = PrivateKey::from_seed(sig_algo, &seed)
            .map_err(|e| ConfigError::KeyInvalid(e.to_string()))?;
        let mut config = Config::default_config();
        config.accounts.add_or_update(Account {
            name: DEFAULT_SERVICE_ACCOUNT.to_string(),
            address: ChainId::Emulator.service_address(),
            key: AccountKey::hex(private_key, hash_algo),
        });
        Ok(State {
            config,
            rw,
            loaded_paths: vec![],
            config_dir: None,
            kms: None,
            credential_hook: None,
        })
    }

    /// Loads and merges `paths`, substituting references from the process env.
    pub fn load(rw: Arc<dyn ReaderWriter>, paths: &[String]) -> Result<State, ConfigError> {
        State::load_with_env(rw, paths, &env::process_env)
    }

    pub fn load_with_env(
        rw: Arc<dyn ReaderWriter>,
        config_paths: &[String],
        lookup: &EnvLookup,
    ) -> Result<State, ConfigError> {
        let (mut config, loaded_paths, config_dir) = {
            let mut loader = Loader::new(rw.as_ref(), lookup);
            let config = loader.load(config_paths)?;
            (config, loader.loaded_paths().to_vec(), loader.config_dir())
        };
        config.validate()?;
        add_dependencies_as_contracts(&mut config);
        Ok(State {
            config,
            rw,
            loaded_paths,
            config_dir,
            kms: None,
            credential_hook: None,
        })
    }

    pub fn with_kms_client(mut self, kms: Arc<dyn KmsClient>) -> State {
        self.kms = Some(kms);
        self
    }

    /// Hook run when a `kms` key is used without ambient credentials.
    pub fn with_credential_hook(mut self, hook: Arc<CredentialHook>) -> State {
        self.credential_hook = Some(hook);
        self
    }

    pub fn save(&self, path: &str) -> Result<(), ConfigError> {
        Loader::new(self.rw.as_ref(), &env::process_env).save(&self.config, path)
    }

    /// Saves to the local `flow.json`.
    pub fn save_default(&self) -> Result<(), ConfigError> {
        self.save(&loader::local_path())
    }

    /// Persists edits back to the single configuration they were loaded from.
    pub fn save_edited(&self, config_paths: &[String]) -> Result<(), ConfigError> {
        let writes_global = match config_paths {
            [] => return Err(ConfigError::InvalidValue("no configuration path provided".into())),
            [single] => loader::global_path().as_deref() == Some(single.as_str()),
            _ if loader::is_default_paths(config_paths) => true,
            _ => {
                return Err(ConfigError::InvalidValue(
                    "specifying multiple paths is not supported when updating configuration"
                        .into(),
                ))
            }
        };
        if !writes_global {
            return self.save(&config_paths[0]);
        }
        if !self.rw.file_exists(&loader::local_path()) {
            return Err(ConfigError::InvalidValue(
                "default configuration not found, please initialize it first or specify another configuration file"
                    .into(),
            ));
        }
        self.save_default()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn accounts(&self) -> &Accounts {
        &self.config.accounts
    }

    pub fn reader_writer(&self) -> &dyn ReaderWriter {
        self.rw.as_ref()
    }

    pub fn loaded_paths(&self) -> &[String] {
        &self.loaded_paths
    }

    /// Resolves `location` against the configuration directory when exactly
    /// one configuration file was loaded.
    pub fn resolve_location(&self, location: &str) -> String {
        match &self.config_dir {
            Some(dir) if !paths::is_absolute(location) => paths::join(dir, location),
            _ => paths::clean(location),
        }
    }

    /// Reads a project file, relative locations resolved like contract sources.
    pub fn read_file(&self, location: &str) -> Result<Vec<u8>, ConfigError> {
        let resolved = self.resolve_location(location);
        self.rw
            .read_file(&paths::from_slash(&resolved))
            .map_err(|e| ConfigError::Io(format!("could not read {location}: {e}")))
    }

    pub fn emulator_service_account(&self) -> Result<&Account, ConfigError> {
        let name = self
            .config
            .emulators
            .default_emulator()
            .map(|emulator| emulator.service_account.as_str())
            .unwrap_or(DEFAULT_SERVICE_ACCOUNT);
        self.config.accounts.by_name(name)
    }

    pub fn signer(&self, account: &Account) -> Result<Box<dyn Signer>, ConfigError> {
        if let AccountKey::Kms(_) = account.key {
            account.key.validate(self.credential_hook.as_deref())?;
        }
        account.key.signer(self.rw.as_ref(), self.kms.as_deref())
    }

    /// Every contract deployed on `network` by the configuration, excluding
    /// contracts already aliased there.
    pub fn deployment_contracts_by_network(
        &self,
        network: &str,
    ) -> Result<Vec<DeploymentContract>, ConfigError> {
        let mut contracts = vec![];
        for deployment in self.config.deployments.by_network(network) {
            let account = self.config.accounts.by_name(&deployment.account)?;
            for scheduled in &deployment.contracts {
                let contract = self.config.contracts.by_name(&scheduled.name)?;
                if contract.is_aliased_on(network) {
                    continue;
                }
                let code = self.read_file(&contract.location)?;
                contracts.push(DeploymentContract {
                    name: contract.name.clone(),
                    location: paths::clean(&contract.location),
                    code: String::from_utf8_lossy(&code).to_string(),
                    account_address: account.address,
                    account_name: account.name.clone(),
                    args: scheduled.args.clone(),
                });
            }
        }
        Ok(contracts)
    }

    pub fn aliases_for_network(&self, network: &str) -> HashMap<String, String> {
        self.config.aliases_for_network(network)
    }
}

/// Makes installed dependencies addressable like project contracts.
fn add_dependencies_as_contracts(config: &mut Config) {
    let dependencies: Vec<_> = config.dependencies.iter().cloned().collect();
    for dependency in dependencies {
        let location = format!(
            "{DEPENDENCIES_DIR}/{}/{}.cdc",
            dependency.source.address.to_hex(),
            dependency.source.contract_name
        );
        let mut contract = Contract::new(&dependency.name, &location);
        contract.is_dependency = true;
        for alias in dependency.aliases.iter() {
            contract.aliases.add(&alias.network, alias.address);
        }
        contract
            .aliases
            .add(&dependency.source.network, dependency.source.address);
        config.contracts.add_if_missing(contract);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryReaderWriter;

    const PRIVATE_KEY: &str = "dd72967fd2bd75234ae9037dd4694c1f00baad63a10c35172bf65fbb8ad74b9e";

    fn project() -> String {
        format!(
            r#"{{
                "contracts": {{
                    "Hello": "./cadence/Hello.cdc",
                    "FungibleToken": {{
                        "source": "./cadence/FungibleToken.cdc",
                        "aliases": {{ "emulator": "ee82856bf20e2aa6" }}
                    }}
                }},
                "dependencies": {{ "FlowToken": "testnet://7e60df042a9c0868.FlowToken" }},
                "networks": {{ "emulator": "127.0.0.1:3569", "testnet": "access.devnet.nodes.onflow.org:9000" }},
                "accounts": {{ "emulator-account": {{ "address": "f8d6e0586b0a20c7", "key": "{PRIVATE_KEY}" }} }},
                "deployments": {{ "emulator": {{ "emulator-account": ["Hello", "FungibleToken"] }} }}
            }}"#
        )
    }

    fn load(rw: Arc<MemoryReaderWriter>) -> State {
        State::load(rw, &["project/flow.json".to_string()]).unwrap()
    }

    #[test]
    fn deployment_contracts_skip_aliased_contracts() {
        let rw = Arc::new(
            MemoryReaderWriter::new()
                .with_file("project/flow.json", &project())
                .with_file("project/cadence/Hello.cdc", "access(all) contract Hello {}"),
        );
        let state = load(rw);
        let contracts = state.deployment_contracts_by_network("emulator").unwrap();
        assert_eq!(contracts.len(), 1);
        assert_eq!(contracts[0].name, "Hello");
        assert_eq!(contracts[0].code, "access(all) contract Hello {}");
        assert_eq!(contracts[0].account_name, "emulator-account");
        assert_eq!(contracts[0].location, "cadence/Hello.cdc");
    }

    #[test]
    fn dependencies_become_aliased_contracts() {
        let rw = Arc::new(MemoryReaderWriter::new().with_file("project/flow.json", &project()));
        let state = load(rw);
        let flow_token = state.config().contracts.by_name("FlowToken").unwrap();
        assert!(flow_token.is_dependency);
        assert!(flow_token.is_aliased_on("testnet"));
        assert_eq!(
            state.aliases_for_network("testnet").get("FlowToken").map(String::as_str),
            Some("7e60df042a9c0868")
        );
    }

    #[test]
    fn saving_keeps_dependencies_out_of_contracts() {
        let rw = Arc::new(MemoryReaderWriter::new().with_file("project/flow.json", &project()));
        let state = load(rw.clone());
        state.save_edited(&["project/flow.json".to_string()]).unwrap();
        let saved = rw.content("project/flow.json").unwrap();
        assert!(!saved.contains(r#""FlowToken": {"#));
        assert!(saved.contains(r#""FlowToken": "testnet://7e60df042a9c0868.FlowToken""#));
        assert!(saved.contains(r#""Hello": "./cadence/Hello.cdc""#));
    }

    #[test]
    fn save_edited_refuses_multiple_paths() {
        let rw = Arc::new(MemoryReaderWriter::new());
        let state = State::init(rw, SignatureAlgorithm::EcdsaP256, HashAlgorithm::Sha3_256).unwrap();
        let err = state
            .save_edited(&["a.json".to_string(), "b.json".to_string()])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "specifying multiple paths is not supported when updating configuration"
        );
    }

    #[test]
    fn init_creates_service_account() {
        let rw = Arc::new(MemoryReaderWriter::new());
        let state = State::init(rw.clone(), SignatureAlgorithm::EcdsaP256, HashAlgorithm::Sha3_256)
            .unwrap();
        let service = state.emulator_service_account().unwrap();
        assert_eq!(service.address, ChainId::Emulator.service_address());
        assert!(state.config().validate().is_ok());

        state.save_default().unwrap();
        let reloaded = State::load(rw, &["flow.json".to_string()]).unwrap();
        assert_eq!(reloaded.accounts(), state.accounts());
    }

    #[test]
    fn validation_runs_on_load() {
        let rw = Arc::new(MemoryReaderWriter::new().with_file(
            "flow.json",
            r#"{ "deployments": { "testnet": { "alice": ["Hello"] } } }"#,
        ));
        let err = State::load(rw, &["flow.json".to_string()]).err().unwrap();
        assert_eq!(err.to_string(), "deployment contains nonexisting network testnet");
    }

    struct LocalKms;

    impl KmsClient for LocalKms {
        fn signer(
            &self,
            _resource_id: &str,
            hash_algo: HashAlgorithm,
        ) -> Result<Box<dyn Signer>, ConfigError> {
            let key = PrivateKey::from_hex(SignatureAlgorithm::EcdsaP256, PRIVATE_KEY)
                .map_err(|e| ConfigError::KeyInvalid(e.to_string()))?;
            Ok(Box::new(flowkit_utils::InMemorySigner::new(key, hash_algo)))
        }
    }

    #[test]
    fn kms_signers_acquire_credentials_first() {
        use crate::accounts::{KmsKey, GOOGLE_APPLICATION_CREDENTIALS};
        use std::sync::atomic::{AtomicUsize, Ordering};

        if std::env::var(GOOGLE_APPLICATION_CREDENTIALS).is_ok() {
            return;
        }
        let account = Account {
            name: "kms-account".into(),
            address: ChainId::Emulator.service_address(),
            key: AccountKey::Kms(KmsKey {
                index: 0,
                sig_algo: SignatureAlgorithm::EcdsaP256,
                hash_algo: HashAlgorithm::Sha3_256,
                resource_id: "projects/p/cryptoKeys/k".into(),
                env_token: None,
            }),
        };
        let rw = Arc::new(MemoryReaderWriter::new().with_file("project/flow.json", &project()));

        let denied = load(rw.clone())
            .with_kms_client(Arc::new(LocalKms))
            .with_credential_hook(Arc::new(|_: &str| -> Result<(), String> {
                Err("denied".to_string())
            }));
        let err = denied.signer(&account).err().unwrap();
        assert_eq!(
            err.to_string(),
            ConfigError::KeyInvalid(
                "could not acquire credentials for projects/p/cryptoKeys/k: denied".into()
            )
            .to_string()
        );

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let granted = load(rw)
            .with_kms_client(Arc::new(LocalKms))
            .with_credential_hook(Arc::new(move |_: &str| -> Result<(), String> {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
        assert!(granted.signer(&account).is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let no_hook = load(Arc::new(
            MemoryReaderWriter::new().with_file("project/flow.json", &project()),
        ))
        .with_kms_client(Arc::new(LocalKms));
        assert!(no_hook.signer(&account).is_err());
    }
}
