//! `flow.json` codec.
//!
//! Decoding probes `serde_json::Value` trees so that the short and long forms
//! of every entry, as well as the legacy account and contract shapes, can be
//! told apart by shape. Encoding always produces the current format.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

use flow_codec::{Address, ChainId, Value};
use flowkit_utils::{HashAlgorithm, PrivateKey, SignatureAlgorithm};

use crate::accounts::{Account, AccountKey, Accounts, Bip44Key, FileKey, HexKey, KeyType, KmsKey};
use crate::config::Config;
use crate::contracts::{Alias, Contract, Contracts};
use crate::dependencies::{Dependencies, Dependency, RemoteSource};
use crate::deployments::{ContractDeployment, Deployment, Deployments};
use crate::emulators::{Emulator, Emulators, DEFAULT_EMULATOR_PORT, DEFAULT_SERVICE_ACCOUNT};
use crate::env::{self, EnvLookup, EnvTokens};
use crate::networks::{Network, Networks};
use crate::paths;
use crate::ConfigError;

/// Sentinel address standing for the emulator service account.
pub const SERVICE_ADDRESS_SENTINEL: &str = "service";

/// Decodes a configuration document, substituting env references with `lookup`.
pub fn decode(bytes: &[u8], lookup: &EnvLookup) -> Result<Config, ConfigError> {
    let mut document: JsonValue =
        serde_json::from_slice(bytes).map_err(|e| ConfigError::Syntax(e.to_string()))?;
    let tokens = env::substitute(&mut document, lookup)?;
    let root = document
        .as_object()
        .ok_or_else(|| ConfigError::Syntax("configuration must be a JSON object".into()))?;

    let decoder = Decoder { tokens: &tokens };
    let mut config = Config {
        emulators: decoder.emulators(root.get("emulators"))?,
        contracts: decoder.contracts(root.get("contracts"))?,
        dependencies: decoder.dependencies(root.get("dependencies"))?,
        networks: decoder.networks(root.get("networks"))?,
        accounts: decoder.accounts(root.get("accounts"))?,
        deployments: decoder.deployments(root.get("deployments"))?,
    };
    config.inject_default_emulator();
    Ok(config)
}

/// Encodes `config` in the current format.
pub fn encode(config: &Config) -> Result<Vec<u8>, ConfigError> {
    let mut bytes =
        serde_json::to_vec_pretty(config).map_err(|e| ConfigError::Syntax(e.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

struct Decoder<'a> {
    tokens: &'a EnvTokens,
}

fn object<'v>(
    value: &'v JsonValue,
    what: &str,
) -> Result<&'v Map<String, JsonValue>, ConfigError> {
    value
        .as_object()
        .ok_or_else(|| ConfigError::Syntax(format!("{what} must be an object")))
}

fn string<'v>(value: &'v JsonValue, what: &str) -> Result<&'v str, ConfigError> {
    value
        .as_str()
        .ok_or_else(|| ConfigError::Syntax(format!("{what} must be a string")))
}

fn optional_string<'v>(
    entry: &'v Map<String, JsonValue>,
    field: &str,
    what: &str,
) -> Result<Option<&'v str>, ConfigError> {
    match entry.get(field) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(value) => string(value, &format!("{what} {field}")).map(Some),
    }
}

fn parse_address(value: &str) -> Result<Address, ConfigError> {
    if value == SERVICE_ADDRESS_SENTINEL {
        return Ok(ChainId::Emulator.service_address());
    }
    Address::from_hex(value)
        .map_err(|_| ConfigError::InvalidValue(format!("invalid address {value}")))
}

fn pointer(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|part| format!("/{}", env::escape(part)))
        .collect()
}

impl<'a> Decoder<'a> {
    fn emulators(&self, section: Option<&JsonValue>) -> Result<Emulators, ConfigError> {
        let mut emulators = Emulators::new();
        let Some(section) = section else {
            return Ok(emulators);
        };
        for (name, value) in object(section, "emulators")? {
            let entry = object(value, &format!("emulator {name}"))?;
            let port = match entry.get("port") {
                None => DEFAULT_EMULATOR_PORT,
                Some(port) => port
                    .as_u64()
                    .and_then(|p| u16::try_from(p).ok())
                    .ok_or_else(|| {
                        ConfigError::InvalidValue(format!("invalid port for emulator {name}"))
                    })?,
            };
            let service_account = optional_string(entry, "serviceAccount", "emulator")?
                .unwrap_or(DEFAULT_SERVICE_ACCOUNT);
            emulators.add_or_update(Emulator {
                name: name.clone(),
                port,
                service_account: service_account.to_string(),
            });
        }
        Ok(emulators)
    }

    fn contracts(&self, section: Option<&JsonValue>) -> Result<Contracts, ConfigError> {
        let mut contracts = Contracts::new();
        let Some(section) = section else {
            return Ok(contracts);
        };
        for (name, value) in object(section, "contracts")? {
            let contract = match value {
                JsonValue::String(location) => Contract::new(name, &paths::from_slash(location)),
                JsonValue::Object(entry) if entry.contains_key("source") => {
                    let source = string(&entry["source"], &format!("contract {name} source"))?;
                    let mut contract = Contract::new(name, &paths::from_slash(source));
                    if let Some(aliases) = entry.get("aliases") {
                        for (network, address) in object(aliases, &format!("contract {name} aliases"))? {
                            let address = string(address, &format!("contract {name} alias"))?;
                            contract.aliases.add(network, parse_address(address)?);
                        }
                    }
                    contract
                }
                JsonValue::Object(per_network) => self.legacy_contract(name, per_network)?,
                _ => {
                    return Err(ConfigError::Syntax(format!(
                        "contract {name} must be a path or an object"
                    )))
                }
            };
            contracts.add_or_update(contract);
        }
        Ok(contracts)
    }

    /// Older files kept one source path per network.
    fn legacy_contract(
        &self,
        name: &str,
        per_network: &Map<String, JsonValue>,
    ) -> Result<Contract, ConfigError> {
        let mut location: Option<&str> = None;
        for (network, value) in per_network {
            let path = string(value, &format!("contract {name} source for {network}"))?;
            match location {
                Some(existing) if existing != path => {
                    return Err(ConfigError::Outdated(format!(
                        "contract {name} uses different sources per network"
                    )))
                }
                _ => location = Some(path),
            }
        }
        let location = location.ok_or_else(|| {
            ConfigError::Syntax(format!("contract {name} is missing a source"))
        })?;
        Ok(Contract::new(name, &paths::from_slash(location)))
    }

    fn dependencies(&self, section: Option<&JsonValue>) -> Result<Dependencies, ConfigError> {
        let mut dependencies = Dependencies::new();
        let Some(section) = section else {
            return Ok(dependencies);
        };
        for (name, value) in object(section, "dependencies")? {
            let dependency = match value {
                JsonValue::String(source) => Dependency::new(name, source.parse()?),
                JsonValue::Object(entry) => {
                    let source = optional_string(entry, "remoteSource", "dependency")?
                        .or(optional_string(entry, "source", "dependency")?)
                        .ok_or_else(|| {
                            ConfigError::Syntax(format!("dependency {name} is missing a source"))
                        })?;
                    let source: RemoteSource = source.parse()?;
                    let mut dependency = Dependency::new(name, source);
                    if let Some(hash) = optional_string(entry, "hash", "dependency")? {
                        dependency.hash = hash.to_string();
                    }
                    if let Some(aliases) = entry.get("aliases") {
                        for (network, address) in
                            object(aliases, &format!("dependency {name} aliases"))?
                        {
                            let address = string(address, &format!("dependency {name} alias"))?;
                            dependency.aliases.add(network, parse_address(address)?);
                        }
                    }
                    dependency
                }
                _ => {
                    return Err(ConfigError::Syntax(format!(
                        "dependency {name} must be a source or an object"
                    )))
                }
            };
            dependencies.add_or_update(dependency);
        }
        Ok(dependencies)
    }

    fn networks(&self, section: Option<&JsonValue>) -> Result<Networks, ConfigError> {
        let mut networks = Networks::new();
        let Some(section) = section else {
            return Ok(networks);
        };
        for (name, value) in object(section, "networks")? {
            let network = match value {
                JsonValue::String(host) => Network::new(name, host),
                JsonValue::Object(entry) => {
                    let host = optional_string(entry, "host", "network")?.ok_or_else(|| {
                        ConfigError::Syntax(format!("network {name} is missing a host"))
                    })?;
                    match optional_string(entry, "key", "network")? {
                        Some(key) => Network::with_key(name, host, key)?,
                        None => Network::new(name, host),
                    }
                }
                _ => {
                    return Err(ConfigError::Syntax(format!(
                        "network {name} must be a host or an object"
                    )))
                }
            };
            networks.add_or_update(network);
        }
        Ok(networks)
    }

    fn accounts(&self, section: Option<&JsonValue>) -> Result<Accounts, ConfigError> {
        let mut accounts = Accounts::new();
        let Some(section) = section else {
            return Ok(accounts);
        };
        for (name, value) in object(section, "accounts")? {
            let entry = object(value, &format!("account {name}"))?;
            let address = optional_string(entry, "address", "account")?.ok_or_else(|| {
                ConfigError::Syntax(format!("account {name} is missing an address"))
            })?;
            let address = parse_address(address)?;

            let key = match (entry.get("key"), entry.get("keys")) {
                (Some(key), _) => self.account_key(name, key)?,
                (None, Some(keys)) => self.legacy_account_key(name, keys)?,
                (None, None) => {
                    return Err(ConfigError::Syntax(format!(
                        "account {name} is missing a key"
                    )))
                }
            };
            accounts.add_or_update(Account {
                name: name.clone(),
                address,
                key,
            });
        }
        Ok(accounts)
    }

    fn account_key(&self, name: &str, key: &JsonValue) -> Result<AccountKey, ConfigError> {
        match key {
            JsonValue::String(hex) => {
                let token = self.tokens.token_at(&pointer(&["accounts", name, "key"]));
                hex_key(name, hex, SignatureAlgorithm::default(), HashAlgorithm::default(), 0, token)
            }
            JsonValue::Object(entry) => {
                self.advanced_key(name, entry, pointer(&["accounts", name, "key"]))
            }
            _ => Err(ConfigError::Syntax(format!(
                "account {name} key must be a string or an object"
            ))),
        }
    }

    fn advanced_key(
        &self,
        name: &str,
        entry: &Map<String, JsonValue>,
        at: String,
    ) -> Result<AccountKey, ConfigError> {
        let sig_algo = match optional_string(entry, "signatureAlgorithm", "key")? {
            Some(algo) => algo
                .parse::<SignatureAlgorithm>()
                .map_err(|e| ConfigError::KeyInvalid(e.to_string()))?,
            None => SignatureAlgorithm::default(),
        };
        let hash_algo = match optional_string(entry, "hashAlgorithm", "key")? {
            Some(algo) => algo
                .parse::<HashAlgorithm>()
                .map_err(|e| ConfigError::KeyInvalid(e.to_string()))?,
            None => HashAlgorithm::default(),
        };
        let index = match entry.get("index") {
            None => 0,
            Some(index) => index
                .as_u64()
                .and_then(|i| u32::try_from(i).ok())
                .ok_or_else(|| ConfigError::KeyInvalid(format!("invalid key index for account {name}")))?,
        };

        let private_key = optional_string(entry, "privateKey", "key")?;
        let mnemonic = optional_string(entry, "mnemonic", "key")?;
        let resource_id = optional_string(entry, "resourceID", "key")?;
        let location = optional_string(entry, "location", "key")?;
        let present = [
            private_key.map(|_| KeyType::Hex),
            mnemonic.map(|_| KeyType::Bip44),
            resource_id.map(|_| KeyType::Kms),
            location.map(|_| KeyType::File),
        ];
        let mut present = present.into_iter().flatten();
        let inferred = match (present.next(), present.next()) {
            (Some(kind), None) => kind,
            (None, _) => {
                return Err(ConfigError::KeyInvalid(format!(
                    "account {name} key must contain one of privateKey, mnemonic, resourceID or location"
                )))
            }
            (Some(_), Some(_)) => {
                return Err(ConfigError::KeyInvalid(format!(
                    "account {name} key must contain only one of privateKey, mnemonic, resourceID or location"
                )))
            }
        };
        if let Some(declared) = optional_string(entry, "type", "key")? {
            let declared = KeyType::parse(declared).ok_or_else(|| {
                ConfigError::KeyInvalid(format!("invalid key type {declared} for account {name}"))
            })?;
            if declared != inferred {
                return Err(ConfigError::KeyInvalid(format!(
                    "account {name} key of type {declared} does not match the provided key material"
                )));
            }
        }

        let key = match inferred {
            KeyType::Hex => {
                let token = self.tokens.token_at(&format!("{at}/privateKey"));
                hex_key(name, private_key.unwrap_or_default(), sig_algo, hash_algo, index, token)?
            }
            KeyType::Bip44 => {
                let mut key = Bip44Key::new(
                    mnemonic.unwrap_or_default(),
                    optional_string(entry, "derivationPath", "key")?,
                    sig_algo,
                    hash_algo,
                    index,
                );
                key.env_token = self.tokens.token_at(&format!("{at}/mnemonic"));
                AccountKey::Bip44(key)
            }
            KeyType::Kms => AccountKey::Kms(KmsKey {
                index,
                sig_algo,
                hash_algo,
                resource_id: resource_id.unwrap_or_default().to_string(),
                env_token: self.tokens.token_at(&format!("{at}/resourceID")),
            }),
            KeyType::File => AccountKey::File(FileKey::new(
                &paths::from_slash(location.unwrap_or_default()),
                sig_algo,
                hash_algo,
                index,
            )),
        };
        Ok(key)
    }

    /// `keys` held either a single hex string or a list of key objects.
    fn legacy_account_key(&self, name: &str, keys: &JsonValue) -> Result<AccountKey, ConfigError> {
        match keys {
            JsonValue::String(hex) => {
                let token = self.tokens.token_at(&pointer(&["accounts", name, "keys"]));
                hex_key(name, hex, SignatureAlgorithm::default(), HashAlgorithm::default(), 0, token)
            }
            JsonValue::Array(list) if list.len() == 1 => {
                let entry = object(&list[0], &format!("account {name} key"))?;
                let mut flattened = entry.clone();
                if let Some(context) = entry.get("context") {
                    for (field, value) in object(context, &format!("account {name} key context"))? {
                        flattened.insert(field.clone(), value.clone());
                    }
                }
                flattened.remove("context");
                let at = pointer(&["accounts", name, "keys", "0", "context"]);
                self.advanced_key(name, &flattened, at)
            }
            JsonValue::Array(_) => Err(ConfigError::Outdated(format!(
                "account {name} defines multiple keys"
            ))),
            _ => Err(ConfigError::Syntax(format!(
                "account {name} keys must be a string or a list"
            ))),
        }
    }

    fn deployments(&self, section: Option<&JsonValue>) -> Result<Deployments, ConfigError> {
        let mut deployments = Deployments::new();
        let Some(section) = section else {
            return Ok(deployments);
        };
        for (network, accounts) in object(section, "deployments")? {
            for (account, contracts) in object(accounts, &format!("deployments for {network}"))? {
                let list = contracts.as_array().ok_or_else(|| {
                    ConfigError::Syntax(format!(
                        "deployment of {account} on {network} must be a list"
                    ))
                })?;
                let mut deployment = Deployment::new(network, account);
                for contract in list {
                    deployment.add_contract(deployment_contract(contract)?);
                }
                deployments.add_or_update(deployment);
            }
        }
        Ok(deployments)
    }
}

fn hex_key(
    name: &str,
    value: &str,
    sig_algo: SignatureAlgorithm,
    hash_algo: HashAlgorithm,
    index: u32,
    env_token: Option<String>,
) -> Result<AccountKey, ConfigError> {
    let private_key = PrivateKey::from_hex(sig_algo, value.trim_start_matches("0x")).map_err(|e| {
        ConfigError::KeyInvalid(format!("invalid private key for account {name}: {e}"))
    })?;
    Ok(AccountKey::Hex(HexKey {
        index,
        sig_algo,
        hash_algo,
        private_key,
        env_token,
    }))
}

fn deployment_contract(value: &JsonValue) -> Result<ContractDeployment, ConfigError> {
    match value {
        JsonValue::String(name) => Ok(ContractDeployment::new(name)),
        JsonValue::Object(entry) => {
            let name = optional_string(entry, "name", "deployment contract")?.ok_or_else(|| {
                ConfigError::Syntax("deployment contract is missing a name".into())
            })?;
            let args = match entry.get("args") {
                None | Some(JsonValue::Null) => vec![],
                Some(JsonValue::Array(args)) => args
                    .iter()
                    .map(|arg| {
                        Value::from_json(arg).map_err(|e| {
                            ConfigError::InvalidValue(format!(
                                "invalid argument for contract {name}: {e}"
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                Some(_) => {
                    return Err(ConfigError::Syntax(format!(
                        "arguments of contract {name} must be a list"
                    )))
                }
            };
            Ok(ContractDeployment::with_args(name, args))
        }
        _ => Err(ConfigError::Syntax(
            "deployment contract must be a name or an object".into(),
        )),
    }
}

impl Serialize for Config {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        if !self.emulators.is_empty() && !self.emulators.is_default() {
            map.serialize_entry("emulators", &EmulatorsJson(&self.emulators))?;
        }
        if self.contracts.iter().any(|c| !c.is_dependency) {
            map.serialize_entry("contracts", &ContractsJson(&self.contracts))?;
        }
        if !self.dependencies.is_empty() {
            map.serialize_entry("dependencies", &DependenciesJson(&self.dependencies))?;
        }
        if !self.networks.is_empty() {
            map.serialize_entry("networks", &NetworksJson(&self.networks))?;
        }
        if !self.accounts.is_empty() {
            map.serialize_entry("accounts", &AccountsJson(&self.accounts))?;
        }
        if !self.deployments.is_empty() {
            map.serialize_entry("deployments", &DeploymentsJson(&self.deployments))?;
        }
        map.end()
    }
}

struct EmulatorsJson<'a>(&'a Emulators);

impl Serialize for EmulatorsJson<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for emulator in self.0 {
            let mut entry = Map::new();
            entry.insert("port".into(), emulator.port.into());
            entry.insert("serviceAccount".into(), emulator.service_account.clone().into());
            map.serialize_entry(&emulator.name, &entry)?;
        }
        map.end()
    }
}

fn aliases_json<'a>(aliases: impl Iterator<Item = &'a Alias>) -> Map<String, JsonValue> {
    aliases
        .map(|alias| (alias.network.clone(), alias.address.to_hex().into()))
        .collect()
}

struct ContractsJson<'a>(&'a Contracts);

impl Serialize for ContractsJson<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for contract in self.0.iter().filter(|c| !c.is_dependency) {
            let location = paths::to_slash(&contract.location);
            if contract.aliases.is_empty() {
                map.serialize_entry(&contract.name, &location)?;
            } else {
                let mut entry = Map::new();
                entry.insert("source".into(), location.into());
                entry.insert("aliases".into(), aliases_json(contract.aliases.iter()).into());
                map.serialize_entry(&contract.name, &entry)?;
            }
        }
        map.end()
    }
}

struct DependenciesJson<'a>(&'a Dependencies);

impl Serialize for DependenciesJson<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for dependency in self.0 {
            let source = dependency.source.to_string();
            if dependency.hash.is_empty() && dependency.aliases.is_empty() {
                map.serialize_entry(&dependency.name, &source)?;
            } else {
                let mut entry = Map::new();
                entry.insert("remoteSource".into(), source.into());
                if !dependency.hash.is_empty() {
                    entry.insert("hash".into(), dependency.hash.clone().into());
                }
                if !dependency.aliases.is_empty() {
                    entry.insert("aliases".into(), aliases_json(dependency.aliases.iter()).into());
                }
                map.serialize_entry(&dependency.name, &entry)?;
            }
        }
        map.end()
    }
}

struct NetworksJson<'a>(&'a Networks);

impl Serialize for NetworksJson<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for network in self.0 {
            match &network.key {
                None => map.serialize_entry(&network.name, &network.host)?,
                Some(key) => {
                    let mut entry = Map::new();
                    entry.insert("host".into(), network.host.clone().into());
                    entry.insert("key".into(), key.clone().into());
                    map.serialize_entry(&network.name, &entry)?;
                }
            }
        }
        map.end()
    }
}

struct AccountsJson<'a>(&'a Accounts);

impl Serialize for AccountsJson<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for account in self.0 {
            let mut entry = Map::new();
            entry.insert("address".into(), account.address.to_hex().into());
            entry.insert("key".into(), key_json(&account.key));
            map.serialize_entry(&account.name, &entry)?;
        }
        map.end()
    }
}

fn key_json(key: &AccountKey) -> JsonValue {
    if let AccountKey::Hex(hex) = key {
        if key.is_default() {
            return hex
                .env_token
                .clone()
                .unwrap_or_else(|| hex.private_key.to_hex())
                .into();
        }
    }

    let mut entry = Map::new();
    entry.insert("type".into(), key.key_type().as_str().into());
    entry.insert("index".into(), key.index().into());
    entry.insert("signatureAlgorithm".into(), key.sig_algo().as_str().into());
    entry.insert("hashAlgorithm".into(), key.hash_algo().as_str().into());
    match key {
        AccountKey::Hex(k) => {
            let material = k.env_token.clone().unwrap_or_else(|| k.private_key.to_hex());
            entry.insert("privateKey".into(), material.into());
        }
        AccountKey::Bip44(k) => {
            let mnemonic = k.env_token.clone().unwrap_or_else(|| k.mnemonic.clone());
            entry.insert("mnemonic".into(), mnemonic.into());
            entry.insert("derivationPath".into(), k.derivation_path.clone().into());
        }
        AccountKey::Kms(k) => {
            let resource_id = k.env_token.clone().unwrap_or_else(|| k.resource_id.clone());
            entry.insert("resourceID".into(), resource_id.into());
        }
        AccountKey::File(k) => {
            entry.insert("location".into(), paths::to_slash(&k.location).into());
        }
    }
    entry.into()
}

struct DeploymentsJson<'a>(&'a Deployments);

impl Serialize for DeploymentsJson<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut networks: Map<String, JsonValue> = Map::new();
        for deployment in self.0 {
            let contracts: Vec<JsonValue> = deployment
                .contracts
                .iter()
                .map(|contract| {
                    if contract.args.is_empty() {
                        JsonValue::String(contract.name.clone())
                    } else {
                        let mut entry = Map::new();
                        entry.insert("name".into(), contract.name.clone().into());
                        entry.insert(
                            "args".into(),
                            contract.args.iter().map(Value::to_json).collect::<Vec<_>>().into(),
                        );
                        entry.into()
                    }
                })
                .collect();
            let accounts = networks
                .entry(deployment.network.clone())
                .or_insert_with(|| JsonValue::Object(Map::new()));
            if let Some(accounts) = accounts.as_object_mut() {
                accounts.insert(deployment.account.clone(), contracts.into());
            }
        }
        let mut map = serializer.serialize_map(Some(networks.len()))?;
        for (network, accounts) in &networks {
            map.serialize_entry(network, accounts)?;
        }
        map.end()
    }
}
