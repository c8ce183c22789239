use std::collections::BTreeMap;

use schemars::{schema_for, JsonSchema};
use serde_json::Value as JsonValue;

use crate::{ConfigError, ReaderWriter};

/// Shape of a `flow.json` document, used only to describe it.
#[derive(Serialize, Deserialize, Debug, JsonSchema)]
#[schemars(title = "flow.json")]
pub(crate) struct ConfigFile {
    /// Local emulator instances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    emulators: Option<BTreeMap<String, EmulatorEntry>>,
    /// Project contracts by name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    contracts: Option<BTreeMap<String, ContractEntry>>,
    /// Contracts installed from other networks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dependencies: Option<BTreeMap<String, DependencyEntry>>,
    /// Access nodes by network name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    networks: Option<BTreeMap<String, NetworkEntry>>,
    /// Named accounts and their keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    accounts: Option<BTreeMap<String, AccountEntry>>,
    /// Network name, then account name, then contracts to deploy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    deployments: Option<BTreeMap<String, BTreeMap<String, Vec<DeploymentContractEntry>>>>,
}

#[derive(Serialize, Deserialize, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EmulatorEntry {
    port: u16,
    service_account: String,
}

#[derive(Serialize, Deserialize, Debug, JsonSchema)]
#[serde(untagged)]
pub(crate) enum ContractEntry {
    /// Path of the contract source.
    Simple(String),
    Advanced {
        source: String,
        /// Network name to the address the contract is already deployed at.
        #[serde(default)]
        aliases: BTreeMap<String, String>,
    },
}

#[derive(Serialize, Deserialize, Debug, JsonSchema)]
#[serde(untagged)]
pub(crate) enum DependencyEntry {
    /// `network://address.ContractName`
    Simple(String),
    #[serde(rename_all = "camelCase")]
    Advanced {
        remote_source: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hash: Option<String>,
        #[serde(default)]
        aliases: BTreeMap<String, String>,
    },
}

#[derive(Serialize, Deserialize, Debug, JsonSchema)]
#[serde(untagged)]
pub(crate) enum NetworkEntry {
    /// `host:port`
    Simple(String),
    Advanced {
        host: String,
        /// Hex ECDSA_P256 public key of the access node.
        key: String,
    },
}

#[derive(Serialize, Deserialize, Debug, JsonSchema)]
pub(crate) struct AccountEntry {
    /// Hex address, or `service` for the emulator service account.
    address: String,
    key: KeyEntry,
}

#[derive(Serialize, Deserialize, Debug, JsonSchema)]
#[serde(untagged)]
pub(crate) enum KeyEntry {
    /// Hex ECDSA_P256 private key used with SHA3_256.
    Simple(String),
    Advanced(AdvancedKeyEntry),
}

#[derive(Serialize, Deserialize, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AdvancedKeyEntry {
    /// One of `hex`, `bip44`, `google-kms` or `file`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    key_type: Option<String>,
    #[serde(default)]
    index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signature_algorithm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hash_algorithm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    private_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mnemonic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    derivation_path: Option<String>,
    #[serde(rename = "resourceID", default, skip_serializing_if = "Option::is_none")]
    resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, JsonSchema)]
#[serde(untagged)]
pub(crate) enum DeploymentContractEntry {
    Simple(String),
    Advanced {
        name: String,
        /// JSON-Cadence initializer arguments.
        #[serde(default)]
        args: Vec<JsonValue>,
    },
}

/// JSON Schema describing `flow.json`.
pub fn generate_schema() -> JsonValue {
    serde_json::to_value(schema_for!(ConfigFile)).unwrap_or(JsonValue::Null)
}

/// Pretty printed schema, as stored on disk.
pub fn generate_schema_bytes() -> Result<Vec<u8>, ConfigError> {
    let mut bytes = serde_json::to_vec_pretty(&generate_schema())
        .map_err(|e| ConfigError::Syntax(e.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

pub fn write_schema(rw: &dyn ReaderWriter, path: &str) -> Result<(), ConfigError> {
    rw.write_file(path, &generate_schema_bytes()?, 0o644)
        .map_err(|e| ConfigError::Io(format!("could not write schema to {path}: {e}")))
}

/// Compares the schema stored at `path` with a fresh generation.
pub fn verify_schema(rw: &dyn ReaderWriter, path: &str) -> Result<bool, ConfigError> {
    let stored = rw
        .read_file(path)
        .map_err(|e| ConfigError::Io(format!("could not read schema from {path}: {e}")))?;
    Ok(stored == generate_schema_bytes()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryReaderWriter;

    #[test]
    fn schema_describes_every_section() {
        let schema = generate_schema();
        let properties = schema["properties"].as_object().unwrap();
        for section in [
            "emulators",
            "contracts",
            "dependencies",
            "networks",
            "accounts",
            "deployments",
        ] {
            assert!(properties.contains_key(section), "{section}");
        }
    }

    #[test]
    fn verify_detects_stale_schema() {
        let rw = MemoryReaderWriter::new();
        write_schema(&rw, "flow-schema.json").unwrap();
        assert!(verify_schema(&rw, "flow-schema.json").unwrap());

        let rw = MemoryReaderWriter::new().with_file("flow-schema.json", "{}");
        assert!(!verify_schema(&rw, "flow-schema.json").unwrap());
        assert!(verify_schema(&rw, "missing.json").is_err());
    }
}
