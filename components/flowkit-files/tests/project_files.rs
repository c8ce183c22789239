use std::sync::Arc;

use flow_codec::Address;
use flowkit_files::{
    Account, AccountKey, Contract, ContractDeployment, FileSystemReaderWriter, ReaderWriter, State,
};
use flowkit_utils::{HashAlgorithm, PrivateKey, SignatureAlgorithm};

const PROJECT: &str = r#"{
  "contracts": {
    "Counter": "./cadence/contracts/Counter.cdc"
  },
  "networks": {
    "emulator": "127.0.0.1:3569",
    "testnet": "access.devnet.nodes.onflow.org:9000"
  },
  "accounts": {
    "emulator-account": {
      "address": "f8d6e0586b0a20c7",
      "key": "dd72967fd2bd75234ae9037dd4694c1f00baad63a10c35172bf65fbb8ad74b9e"
    }
  },
  "deployments": {
    "emulator": {
      "emulator-account": [
        "Counter"
      ]
    }
  }
}
"#;

fn write(rw: &FileSystemReaderWriter, path: &std::path::Path, content: &str) {
    rw.write_file(path.to_str().unwrap(), content.as_bytes(), 0o644)
        .unwrap();
}

#[test]
fn edits_are_persisted_and_reloaded() {
    let dir = tempfile::tempdir().unwrap();
    let rw = FileSystemReaderWriter::new();
    let config_path = dir.path().join("flow.json");
    write(&rw, &config_path, PROJECT);
    write(
        &rw,
        &dir.path().join("cadence/contracts/Counter.cdc"),
        "access(all) contract Counter { init() {} }",
    );
    let config_path = config_path.to_str().unwrap().to_string();

    let mut state = State::load(Arc::new(rw), &[config_path.clone()]).unwrap();
    let contracts = state.deployment_contracts_by_network("emulator").unwrap();
    assert_eq!(contracts.len(), 1);
    assert!(contracts[0].code.contains("contract Counter"));

    let key = PrivateKey::from_seed(SignatureAlgorithm::EcdsaSecp256k1, &[9u8; 32]).unwrap();
    let config = state.config_mut();
    config.accounts.add_or_update(Account {
        name: "testnet-account".into(),
        address: Address::from_hex("0x179b6b1cb6755e31").unwrap(),
        key: AccountKey::hex(key, HashAlgorithm::Sha2_256),
    });
    config
        .contracts
        .add_or_update(Contract::new("Greeting", "cadence/contracts/Greeting.cdc"));
    config.deployments.add_contract(
        "testnet-account",
        "testnet",
        ContractDeployment::new("Greeting"),
    );
    state.save_edited(&[config_path.clone()]).unwrap();

    let reloaded = State::load(Arc::new(FileSystemReaderWriter::new()), &[config_path]).unwrap();
    let account = reloaded.accounts().by_name("testnet-account").unwrap();
    assert_eq!(account.key.sig_algo(), SignatureAlgorithm::EcdsaSecp256k1);
    assert_eq!(account.key.hash_algo(), HashAlgorithm::Sha2_256);
    assert!(reloaded
        .config()
        .deployments
        .by_account_and_network("testnet-account", "testnet")
        .is_some());
    assert_eq!(reloaded.config(), state.config());
}

#[test]
fn unchanged_projects_are_saved_byte_for_byte() {
    let dir = tempfile::tempdir().unwrap();
    let rw = FileSystemReaderWriter::new();
    let config_path = dir.path().join("flow.json");
    write(&rw, &config_path, PROJECT);
    let config_path = config_path.to_str().unwrap().to_string();

    let state = State::load(Arc::new(rw), &[config_path.clone()]).unwrap();
    state.save(&config_path).unwrap();
    let saved = std::fs::read_to_string(&config_path).unwrap();
    assert_eq!(saved, PROJECT);
}
