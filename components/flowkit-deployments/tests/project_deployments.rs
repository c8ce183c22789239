use std::sync::Arc;

use flowkit_deployments::{order_contracts, DeploymentError, ImportReplacer, Program};
use flowkit_files::{MemoryReaderWriter, State};

const PROJECT: &str = r#"{
    "contracts": {
        "A": "./cadence/A.cdc",
        "C": "./cadence/C.cdc",
        "D": "./cadence/D.cdc",
        "FungibleToken": {
            "source": "./cadence/FungibleToken.cdc",
            "aliases": { "emulator": "ee82856bf20e2aa6" }
        }
    },
    "networks": { "emulator": "127.0.0.1:3569" },
    "accounts": {
        "emulator-account": {
            "address": "f8d6e0586b0a20c7",
            "key": "dd72967fd2bd75234ae9037dd4694c1f00baad63a10c35172bf65fbb8ad74b9e"
        },
        "alice": {
            "address": "01cf0e2f2f715450",
            "key": "dd72967fd2bd75234ae9037dd4694c1f00baad63a10c35172bf65fbb8ad74b9e"
        }
    },
    "deployments": {
        "emulator": {
            "alice": ["D", "C"],
            "emulator-account": ["A", "FungibleToken"]
        }
    }
}"#;

fn project(d_code: &str) -> State {
    let rw = MemoryReaderWriter::new()
        .with_file("flow.json", PROJECT)
        .with_file("cadence/A.cdc", "pub contract A {}")
        .with_file(
            "cadence/C.cdc",
            "import A from \"./A.cdc\"\nimport FungibleToken from \"./FungibleToken.cdc\"\npub contract C {}",
        )
        .with_file("cadence/D.cdc", d_code);
    State::load(Arc::new(rw), &["flow.json".to_string()]).unwrap()
}

#[test]
fn deploys_a_chain_in_dependency_order() {
    let state = project("import C from \"./C.cdc\"\npub contract D {}");
    let contracts = state.deployment_contracts_by_network("emulator").unwrap();
    let aliases = state.aliases_for_network("emulator");

    let sorted = order_contracts(&contracts, &aliases).unwrap();
    let names: Vec<&str> = sorted.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["A", "C", "D"]);

    let replacer = ImportReplacer::new(&contracts, &aliases);
    let c = sorted[1];
    let mut program = Program::new(&c.code, c.args.clone(), &c.location).unwrap();
    replacer.replace(&mut program).unwrap();
    assert_eq!(
        program.code(),
        "import A from 0xf8d6e0586b0a20c7\nimport FungibleToken from 0xee82856bf20e2aa6\npub contract C {}"
    );
    assert_eq!(
        program.development_code(),
        "import \"A\"\nimport \"FungibleToken\"\npub contract C {}"
    );
}

#[test]
fn cyclic_projects_are_rejected() {
    let rw = MemoryReaderWriter::new()
        .with_file(
            "flow.json",
            r#"{
                "contracts": { "E": "./E.cdc", "F": "./F.cdc" },
                "networks": { "emulator": "127.0.0.1:3569" },
                "accounts": { "alice": { "address": "01", "key": "dd72967fd2bd75234ae9037dd4694c1f00baad63a10c35172bf65fbb8ad74b9e" } },
                "deployments": { "emulator": { "alice": ["E", "F"] } }
            }"#,
        )
        .with_file("E.cdc", "import F from \"./F.cdc\"\npub contract E {}")
        .with_file("F.cdc", "import E from \"./E.cdc\"\npub contract F {}");
    let state = State::load(Arc::new(rw), &["flow.json".to_string()]).unwrap();
    let contracts = state.deployment_contracts_by_network("emulator").unwrap();

    match order_contracts(&contracts, &state.aliases_for_network("emulator")) {
        Err(DeploymentError::CyclicImport { cycles }) => {
            assert_eq!(cycles, vec![vec!["E".to_string(), "F".to_string()]]);
        }
        other => panic!("expected a cyclic import error, got {other:?}"),
    }
}

#[test]
fn unknown_imports_abort_planning() {
    let state = project("import Missing from \"./Missing.cdc\"\npub contract D {}");
    let contracts = state.deployment_contracts_by_network("emulator").unwrap();
    let err = order_contracts(&contracts, &state.aliases_for_network("emulator")).unwrap_err();
    assert_eq!(
        err,
        DeploymentError::ImportNotFound {
            contract: "D".into(),
            import: "./Missing.cdc".into()
        }
    );
}
