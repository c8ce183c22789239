use regex::Regex;

use flow_codec::{Address, Value};

use crate::cadence::{self, Declaration, ImportLocation, Parameter, TransactionDeclaration};
use crate::DeploymentError;

lazy_static! {
    static ref ADDRESS_IMPORT: Regex =
        Regex::new(r"import\s+(\w+)\s+from\s+0x[0-9a-fA-F]+").expect("address import pattern");
}

/// `import X from 0xADDR` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressImport {
    pub identifier: String,
    pub address: Address,
}

/// A Cadence source unit with its location and arguments.
#[derive(Debug, Clone)]
pub struct Program {
    code: String,
    args: Vec<Value>,
    location: String,
    declarations: Vec<Declaration>,
    development_code: String,
}

impl Program {
    pub fn new(code: &str, args: Vec<Value>, location: &str) -> Result<Program, DeploymentError> {
        let declarations = parse(code, location)?;
        let mut program = Program {
            code: code.to_string(),
            args,
            location: location.to_string(),
            declarations,
            development_code: String::new(),
        };
        program.convert_address_imports();
        Ok(program)
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Source with every address import written as `import "X"`.
    pub fn development_code(&self) -> &str {
        &self.development_code
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn set_location(&mut self, location: &str) {
        self.location = location.to_string();
    }

    /// String-form import locations, verbatim.
    pub fn imports(&self) -> Vec<String> {
        self.declarations
            .iter()
            .filter_map(|declaration| match declaration {
                Declaration::Import(import) => match &import.location {
                    ImportLocation::String(location) => Some(location.clone()),
                    _ => None,
                },
                _ => None,
            })
            .collect()
    }

    pub fn address_imports(&self) -> Vec<AddressImport> {
        let mut imports = vec![];
        for declaration in &self.declarations {
            if let Declaration::Import(import) = declaration {
                if let ImportLocation::Address(address) = &import.location {
                    for identifier in &import.identifiers {
                        imports.push(AddressImport {
                            identifier: identifier.clone(),
                            address: *address,
                        });
                    }
                }
            }
        }
        imports
    }

    pub fn has_imports(&self) -> bool {
        !self.imports().is_empty()
    }

    /// Rewrites both string import syntaxes of `from` to `import X from 0x<to>`.
    pub fn replace_import(&mut self, from: &str, to: &str) -> Result<(), DeploymentError> {
        let address = format!("0x{}", to.trim_start_matches("0x"));
        let from = regex::escape(from);
        let long_form = Regex::new(&format!(r#"import\s+(\w+)\s+from\s+"{from}""#))
            .map_err(|e| DeploymentError::Message(e.to_string()))?;
        let short_form = Regex::new(&format!(r#"import\s+"({from})""#))
            .map_err(|e| DeploymentError::Message(e.to_string()))?;

        let replacement = format!("import ${{1}} from {address}");
        let code = long_form.replace_all(&self.code, replacement.as_str());
        let code = short_form.replace_all(&code, replacement.as_str()).to_string();

        self.declarations = parse(&code, &self.location)?;
        self.code = code;
        self.convert_address_imports();
        Ok(())
    }

    /// Refreshes the development code from the current code.
    pub fn convert_address_imports(&mut self) {
        self.development_code = ADDRESS_IMPORT
            .replace_all(&self.code, r#"import "${1}""#)
            .to_string();
    }

    pub fn is_transaction(&self) -> bool {
        self.declarations
            .iter()
            .any(|d| matches!(d, Declaration::Transaction(_)))
    }

    pub fn is_script(&self) -> bool {
        !self.is_transaction()
            && self
                .declarations
                .iter()
                .any(|d| matches!(d, Declaration::Function { name } if name == "main"))
    }

    pub fn is_contract(&self) -> bool {
        self.declarations
            .iter()
            .any(|d| matches!(d, Declaration::Contract { .. }))
    }

    pub fn transactions(&self) -> Vec<&TransactionDeclaration> {
        self.declarations
            .iter()
            .filter_map(|d| match d {
                Declaration::Transaction(transaction) => Some(transaction),
                _ => None,
            })
            .collect()
    }

    /// Parameters of the first transaction declaration.
    pub fn transaction_parameters(&self) -> Vec<Parameter> {
        self.transactions()
            .first()
            .map(|t| t.parameters.clone())
            .unwrap_or_default()
    }

    /// Number of `prepare` parameters of the first transaction, zero when
    /// there is no `prepare` block.
    pub fn prepare_parameter_count(&self) -> usize {
        self.transactions()
            .first()
            .and_then(|t| t.prepare_parameters.as_ref())
            .map(|p| p.len())
            .unwrap_or(0)
    }

    /// Name of the declared contract, preferring a contract over an interface.
    pub fn name(&self) -> Result<String, DeploymentError> {
        if self.is_transaction() || self.is_script() {
            return Err(DeploymentError::ContractName(
                "the code must declare a contract or contract interface, not a script or transaction"
                    .into(),
            ));
        }
        let mut contracts = vec![];
        let mut interfaces = vec![];
        for declaration in &self.declarations {
            if let Declaration::Contract { name, is_interface } = declaration {
                if *is_interface {
                    interfaces.push(name);
                } else {
                    contracts.push(name);
                }
            }
        }
        match (contracts.as_slice(), interfaces.as_slice()) {
            ([name], _) => Ok(name.to_string()),
            ([], [name]) => Ok(name.to_string()),
            ([], []) => Err(DeploymentError::ContractName(
                "the code must declare a contract or contract interface".into(),
            )),
            _ => Err(DeploymentError::ContractName(
                "the code must declare exactly one contract or contract interface".into(),
            )),
        }
    }
}

fn parse(code: &str, location: &str) -> Result<Vec<Declaration>, DeploymentError> {
    cadence::parse(code).map_err(|e| DeploymentError::Parse {
        location: location.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_both_import_syntaxes() {
        let mut program = Program::new(
            "import Foo from \"./Foo.cdc\"\nimport \"Bar\"\n",
            vec![],
            "Main.cdc",
        )
        .unwrap();
        assert_eq!(program.imports(), vec!["./Foo.cdc", "Bar"]);

        program.replace_import("./Foo.cdc", "0x1").unwrap();
        program.replace_import("Bar", "0x2").unwrap();
        assert_eq!(program.code(), "import Foo from 0x1\nimport Bar from 0x2\n");
        assert!(!program.has_imports());
        assert_eq!(
            program.address_imports(),
            vec![
                AddressImport {
                    identifier: "Foo".into(),
                    address: Address::from_hex("01").unwrap()
                },
                AddressImport {
                    identifier: "Bar".into(),
                    address: Address::from_hex("02").unwrap()
                },
            ]
        );
        assert_eq!(program.development_code(), "import \"Foo\"\nimport \"Bar\"\n");
    }

    #[test]
    fn replacing_address_imports_is_a_no_op() {
        let code = "import Foo from 0xf8d6e0586b0a20c7\naccess(all) fun main() {}";
        let mut program = Program::new(code, vec![], "script.cdc").unwrap();
        program.replace_import("Foo", "0x01").unwrap();
        assert_eq!(program.code(), code);
        assert!(program.is_script());
    }

    #[test]
    fn replace_does_not_touch_similar_locations() {
        let mut program = Program::new(
            "import A from \"./A.cdc\"\nimport AB from \"./AB.cdc\"\naccess(all) contract C {}",
            vec![],
            "C.cdc",
        )
        .unwrap();
        program.replace_import("./A.cdc", "0x01").unwrap();
        assert_eq!(program.imports(), vec!["./AB.cdc"]);
    }

    #[test]
    fn names_prefer_contracts_over_interfaces() {
        let program = Program::new(
            "access(all) contract interface I {}\naccess(all) contract C: I {}",
            vec![],
            "C.cdc",
        )
        .unwrap();
        assert_eq!(program.name().unwrap(), "C");

        let program = Program::new("access(all) contract interface I {}", vec![], "I.cdc").unwrap();
        assert_eq!(program.name().unwrap(), "I");

        let program = Program::new("pub contract A {}\npub contract B {}", vec![], "AB.cdc").unwrap();
        assert!(program.name().is_err());

        let program = Program::new("transaction { prepare(s: &Account) {} }", vec![], "t.cdc").unwrap();
        assert!(program.name().is_err());
        assert!(program.is_transaction());
        assert_eq!(program.prepare_parameter_count(), 1);
    }

    #[test]
    fn reports_parse_errors_with_location() {
        let err = Program::new("access(all) contract A {", vec![], "A.cdc").unwrap_err();
        assert!(err.to_string().starts_with("parsing failed for A.cdc"));
    }
}
