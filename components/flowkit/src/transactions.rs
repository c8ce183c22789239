//! Transaction composition and signing.
//!
//! A [`TransactionBuilder`] walks a transaction through its lifecycle:
//! script, authorizers, proposer and payer, signatures, submission and seal.
//! Every operation checks the current [`TransactionState`] and refuses the
//! transitions that would produce an invalid transaction.

use std::fmt;

use flow_codec::{Address, Identifier, Transaction, Value};
use flow_gateway::AccountPublicKey;
use flowkit_deployments::Program;
use flowkit_utils::{HashAlgorithm, SignatureAlgorithm, Signer};

use crate::FlowkitError;

/// Gas limit used by toolkit generated transactions.
pub const MAX_GAS_LIMIT: u64 = 9999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TransactionState {
    New,
    HasScript,
    Authorized,
    Proposed,
    Payable,
    Signed,
    Submitted,
    Sealed,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionState::New => "new",
            TransactionState::HasScript => "scripted",
            TransactionState::Authorized => "authorized",
            TransactionState::Proposed => "proposed",
            TransactionState::Payable => "payable",
            TransactionState::Signed => "signed",
            TransactionState::Submitted => "submitted",
            TransactionState::Sealed => "sealed",
        };
        write!(f, "{label}")
    }
}

/// Key able to sign for `address`.
pub struct AccountSigner {
    pub address: Address,
    pub key_index: u32,
    pub signer: Box<dyn Signer>,
}

pub struct TransactionBuilder {
    tx: Transaction,
    state: TransactionState,
    has_proposer: bool,
    has_payer: bool,
    signer: Option<AccountSigner>,
}

impl fmt::Debug for TransactionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionBuilder")
            .field("state", &self.state)
            .field("tx", &self.tx)
            .field("signer", &self.signer.as_ref().map(|s| s.address))
            .finish()
    }
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        TransactionBuilder::new()
    }
}

impl TransactionBuilder {
    pub fn new() -> TransactionBuilder {
        TransactionBuilder {
            tx: Transaction::new(),
            state: TransactionState::New,
            has_proposer: false,
            has_payer: false,
            signer: None,
        }
    }

    /// Decodes a hex RLP payload (optionally carrying signatures) produced by
    /// another party, ready to be signed.
    pub fn from_payload(payload: &str) -> Result<TransactionBuilder, FlowkitError> {
        let tx = Transaction::decode_hex(payload)?;
        let state = if tx.payload_signatures.is_empty() && tx.envelope_signatures.is_empty() {
            TransactionState::Payable
        } else {
            TransactionState::Signed
        };
        Ok(TransactionBuilder {
            tx,
            state,
            has_proposer: true,
            has_payer: true,
            signer: None,
        })
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    pub fn into_transaction(self) -> Transaction {
        self.tx
    }

    pub fn id(&self) -> Identifier {
        self.tx.id()
    }

    pub fn encode(&self) -> Vec<u8> {
        self.tx.encode()
    }

    /// Hex of the unsigned payload, as shared with co-signers.
    pub fn payload_hex(&self) -> String {
        hex::encode(self.tx.payload_rlp())
    }

    fn require(
        &self,
        allowed: &[TransactionState],
        action: &'static str,
    ) -> Result<(), FlowkitError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(FlowkitError::InvalidTransactionState {
                state: self.state,
                action,
            })
        }
    }

    pub fn set_script(&mut self, code: &[u8], args: &[Value]) -> Result<(), FlowkitError> {
        self.require(
            &[TransactionState::New, TransactionState::HasScript],
            "set the script",
        )?;
        self.tx.script = code.to_vec();
        self.tx.arguments = args.iter().map(Value::encode).collect();
        self.state = TransactionState::HasScript;
        Ok(())
    }

    /// Sets the authorizers, one per parameter of the `prepare` block.
    pub fn add_authorizers(&mut self, authorizers: &[Address]) -> Result<(), FlowkitError> {
        self.require(&[TransactionState::HasScript], "add authorizers")?;
        let code = String::from_utf8(self.tx.script.clone())
            .map_err(|e| FlowkitError::Message(format!("transaction script is not utf-8: {e}")))?;
        let program = Program::new(&code, vec![], "")?;
        if program.transactions().len() > 1 {
            return Err(FlowkitError::MultipleTransactionDeclarations);
        }
        let required = program.prepare_parameter_count();
        if required != authorizers.len() {
            return Err(FlowkitError::AuthorizerMismatch {
                required,
                provided: authorizers.len(),
            });
        }
        self.tx.authorizers = authorizers.to_vec();
        self.state = TransactionState::Authorized;
        Ok(())
    }

    fn refresh_roles_state(&mut self) {
        self.state = match (self.has_proposer, self.has_payer) {
            (true, true) => TransactionState::Payable,
            (true, false) => TransactionState::Proposed,
            _ => TransactionState::Authorized,
        };
    }

    pub fn set_proposer(
        &mut self,
        address: Address,
        key_index: u32,
        sequence_number: u64,
    ) -> Result<(), FlowkitError> {
        self.require(
            &[
                TransactionState::Authorized,
                TransactionState::Proposed,
                TransactionState::Payable,
            ],
            "set the proposer",
        )?;
        self.tx.proposal_key.address = address;
        self.tx.proposal_key.key_index = key_index;
        self.tx.proposal_key.sequence_number = sequence_number;
        self.has_proposer = true;
        self.refresh_roles_state();
        Ok(())
    }

    pub fn set_payer(&mut self, address: Address) -> Result<(), FlowkitError> {
        self.require(
            &[
                TransactionState::Authorized,
                TransactionState::Proposed,
                TransactionState::Payable,
            ],
            "set the payer",
        )?;
        self.tx.payer = address;
        self.has_payer = true;
        self.refresh_roles_state();
        Ok(())
    }

    pub fn set_gas_limit(&mut self, gas_limit: u64) -> Result<(), FlowkitError> {
        if self.state >= TransactionState::Signed {
            return Err(FlowkitError::InvalidTransactionState {
                state: self.state,
                action: "change the gas limit",
            });
        }
        self.tx.gas_limit = gas_limit;
        Ok(())
    }

    pub fn set_block_reference(&mut self, block_id: Identifier) -> Result<(), FlowkitError> {
        if self.state >= TransactionState::Signed {
            return Err(FlowkitError::InvalidTransactionState {
                state: self.state,
                action: "change the reference block",
            });
        }
        self.tx.reference_block_id = block_id;
        Ok(())
    }

    pub fn is_signer(&self, address: &Address) -> bool {
        self.tx.proposal_key.address == *address
            || self.tx.payer == *address
            || self.tx.authorizers.contains(address)
    }

    /// Distinct signing addresses: proposer, then authorizers, then payer.
    pub fn signers(&self) -> Vec<Address> {
        let mut signers: Vec<Address> = vec![];
        let roles = std::iter::once(self.tx.proposal_key.address)
            .chain(self.tx.authorizers.iter().cloned())
            .chain(std::iter::once(self.tx.payer));
        for address in roles {
            if !signers.contains(&address) {
                signers.push(address);
            }
        }
        signers
    }

    pub fn set_signer(&mut self, signer: AccountSigner) -> Result<(), FlowkitError> {
        self.require(
            &[TransactionState::Payable, TransactionState::Signed],
            "set a signer",
        )?;
        if !self.is_signer(&signer.address) {
            return Err(FlowkitError::NotASigner {
                signer: signer.address,
                proposer: self.tx.proposal_key.address,
                payer: self.tx.payer,
                authorizers: self.tx.authorizers.clone(),
            });
        }
        self.signer = Some(signer);
        Ok(())
    }

    /// Signs with the current signer: the envelope when it pays, the payload
    /// otherwise.
    pub fn sign(&mut self) -> Result<(), FlowkitError> {
        self.require(
            &[TransactionState::Payable, TransactionState::Signed],
            "sign",
        )?;
        let signer = self.signer.as_ref().ok_or_else(|| {
            FlowkitError::Message("a signer must be set before signing".into())
        })?;
        if signer.address == self.tx.payer {
            let signature = signer.signer.sign(&self.tx.envelope_message())?;
            self.tx
                .add_envelope_signature(signer.address, signer.key_index, signature)?;
        } else {
            let signature = signer.signer.sign(&self.tx.payload_message())?;
            self.tx
                .add_payload_signature(signer.address, signer.key_index, signature)?;
        }
        self.state = TransactionState::Signed;
        Ok(())
    }

    pub fn mark_submitted(&mut self) -> Result<(), FlowkitError> {
        self.require(&[TransactionState::Signed], "submit")?;
        self.state = TransactionState::Submitted;
        Ok(())
    }

    pub fn mark_sealed(&mut self) -> Result<(), FlowkitError> {
        self.require(&[TransactionState::Submitted], "seal")?;
        self.state = TransactionState::Sealed;
        Ok(())
    }
}

const CREATE_ACCOUNT_TEMPLATE: &str = r#"transaction(publicKeys: [String], signatureAlgorithms: [UInt8], hashAlgorithms: [UInt8], weights: [UFix64], contracts: {String: String}) {
	prepare(signer: auth(BorrowValue) &Account) {
		let account = Account(payer: signer)
		var index = 0
		while index < publicKeys.length {
			let key = PublicKey(
				publicKey: publicKeys[index].decodeHex(),
				signatureAlgorithm: SignatureAlgorithm(rawValue: signatureAlgorithms[index])!
			)
			account.keys.add(
				publicKey: key,
				hashAlgorithm: HashAlgorithm(rawValue: hashAlgorithms[index])!,
				weight: weights[index]
			)
			index = index + 1
		}
		for name in contracts.keys {
			account.contracts.add(name: name, code: contracts[name]!.decodeHex())
		}
	}
}
"#;

const UPDATE_ACCOUNT_CONTRACT_TEMPLATE: &str = r#"transaction(name: String, code: String) {
	prepare(signer: auth(UpdateContract) &Account) {
		signer.contracts.update(name: name, code: code.decodeHex())
	}
}
"#;

const REMOVE_ACCOUNT_CONTRACT_TEMPLATE: &str = r#"transaction(name: String) {
	prepare(signer: auth(RemoveContract) &Account) {
		signer.contracts.remove(name: name)
	}
}
"#;

fn cadence_signature_algorithm(algo: SignatureAlgorithm) -> u8 {
    match algo {
        SignatureAlgorithm::EcdsaP256 => 1,
        SignatureAlgorithm::EcdsaSecp256k1 => 2,
        SignatureAlgorithm::BlsBls12381 => 3,
    }
}

fn cadence_hash_algorithm(algo: HashAlgorithm) -> u8 {
    match algo {
        HashAlgorithm::Sha2_256 => 1,
        HashAlgorithm::Sha3_256 => 3,
        HashAlgorithm::Kmac128 => 5,
    }
}

fn template(
    signer: Address,
    code: &str,
    args: &[Value],
) -> Result<TransactionBuilder, FlowkitError> {
    let mut builder = TransactionBuilder::new();
    builder.set_script(code.as_bytes(), args)?;
    builder.add_authorizers(&[signer])?;
    builder.set_gas_limit(MAX_GAS_LIMIT)?;
    Ok(builder)
}

/// New account holding `keys`, with `contracts` deployed, paid by `signer`.
pub fn create_account(
    signer: Address,
    keys: &[AccountPublicKey],
    contracts: &[(String, Vec<u8>)],
) -> Result<TransactionBuilder, FlowkitError> {
    let args = vec![
        Value::Array(
            keys.iter()
                .map(|k| Value::String(k.public_key.to_hex()))
                .collect(),
        ),
        Value::Array(
            keys.iter()
                .map(|k| Value::UInt8(cadence_signature_algorithm(k.sig_algo)))
                .collect(),
        ),
        Value::Array(
            keys.iter()
                .map(|k| Value::UInt8(cadence_hash_algorithm(k.hash_algo)))
                .collect(),
        ),
        Value::Array(
            keys.iter()
                .map(|k| Value::UFix64(k.weight as u64 * 100_000_000))
                .collect(),
        ),
        Value::Dictionary(
            contracts
                .iter()
                .map(|(name, code)| (Value::string(name), Value::String(hex::encode(code))))
                .collect(),
        ),
    ];
    template(signer, CREATE_ACCOUNT_TEMPLATE, &args)
}

/// Deploys `code` as contract `name` on `signer`, passing `init_args` to its
/// initializer.
pub fn add_account_contract(
    signer: Address,
    name: &str,
    code: &[u8],
    init_args: &[Value],
) -> Result<TransactionBuilder, FlowkitError> {
    let mut parameters = String::new();
    let mut call_args = String::new();
    for (index, arg) in init_args.iter().enumerate() {
        parameters.push_str(&format!(", arg{index}: {}", arg.type_id()));
        call_args.push_str(&format!(", arg{index}"));
    }
    let script = format!(
        "transaction(name: String, code: String{parameters}) {{\n\tprepare(signer: auth(AddContract) &Account) {{\n\t\tsigner.contracts.add(name: name, code: code.decodeHex(){call_args})\n\t}}\n}}\n"
    );

    let mut args = vec![Value::string(name), Value::String(hex::encode(code))];
    args.extend(init_args.iter().cloned());
    template(signer, &script, &args)
}

pub fn update_account_contract(
    signer: Address,
    name: &str,
    code: &[u8],
) -> Result<TransactionBuilder, FlowkitError> {
    let args = vec![Value::string(name), Value::String(hex::encode(code))];
    template(signer, UPDATE_ACCOUNT_CONTRACT_TEMPLATE, &args)
}

pub fn remove_account_contract(
    signer: Address,
    name: &str,
) -> Result<TransactionBuilder, FlowkitError> {
    template(signer, REMOVE_ACCOUNT_CONTRACT_TEMPLATE, &[Value::string(name)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowkit_utils::{InMemorySigner, PrivateKey, PublicKey};

    fn address(hex: &str) -> Address {
        Address::from_hex(hex).unwrap()
    }

    fn signer(hex: &str) -> (AccountSigner, PublicKey) {
        let key = PrivateKey::from_seed(SignatureAlgorithm::EcdsaP256, &[3u8; 32]).unwrap();
        let public_key = key.public_key();
        (
            AccountSigner {
                address: address(hex),
                key_index: 0,
                signer: Box::new(InMemorySigner::new(key, HashAlgorithm::Sha3_256)),
            },
            public_key,
        )
    }

    fn roles(proposer: &str, authorizers: &[&str], payer: &str) -> TransactionBuilder {
        let params: Vec<String> = (0..authorizers.len()).map(|i| format!("a{i}: &Account")).collect();
        let script = format!("transaction {{ prepare({}) {{}} }}", params.join(", "));
        let mut builder = TransactionBuilder::new();
        builder.set_script(script.as_bytes(), &[]).unwrap();
        let authorizers: Vec<Address> = authorizers.iter().map(|a| address(a)).collect();
        builder.add_authorizers(&authorizers).unwrap();
        builder.set_proposer(address(proposer), 0, 7).unwrap();
        builder.set_payer(address(payer)).unwrap();
        builder
    }

    #[test]
    fn authorizers_must_match_prepare_parameters() {
        let mut builder = TransactionBuilder::new();
        builder
            .set_script(b"transaction { prepare(auth1: &Account, auth2: &Account) {} }", &[])
            .unwrap();
        let err = builder.add_authorizers(&[address("01")]).unwrap_err();
        assert!(matches!(
            err,
            FlowkitError::AuthorizerMismatch {
                required: 2,
                provided: 1
            }
        ));
        assert_eq!(
            err.to_string(),
            "provided authorizers length mismatch, required authorizers 2, but provided 1"
        );
        assert_eq!(builder.state(), TransactionState::HasScript);

        let mut builder = TransactionBuilder::new();
        builder.set_script(b"transaction { execute {} }", &[]).unwrap();
        assert!(builder.add_authorizers(&[address("01")]).is_err());
        assert!(builder.add_authorizers(&[]).is_ok());
    }

    #[test]
    fn only_one_transaction_declaration() {
        let mut builder = TransactionBuilder::new();
        builder
            .set_script(b"transaction {}\ntransaction {}", &[])
            .unwrap();
        assert!(matches!(
            builder.add_authorizers(&[]),
            Err(FlowkitError::MultipleTransactionDeclarations)
        ));
    }

    #[test]
    fn transitions_are_checked() {
        let mut builder = TransactionBuilder::new();
        assert!(matches!(
            builder.add_authorizers(&[]),
            Err(FlowkitError::InvalidTransactionState { .. })
        ));
        assert!(builder.set_payer(address("01")).is_err());
        builder.set_script(b"transaction {}", &[]).unwrap();
        builder.add_authorizers(&[]).unwrap();
        assert!(builder.set_script(b"transaction {}", &[]).is_err());
        builder.set_payer(address("01")).unwrap();
        assert_eq!(builder.state(), TransactionState::Authorized);
        builder.set_proposer(address("01"), 0, 0).unwrap();
        assert_eq!(builder.state(), TransactionState::Payable);
        assert!(builder.sign().is_err());
        assert!(builder.mark_submitted().is_err());
    }

    #[test]
    fn signers_are_unique_and_ordered() {
        let builder = roles("01", &["02", "01", "03"], "02");
        assert_eq!(
            builder.signers(),
            vec![address("01"), address("02"), address("03")]
        );
        let builder = roles("01", &["01"], "01");
        assert_eq!(builder.signers(), vec![address("01")]);
    }

    #[test]
    fn rejects_signers_outside_roles() {
        let mut builder = roles("01", &["02"], "03");
        for hex in ["01", "02", "03"] {
            assert!(builder.set_signer(signer(hex).0).is_ok());
        }
        let err = builder.set_signer(signer("04").0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "not a valid signer 0000000000000004, proposer: 0000000000000001, payer: 0000000000000003, authorizers: [0000000000000002]"
        );
    }

    #[test]
    fn payer_signs_envelope_others_payload() {
        let mut builder = roles("01", &["02"], "03");
        let mut public_key = None;
        for hex in ["01", "02", "03"] {
            let (account_signer, key) = signer(hex);
            public_key = Some(key);
            builder.set_signer(account_signer).unwrap();
            builder.sign().unwrap();
        }
        let tx = builder.transaction();
        assert_eq!(tx.payload_signatures.len(), 2);
        assert_eq!(tx.envelope_signatures.len(), 1);
        assert_eq!(tx.envelope_signatures[0].address, address("03"));
        let envelope = &tx.envelope_signatures[0].signature;
        assert!(public_key
            .unwrap()
            .verify(envelope, &tx.envelope_message(), HashAlgorithm::Sha3_256)
            .unwrap());
        assert_eq!(builder.state(), TransactionState::Signed);
        assert!(builder.set_gas_limit(10).is_err());

        builder.mark_submitted().unwrap();
        builder.mark_sealed().unwrap();
        assert_eq!(builder.state(), TransactionState::Sealed);
    }

    #[test]
    fn single_account_signs_only_the_envelope() {
        let mut builder = roles("01", &["01"], "01");
        builder.set_signer(signer("01").0).unwrap();
        builder.sign().unwrap();
        assert!(builder.transaction().payload_signatures.is_empty());
        assert_eq!(builder.transaction().envelope_signatures.len(), 1);
    }

    #[test]
    fn payloads_can_be_signed_by_another_party() {
        let mut builder = roles("01", &["02"], "01");
        builder.set_gas_limit(MAX_GAS_LIMIT).unwrap();
        let payload = builder.payload_hex();

        let mut decoded = TransactionBuilder::from_payload(&payload).unwrap();
        assert_eq!(decoded.state(), TransactionState::Payable);
        assert_eq!(decoded.transaction().gas_limit, MAX_GAS_LIMIT);
        decoded.set_signer(signer("02").0).unwrap();
        decoded.sign().unwrap();
        assert_eq!(decoded.transaction().payload_signatures.len(), 1);
        assert!(decoded.set_signer(signer("05").0).is_err());
    }

    #[test]
    fn contract_templates_declare_one_authorizer() {
        let builder = add_account_contract(
            address("01"),
            "Hello",
            b"access(all) contract Hello {}",
            &[Value::string("hi"), Value::UInt64(3)],
        )
        .unwrap();
        let script = String::from_utf8(builder.transaction().script.clone()).unwrap();
        assert!(script.starts_with(
            "transaction(name: String, code: String, arg0: String, arg1: UInt64) {"
        ));
        assert!(script.contains("signer.contracts.add(name: name, code: code.decodeHex(), arg0, arg1)"));
        assert_eq!(builder.transaction().arguments.len(), 4);
        assert_eq!(builder.transaction().authorizers, vec![address("01")]);
        assert_eq!(builder.transaction().gas_limit, MAX_GAS_LIMIT);

        for builder in [
            update_account_contract(address("01"), "Hello", b"").unwrap(),
            remove_account_contract(address("01"), "Hello").unwrap(),
        ] {
            assert_eq!(builder.state(), TransactionState::Authorized);
            assert_eq!(builder.transaction().authorizers.len(), 1);
        }
    }

    #[test]
    fn create_account_passes_every_key() {
        let (_, public_key) = signer("01");
        let keys = vec![AccountPublicKey::new(public_key, HashAlgorithm::Sha3_256, 1000)];
        let builder = create_account(address("01"), &keys, &[]).unwrap();
        let args: Vec<Value> = builder
            .transaction()
            .arguments
            .iter()
            .map(|a| Value::decode(a).unwrap())
            .collect();
        assert_eq!(args.len(), 5);
        assert_eq!(args[1], Value::Array(vec![Value::UInt8(1)]));
        assert_eq!(args[2], Value::Array(vec![Value::UInt8(3)]));
        assert_eq!(args[3], Value::Array(vec![Value::UFix64(100_000_000_000)]));
    }
}
