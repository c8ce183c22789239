use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use flow_codec::{Address, Identifier, Transaction, Value};
use flow_gateway::{
    Account as ChainAccount, AccountPublicKey, Block, BlockEvents, Collection, Gateway,
    TransactionResult, TransactionStatus, ACCOUNT_KEY_WEIGHT_THRESHOLD,
};
use flowkit_deployments::{order_contracts, ImportReplacer, Program};
use flowkit_files::{
    Account, Contract, ContractDeployment, DeploymentContract, FileSystemReaderWriter, Network,
    State,
};
use flowkit_utils::{
    check_compatibility, private_key_from_mnemonic, random_mnemonic, random_seed,
    DerivationPath, PrivateKey, SignatureAlgorithm,
};

use crate::events::{scan_events, EventList, EventWorker};
use crate::query::{BlockQuery, ScriptQuery};
use crate::settings::FlowkitSettings;
use crate::transactions::{self, AccountSigner, TransactionBuilder};
use crate::utils::Context;
use crate::FlowkitError;

/// Cadence source together with its arguments and the location it was read
/// from, used to resolve relative imports.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub code: Vec<u8>,
    pub args: Vec<Value>,
    pub location: String,
}

impl Script {
    pub fn new(code: &[u8], args: Vec<Value>, location: &str) -> Script {
        Script {
            code: code.to_vec(),
            args,
            location: location.to_string(),
        }
    }

    fn program(&self) -> Result<Program, FlowkitError> {
        let code = String::from_utf8(self.code.clone())
            .map_err(|e| FlowkitError::Message(format!("script is not valid utf-8: {e}")))?;
        Ok(Program::new(&code, self.args.clone(), &self.location)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionAddressesRoles {
    pub proposer: Address,
    pub authorizers: Vec<Address>,
    pub payer: Address,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionAccountRoles {
    pub proposer: Account,
    pub authorizers: Vec<Account>,
    pub payer: Account,
}

impl TransactionAccountRoles {
    /// The same account in every role.
    pub fn single(account: Account) -> TransactionAccountRoles {
        TransactionAccountRoles {
            proposer: account.clone(),
            authorizers: vec![account.clone()],
            payer: account,
        }
    }

    pub fn addresses(&self) -> TransactionAddressesRoles {
        TransactionAddressesRoles {
            proposer: self.proposer.address,
            authorizers: self.authorizers.iter().map(|a| a.address).collect(),
            payer: self.payer.address,
        }
    }

    /// Accounts that must sign, deduplicated by address: proposer, then
    /// authorizers, then payer.
    pub fn signers(&self) -> Vec<&Account> {
        let mut signers: Vec<&Account> = vec![];
        let roles = std::iter::once(&self.proposer)
            .chain(self.authorizers.iter())
            .chain(std::iter::once(&self.payer));
        for account in roles {
            if !signers.iter().any(|s| s.address == account.address) {
                signers.push(account);
            }
        }
        signers
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentStatus {
    Added,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedContract {
    pub name: String,
    pub account_name: String,
    pub address: Address,
    pub transaction_id: Option<Identifier>,
    pub status: DeploymentStatus,
}

/// Update policy answering the same way for every existing contract.
pub fn update_existing_contract(update: bool) -> impl Fn(&[u8], &[u8]) -> bool {
    move |_existing, _new| update
}

/// Entry point of the toolkit: runs project and chain operations against a
/// gateway on behalf of the selected network.
pub struct Flowkit {
    state: Option<State>,
    network: Option<Network>,
    gateway: Arc<dyn Gateway>,
    settings: FlowkitSettings,
}

impl Flowkit {
    pub fn new(state: Option<State>, network: Option<Network>, gateway: Arc<dyn Gateway>) -> Flowkit {
        Flowkit {
            state,
            network,
            gateway,
            settings: FlowkitSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: FlowkitSettings) -> Flowkit {
        self.settings = settings;
        self
    }

    pub fn network(&self) -> Result<&Network, FlowkitError> {
        self.network.as_ref().ok_or(FlowkitError::NoNetwork)
    }

    pub fn state(&self) -> Result<&State, FlowkitError> {
        self.state.as_ref().ok_or(FlowkitError::NoProjectState)
    }

    pub fn state_mut(&mut self) -> Result<&mut State, FlowkitError> {
        self.state.as_mut().ok_or(FlowkitError::NoProjectState)
    }

    pub fn gateway(&self) -> &dyn Gateway {
        self.gateway.as_ref()
    }

    pub fn ping(&self) -> Result<(), FlowkitError> {
        Ok(self.gateway.ping()?)
    }

    pub fn get_account(&self, address: &Address, ctx: &Context) -> Result<ChainAccount, FlowkitError> {
        ctx.check_cancelled()?;
        Ok(self.gateway.get_account(address)?)
    }

    /// Creates an account holding `keys`, paid and authorized by `signer`.
    pub fn create_account(
        &self,
        signer: &Account,
        keys: Vec<AccountPublicKey>,
        ctx: &Context,
    ) -> Result<(ChainAccount, Identifier), FlowkitError> {
        let mut keys = keys;
        for key in keys.iter_mut() {
            if key.weight == 0 {
                key.weight = ACCOUNT_KEY_WEIGHT_THRESHOLD;
            }
            check_compatibility(key.sig_algo, key.hash_algo)?;
        }

        let mut builder = transactions::create_account(signer.address, &keys, &[])?;
        self.prepare_for_account(&mut builder, signer, ctx)?;
        let (tx, result) = self.send_and_seal(builder, ctx)?;
        let id = tx.id();
        check_result(&id, &result)?;

        let created = EventList::new(result.events).created_addresses();
        let address = created
            .first()
            .ok_or(FlowkitError::AccountCreatedEventMissing(id))?;
        ctx.try_log(|logger| slog::info!(logger, "account created"; "address" => address.to_hex()));
        Ok((self.get_account(address, ctx)?, id))
    }

    /// Deploys the contract declared by `script` on `account`, updating it
    /// when it already exists and `update_policy(existing, new)` agrees.
    /// Returns the transaction id and whether an update happened.
    pub fn add_contract(
        &mut self,
        account: &Account,
        script: Script,
        update_policy: &dyn Fn(&[u8], &[u8]) -> bool,
        ctx: &Context,
    ) -> Result<(Identifier, bool), FlowkitError> {
        let mut program = script.program()?;
        self.resolve_imports(&mut program)?;
        let name = program.name()?;
        let code = program.code().as_bytes().to_vec();

        let on_chain = self.get_account(&account.address, ctx)?;
        let existing = on_chain.contracts.get(&name);
        let update = match existing {
            Some(existing) if *existing == code => return Err(FlowkitError::UpdateNoDiff),
            Some(existing) if !update_policy(existing, &code) => {
                return Err(FlowkitError::ContractExists {
                    name,
                    account: account.name.clone(),
                })
            }
            Some(_) => true,
            None => false,
        };

        let mut builder = if update {
            transactions::update_account_contract(account.address, &name, &code)?
        } else {
            transactions::add_account_contract(account.address, &name, &code, program.args())?
        };
        self.prepare_for_account(&mut builder, account, ctx)?;
        let (tx, result) = self.send_and_seal(builder, ctx)?;
        let id = tx.id();
        check_result(&id, &result)?;
        ctx.try_log(|logger| {
            slog::info!(
                logger,
                "contract {} {}", name, if update { "updated" } else { "added" };
                "account" => account.address.to_hex(),
                "transaction" => id.to_hex()
            )
        });

        if let (Some(state), Some(network)) = (self.state.as_mut(), self.network.as_ref()) {
            let config = state.config_mut();
            config.deployments.add_contract(
                &account.name,
                &network.name,
                ContractDeployment::with_args(&name, program.args().to_vec()),
            );
            config
                .contracts
                .add_if_missing(Contract::new(&name, program.location()));
        }
        Ok((id, update))
    }

    pub fn remove_contract(
        &self,
        account: &Account,
        name: &str,
        ctx: &Context,
    ) -> Result<Identifier, FlowkitError> {
        let on_chain = self.get_account(&account.address, ctx)?;
        if !on_chain.contracts.contains_key(name) {
            return Err(FlowkitError::ContractNotFound {
                name: name.to_string(),
                account: account.name.clone(),
                deployed: on_chain.contracts.keys().cloned().collect(),
            });
        }
        let mut builder = transactions::remove_account_contract(account.address, name)?;
        self.prepare_for_account(&mut builder, account, ctx)?;
        let (tx, result) = self.send_and_seal(builder, ctx)?;
        let id = tx.id();
        check_result(&id, &result)?;
        Ok(id)
    }

    /// Deploys every contract scheduled on the selected network, imports
    /// first. Per contract failures are collected and reported together.
    pub fn deploy_project(
        &mut self,
        update_policy: &dyn Fn(&[u8], &[u8]) -> bool,
        ctx: &Context,
    ) -> Result<Vec<DeployedContract>, FlowkitError> {
        let network = self.network()?.name.clone();
        let sorted: Vec<(DeploymentContract, Account)> = {
            let state = self.state()?;
            let contracts = state.deployment_contracts_by_network(&network)?;
            let aliases = state.aliases_for_network(&network);
            let mut sorted = vec![];
            for contract in order_contracts(&contracts, &aliases)? {
                let account = state.accounts().by_name(&contract.account_name)?.clone();
                sorted.push((contract.clone(), account));
            }
            sorted
        };
        ctx.try_log(|logger| {
            slog::info!(logger, "deploying {} contracts", sorted.len(); "network" => &network)
        });

        let mut deployed = vec![];
        let mut failures = BTreeMap::new();
        for (contract, account) in sorted {
            let script = Script::new(contract.code.as_bytes(), contract.args.clone(), &contract.location);
            let outcome = self.add_contract(&account, script, update_policy, ctx);
            let (transaction_id, status) = match outcome {
                Ok((id, true)) => (Some(id), DeploymentStatus::Updated),
                Ok((id, false)) => (Some(id), DeploymentStatus::Added),
                Err(FlowkitError::UpdateNoDiff) => {
                    ctx.try_log(|logger| {
                        slog::info!(logger, "no changes in contract {}", contract.name; "account" => &account.name)
                    });
                    (None, DeploymentStatus::Unchanged)
                }
                Err(FlowkitError::Cancelled) => return Err(FlowkitError::Cancelled),
                Err(e) => {
                    ctx.try_log(|logger| {
                        slog::error!(logger, "deploying contract {} failed: {}", contract.name, e)
                    });
                    failures.insert(contract.name.clone(), e);
                    continue;
                }
            };
            deployed.push(DeployedContract {
                name: contract.name,
                account_name: account.name,
                address: contract.account_address,
                transaction_id,
                status,
            });
        }

        if !failures.is_empty() {
            return Err(FlowkitError::ProjectDeployment(failures));
        }
        Ok(deployed)
    }

    pub fn execute_script(
        &self,
        script: Script,
        query: ScriptQuery,
        ctx: &Context,
    ) -> Result<Value, FlowkitError> {
        ctx.check_cancelled()?;
        let mut program = script.program()?;
        self.resolve_imports(&mut program)?;
        let code = program.code().as_bytes();
        let value = match query {
            BlockQuery::Latest => self.gateway.execute_script(code, program.args())?,
            BlockQuery::Height(height) => {
                self.gateway
                    .execute_script_at_height(code, program.args(), height)?
            }
            BlockQuery::Id(id) => self.gateway.execute_script_at_id(code, program.args(), &id)?,
        };
        Ok(value)
    }

    /// Builds an unsigned transaction referencing the latest sealed block.
    pub fn build_transaction(
        &self,
        addresses: &TransactionAddressesRoles,
        proposer_key_index: u32,
        script: Script,
        gas_limit: u64,
        ctx: &Context,
    ) -> Result<TransactionBuilder, FlowkitError> {
        ctx.check_cancelled()?;
        let mut program = script.program()?;
        self.resolve_imports(&mut program)?;

        let latest = self.gateway.get_latest_block()?;
        let proposer = self.gateway.get_account(&addresses.proposer)?;
        let sequence_number = proposal_sequence_number(&proposer, proposer_key_index)?;

        let mut builder = TransactionBuilder::new();
        builder.set_script(program.code().as_bytes(), program.args())?;
        builder.add_authorizers(&addresses.authorizers)?;
        builder.set_proposer(addresses.proposer, proposer_key_index, sequence_number)?;
        builder.set_payer(addresses.payer)?;
        builder.set_gas_limit(gas_limit)?;
        builder.set_block_reference(latest.id)?;
        Ok(builder)
    }

    /// Adds `signer`'s signature to a payload built elsewhere.
    pub fn sign_transaction_payload(
        &self,
        signer: &Account,
        payload: &[u8],
        ctx: &Context,
    ) -> Result<TransactionBuilder, FlowkitError> {
        ctx.check_cancelled()?;
        let payload = String::from_utf8_lossy(payload);
        let mut builder = TransactionBuilder::from_payload(payload.trim())?;
        builder.set_signer(self.account_signer(signer)?)?;
        builder.sign()?;
        Ok(builder)
    }

    pub fn send_signed_transaction(
        &self,
        builder: TransactionBuilder,
        ctx: &Context,
    ) -> Result<(Transaction, TransactionResult), FlowkitError> {
        self.send_and_seal(builder, ctx)
    }

    /// Builds, signs with every role and sends `script`, then waits for the
    /// seal.
    pub fn send_transaction(
        &self,
        accounts: &TransactionAccountRoles,
        script: Script,
        gas_limit: u64,
        ctx: &Context,
    ) -> Result<(Transaction, TransactionResult), FlowkitError> {
        let mut builder = self.build_transaction(
            &accounts.addresses(),
            accounts.proposer.key.index(),
            script,
            gas_limit,
            ctx,
        )?;
        for signer in accounts.signers() {
            builder.set_signer(self.account_signer(signer)?)?;
            builder.sign()?;
        }
        self.send_and_seal(builder, ctx)
    }

    pub fn get_block(&self, query: BlockQuery, ctx: &Context) -> Result<Block, FlowkitError> {
        ctx.check_cancelled()?;
        let block = match query {
            BlockQuery::Latest => self.gateway.get_latest_block()?,
            BlockQuery::Height(height) => self.gateway.get_block_by_height(height)?,
            BlockQuery::Id(id) => self.gateway.get_block_by_id(&id)?,
        };
        Ok(block)
    }

    pub fn get_collection(&self, id: &Identifier, ctx: &Context) -> Result<Collection, FlowkitError> {
        ctx.check_cancelled()?;
        Ok(self.gateway.get_collection(id)?)
    }

    pub fn get_transaction_by_id(
        &self,
        id: &Identifier,
        wait_seal: bool,
        ctx: &Context,
    ) -> Result<(Transaction, TransactionResult), FlowkitError> {
        ctx.check_cancelled()?;
        let tx = self.gateway.get_transaction(id)?;
        let result = if wait_seal {
            self.wait_for_seal(id, ctx)?
        } else {
            self.gateway.get_transaction_result(id, false)?
        };
        Ok((tx, result))
    }

    pub fn get_transactions_by_block_id(
        &self,
        id: &Identifier,
        ctx: &Context,
    ) -> Result<(Vec<Transaction>, Vec<TransactionResult>), FlowkitError> {
        ctx.check_cancelled()?;
        let transactions = self.gateway.get_transactions_by_block_id(id)?;
        let results = self.gateway.get_transaction_results_by_block_id(id)?;
        Ok((transactions, results))
    }

    /// Key derived from `seed`, or from a fresh random seed when empty.
    pub fn generate_key(
        &self,
        sig_algo: SignatureAlgorithm,
        seed: &[u8],
    ) -> Result<PrivateKey, FlowkitError> {
        let key = if seed.is_empty() {
            PrivateKey::from_seed(sig_algo, &random_seed(sig_algo))?
        } else {
            PrivateKey::from_seed(sig_algo, seed)?
        };
        Ok(key)
    }

    /// Fresh twelve word mnemonic and the key found at `path` below it.
    pub fn generate_mnemonic_key(
        &self,
        sig_algo: SignatureAlgorithm,
        path: Option<&str>,
    ) -> Result<(PrivateKey, String), FlowkitError> {
        let mnemonic = random_mnemonic()?.to_string();
        let key = self.derive_private_key_from_mnemonic(&mnemonic, sig_algo, path)?;
        Ok((key, mnemonic))
    }

    pub fn derive_private_key_from_mnemonic(
        &self,
        mnemonic: &str,
        sig_algo: SignatureAlgorithm,
        path: Option<&str>,
    ) -> Result<PrivateKey, FlowkitError> {
        let path = match path {
            Some(path) if !path.is_empty() => path.parse::<DerivationPath>()?,
            _ => DerivationPath::default(),
        };
        Ok(private_key_from_mnemonic(mnemonic, sig_algo, &path)?)
    }

    /// Events of every type in `names` emitted in blocks `start..=end`.
    pub fn get_events(
        &self,
        names: &[String],
        start: u64,
        end: u64,
        worker: &EventWorker,
        ctx: &Context,
    ) -> Result<Vec<BlockEvents>, FlowkitError> {
        scan_events(self.gateway.as_ref(), names, start, end, worker, ctx)
    }

    fn resolve_imports(&self, program: &mut Program) -> Result<(), FlowkitError> {
        if !program.has_imports() {
            return Ok(());
        }
        if program.location().is_empty() {
            return Err(FlowkitError::Message(
                "resolving imports requires the location of the program".into(),
            ));
        }
        let network = self.network()?;
        let state = self.state()?;
        let contracts = state.deployment_contracts_by_network(&network.name)?;
        let aliases = state.aliases_for_network(&network.name);
        ImportReplacer::new(&contracts, &aliases).replace(program)?;
        Ok(())
    }

    fn account_signer(&self, account: &Account) -> Result<AccountSigner, FlowkitError> {
        let signer = match &self.state {
            Some(state) => state.signer(account)?,
            None => account.key.signer(&FileSystemReaderWriter::new(), None)?,
        };
        Ok(AccountSigner {
            address: account.address,
            key_index: account.key.index(),
            signer,
        })
    }

    /// Makes `account` proposer and payer of `builder`, then signs.
    fn prepare_for_account(
        &self,
        builder: &mut TransactionBuilder,
        account: &Account,
        ctx: &Context,
    ) -> Result<(), FlowkitError> {
        ctx.check_cancelled()?;
        let latest = self.gateway.get_latest_block()?;
        let on_chain = self.gateway.get_account(&account.address)?;
        let key_index = account.key.index();
        let sequence_number = proposal_sequence_number(&on_chain, key_index)?;
        builder.set_proposer(account.address, key_index, sequence_number)?;
        builder.set_payer(account.address)?;
        builder.set_block_reference(latest.id)?;
        builder.set_signer(self.account_signer(account)?)?;
        builder.sign()?;
        Ok(())
    }

    fn send_and_seal(
        &self,
        mut builder: TransactionBuilder,
        ctx: &Context,
    ) -> Result<(Transaction, TransactionResult), FlowkitError> {
        ctx.check_cancelled()?;
        let sent = self.gateway.send_signed_transaction(builder.transaction())?;
        builder.mark_submitted()?;
        let id = sent.id();
        ctx.try_log(|logger| slog::debug!(logger, "transaction sent"; "id" => id.to_hex()));

        let result = self.wait_for_seal(&id, ctx)?;
        if result.status == TransactionStatus::Sealed {
            builder.mark_sealed()?;
        }
        Ok((builder.into_transaction(), result))
    }

    fn wait_for_seal(&self, id: &Identifier, ctx: &Context) -> Result<TransactionResult, FlowkitError> {
        let started = Instant::now();
        loop {
            ctx.check_cancelled()?;
            let result = self.gateway.get_transaction_result(id, true)?;
            if result.status.is_final() {
                return Ok(result);
            }
            if let Some(timeout) = self.settings.seal_timeout {
                if started.elapsed() >= timeout {
                    return Err(FlowkitError::SealTimeout(*id));
                }
            }
            ctx.try_log(|logger| {
                slog::debug!(logger, "waiting for transaction to be sealed"; "id" => id.to_hex(), "status" => result.status.to_string())
            });
            thread::sleep(self.settings.seal_poll_interval);
        }
    }
}

fn proposal_sequence_number(account: &ChainAccount, key_index: u32) -> Result<u64, FlowkitError> {
    account
        .key(key_index)
        .map(|key| key.sequence_number)
        .ok_or_else(|| {
            FlowkitError::Message(format!(
                "account {} has no key at index {}",
                account.address, key_index
            ))
        })
}

fn check_result(id: &Identifier, result: &TransactionResult) -> Result<(), FlowkitError> {
    match &result.error {
        Some(message) => Err(FlowkitError::TransactionFailed {
            id: *id,
            message: message.clone(),
        }),
        None => Ok(()),
    }
}
