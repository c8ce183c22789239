use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use flow_codec::{Address, Identifier, Transaction, Value};

use crate::{
    Account, Block, BlockEvents, Collection, Gateway, GatewayError, TransactionResult,
    TransactionStatus,
};

type EventsHandler =
    Box<dyn Fn(&str, u64, u64) -> Result<Vec<BlockEvents>, GatewayError> + Send + Sync>;
type SendHook = Box<dyn Fn(&Transaction, &mut MockState) + Send + Sync>;

/// Recorded calls and canned answers of a [`MockGateway`].
pub struct MockState {
    pub accounts: HashMap<Address, Account>,
    pub blocks: BTreeMap<u64, Block>,
    pub collections: HashMap<Identifier, Collection>,
    pub sent_transactions: Vec<Transaction>,
    pub results: HashMap<Identifier, TransactionResult>,
    pub default_result: TransactionResult,
    /// How many polls answer `Pending` before a result is reported.
    pub pending_polls: usize,
    pub result_polls: usize,
    pub script_result: Value,
    pub executed_scripts: Vec<(Vec<u8>, Vec<Value>)>,
    pub event_queries: Vec<(String, u64, u64)>,
    pub calls: Vec<String>,
}

impl MockState {
    fn latest_block(&self) -> Block {
        match self.blocks.iter().next_back() {
            Some((_, block)) => block.clone(),
            None => Block::new(Identifier([1; 32]), 1),
        }
    }
}

/// In-memory gateway used by tests.
pub struct MockGateway {
    state: Mutex<MockState>,
    events_handler: Mutex<Option<EventsHandler>>,
    on_send: Mutex<Option<SendHook>>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    pub fn new() -> Self {
        let mut blocks = BTreeMap::new();
        blocks.insert(1, Block::new(Identifier([1; 32]), 1));
        MockGateway {
            state: Mutex::new(MockState {
                accounts: HashMap::new(),
                blocks,
                collections: HashMap::new(),
                sent_transactions: vec![],
                results: HashMap::new(),
                default_result: TransactionResult::sealed(vec![]),
                pending_polls: 0,
                result_polls: 0,
                script_result: Value::Void,
                executed_scripts: vec![],
                event_queries: vec![],
                calls: vec![],
            }),
            events_handler: Mutex::new(None),
            on_send: Mutex::new(None),
        }
    }

    /// Locks the mock state, recovering from a poisoned lock.
    pub fn state(&self) -> MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn add_account(&self, account: Account) {
        self.state().accounts.insert(account.address, account);
    }

    pub fn add_block(&self, block: Block) {
        self.state().blocks.insert(block.height, block);
    }

    pub fn add_collection(&self, collection: Collection) {
        self.state().collections.insert(collection.id, collection);
    }

    pub fn set_default_result(&self, result: TransactionResult) {
        self.state().default_result = result;
    }

    pub fn set_pending_polls(&self, polls: usize) {
        self.state().pending_polls = polls;
    }

    pub fn set_script_result(&self, value: Value) {
        self.state().script_result = value;
    }

    pub fn set_events_handler<F>(&self, handler: F)
    where
        F: Fn(&str, u64, u64) -> Result<Vec<BlockEvents>, GatewayError> + Send + Sync + 'static,
    {
        if let Ok(mut slot) = self.events_handler.lock() {
            *slot = Some(Box::new(handler));
        }
    }

    /// Runs `hook` against the state every time a transaction is submitted.
    pub fn on_send<F>(&self, hook: F)
    where
        F: Fn(&Transaction, &mut MockState) + Send + Sync + 'static,
    {
        if let Ok(mut slot) = self.on_send.lock() {
            *slot = Some(Box::new(hook));
        }
    }

    pub fn sent_transactions(&self) -> Vec<Transaction> {
        self.state().sent_transactions.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    fn record(&self, call: &str) -> MutexGuard<'_, MockState> {
        let mut state = self.state();
        state.calls.push(call.to_string());
        state
    }
}

impl Gateway for MockGateway {
    fn get_account(&self, address: &Address) -> Result<Account, GatewayError> {
        let state = self.record("get_account");
        state
            .accounts
            .get(address)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("account {address}")))
    }

    fn send_signed_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<Transaction, GatewayError> {
        let mut state = self.record("send_signed_transaction");
        state.sent_transactions.push(transaction.clone());
        state.result_polls = 0;
        if let Ok(hook) = self.on_send.lock() {
            if let Some(hook) = hook.as_ref() {
                hook(transaction, &mut *state);
            }
        }
        Ok(transaction.clone())
    }

    fn get_transaction(&self, id: &Identifier) -> Result<Transaction, GatewayError> {
        let state = self.record("get_transaction");
        state
            .sent_transactions
            .iter()
            .find(|tx| tx.id() == *id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("transaction {id}")))
    }

    fn get_transaction_result(
        &self,
        id: &Identifier,
        _wait_seal: bool,
    ) -> Result<TransactionResult, GatewayError> {
        let mut state = self.record("get_transaction_result");
        if state.result_polls < state.pending_polls {
            state.result_polls += 1;
            return Ok(TransactionResult {
                status: TransactionStatus::Pending,
                ..Default::default()
            });
        }
        let result = state
            .results
            .get(id)
            .cloned()
            .unwrap_or_else(|| state.default_result.clone());
        Ok(result)
    }

    fn get_transactions_by_block_id(
        &self,
        _id: &Identifier,
    ) -> Result<Vec<Transaction>, GatewayError> {
        let state = self.record("get_transactions_by_block_id");
        Ok(state.sent_transactions.clone())
    }

    fn get_transaction_results_by_block_id(
        &self,
        _id: &Identifier,
    ) -> Result<Vec<TransactionResult>, GatewayError> {
        let state = self.record("get_transaction_results_by_block_id");
        Ok(state
            .sent_transactions
            .iter()
            .map(|tx| {
                state
                    .results
                    .get(&tx.id())
                    .cloned()
                    .unwrap_or_else(|| state.default_result.clone())
            })
            .collect())
    }

    fn execute_script(&self, code: &[u8], args: &[Value]) -> Result<Value, GatewayError> {
        let mut state = self.record("execute_script");
        state.executed_scripts.push((code.to_vec(), args.to_vec()));
        Ok(state.script_result.clone())
    }

    fn execute_script_at_height(
        &self,
        code: &[u8],
        args: &[Value],
        _height: u64,
    ) -> Result<Value, GatewayError> {
        let mut state = self.record("execute_script_at_height");
        state.executed_scripts.push((code.to_vec(), args.to_vec()));
        Ok(state.script_result.clone())
    }

    fn execute_script_at_id(
        &self,
        code: &[u8],
        args: &[Value],
        _id: &Identifier,
    ) -> Result<Value, GatewayError> {
        let mut state = self.record("execute_script_at_id");
        state.executed_scripts.push((code.to_vec(), args.to_vec()));
        Ok(state.script_result.clone())
    }

    fn get_latest_block(&self) -> Result<Block, GatewayError> {
        let state = self.record("get_latest_block");
        Ok(state.latest_block())
    }

    fn get_block_by_id(&self, id: &Identifier) -> Result<Block, GatewayError> {
        let state = self.record("get_block_by_id");
        state
            .blocks
            .values()
            .find(|b| b.id == *id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("block {id}")))
    }

    fn get_block_by_height(&self, height: u64) -> Result<Block, GatewayError> {
        let state = self.record("get_block_by_height");
        state
            .blocks
            .get(&height)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("block at height {height}")))
    }

    fn get_events(
        &self,
        event_type: &str,
        start: u64,
        end: u64,
    ) -> Result<Vec<BlockEvents>, GatewayError> {
        {
            let mut state = self.record("get_events");
            state
                .event_queries
                .push((event_type.to_string(), start, end));
        }
        if let Ok(handler) = self.events_handler.lock() {
            if let Some(handler) = handler.as_ref() {
                return handler(event_type, start, end);
            }
        }
        Ok(vec![BlockEvents {
            block_id: Identifier::EMPTY,
            height: start,
            timestamp: Utc::now(),
            events: vec![],
        }])
    }

    fn get_collection(&self, id: &Identifier) -> Result<Collection, GatewayError> {
        let state = self.record("get_collection");
        state
            .collections
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("collection {id}")))
    }

    fn get_latest_protocol_state_snapshot(&self) -> Result<Vec<u8>, GatewayError> {
        let _state = self.record("get_latest_protocol_state_snapshot");
        Ok(vec![])
    }

    fn ping(&self) -> Result<(), GatewayError> {
        let _state = self.record("ping");
        Ok(())
    }

    fn secure_connection(&self) -> bool {
        false
    }
}
