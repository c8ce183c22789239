extern crate serde;

#[macro_use]
extern crate serde_derive;

#[cfg(feature = "mock")]
mod mock;
mod types;

#[cfg(feature = "mock")]
pub use mock::{MockGateway, MockState};
pub use types::{
    Account, AccountPublicKey, Block, BlockEvents, Collection, Event, TransactionResult,
    TransactionStatus, ACCOUNT_CREATED_EVENT, ACCOUNT_KEY_WEIGHT_THRESHOLD,
};

use flow_codec::{Address, Identifier, Transaction, Value};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum GatewayError {
    #[error("unknown error")]
    Generic,
    #[error("error status code {0}")]
    StatusCode(u16),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Message(String),
}

/// Everything flowkit needs from an access node. Calls block until the node
/// answers.
pub trait Gateway: Send + Sync {
    fn get_account(&self, address: &Address) -> Result<Account, GatewayError>;

    /// Submits `transaction`, returning it as accepted by the node.
    fn send_signed_transaction(&self, transaction: &Transaction)
        -> Result<Transaction, GatewayError>;

    fn get_transaction(&self, id: &Identifier) -> Result<Transaction, GatewayError>;

    fn get_transaction_result(
        &self,
        id: &Identifier,
        wait_seal: bool,
    ) -> Result<TransactionResult, GatewayError>;

    fn get_transactions_by_block_id(&self, id: &Identifier)
        -> Result<Vec<Transaction>, GatewayError>;

    fn get_transaction_results_by_block_id(
        &self,
        id: &Identifier,
    ) -> Result<Vec<TransactionResult>, GatewayError>;

    fn execute_script(&self, code: &[u8], args: &[Value]) -> Result<Value, GatewayError>;

    fn execute_script_at_height(
        &self,
        code: &[u8],
        args: &[Value],
        height: u64,
    ) -> Result<Value, GatewayError>;

    fn execute_script_at_id(
        &self,
        code: &[u8],
        args: &[Value],
        id: &Identifier,
    ) -> Result<Value, GatewayError>;

    /// Latest sealed block.
    fn get_latest_block(&self) -> Result<Block, GatewayError>;

    fn get_block_by_id(&self, id: &Identifier) -> Result<Block, GatewayError>;

    fn get_block_by_height(&self, height: u64) -> Result<Block, GatewayError>;

    /// Events of `event_type` emitted in blocks `start..=end`.
    fn get_events(
        &self,
        event_type: &str,
        start: u64,
        end: u64,
    ) -> Result<Vec<BlockEvents>, GatewayError>;

    fn get_collection(&self, id: &Identifier) -> Result<Collection, GatewayError>;

    fn get_latest_protocol_state_snapshot(&self) -> Result<Vec<u8>, GatewayError>;

    fn ping(&self) -> Result<(), GatewayError>;

    fn secure_connection(&self) -> bool;
}
