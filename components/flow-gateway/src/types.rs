use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use flow_codec::{Address, Composite, Identifier, Value};
use flowkit_utils::{HashAlgorithm, PublicKey, SignatureAlgorithm};

use crate::GatewayError;

/// Weight an account key needs to authorize a transaction on its own.
pub const ACCOUNT_KEY_WEIGHT_THRESHOLD: u32 = 1000;

pub const ACCOUNT_CREATED_EVENT: &str = "flow.AccountCreated";

#[derive(Debug, Clone, PartialEq)]
pub struct AccountPublicKey {
    pub index: u32,
    pub public_key: PublicKey,
    pub sig_algo: SignatureAlgorithm,
    pub hash_algo: HashAlgorithm,
    pub weight: u32,
    pub sequence_number: u64,
    pub revoked: bool,
}

impl AccountPublicKey {
    pub fn new(public_key: PublicKey, hash_algo: HashAlgorithm, weight: u32) -> AccountPublicKey {
        AccountPublicKey {
            index: 0,
            sig_algo: public_key.algorithm(),
            public_key,
            hash_algo,
            weight,
            sequence_number: 0,
            revoked: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub address: Address,
    pub balance: u64,
    pub keys: Vec<AccountPublicKey>,
    pub contracts: BTreeMap<String, Vec<u8>>,
}

impl Account {
    pub fn new(address: Address) -> Account {
        Account {
            address,
            balance: 0,
            keys: vec![],
            contracts: BTreeMap::new(),
        }
    }

    pub fn key(&self, index: u32) -> Option<&AccountPublicKey> {
        self.keys.iter().find(|k| k.index == index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum TransactionStatus {
    #[default]
    Unknown,
    Pending,
    Finalized,
    Executed,
    Sealed,
    Expired,
}

impl TransactionStatus {
    pub fn is_final(&self) -> bool {
        matches!(self, TransactionStatus::Sealed | TransactionStatus::Expired)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionStatus::Unknown => "UNKNOWN",
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Finalized => "FINALIZED",
            TransactionStatus::Executed => "EXECUTED",
            TransactionStatus::Sealed => "SEALED",
            TransactionStatus::Expired => "EXPIRED",
        };
        write!(f, "{label}")
    }
}

impl FromStr for TransactionStatus {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "UNKNOWN" => Ok(TransactionStatus::Unknown),
            "PENDING" => Ok(TransactionStatus::Pending),
            "FINALIZED" => Ok(TransactionStatus::Finalized),
            "EXECUTED" => Ok(TransactionStatus::Executed),
            "SEALED" => Ok(TransactionStatus::Sealed),
            "EXPIRED" => Ok(TransactionStatus::Expired),
            _ => Err(GatewayError::Message(format!("unknown transaction status {s}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_type: String,
    pub transaction_id: Identifier,
    pub transaction_index: u32,
    pub event_index: u32,
    pub value: Value,
}

impl Event {
    /// Builds an event from its JSON-Cadence payload.
    pub fn from_payload(
        event_type: &str,
        transaction_id: Identifier,
        transaction_index: u32,
        event_index: u32,
        payload: &[u8],
    ) -> Result<Event, GatewayError> {
        let value = Value::decode(payload).map_err(|e| GatewayError::Message(e.to_string()))?;
        Ok(Event {
            event_type: event_type.to_string(),
            transaction_id,
            transaction_index,
            event_index,
            value,
        })
    }

    pub fn composite(&self) -> Option<&Composite> {
        match &self.value {
            Value::Composite(composite) => Some(composite),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.composite().and_then(|c| c.field(name))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionResult {
    pub status: TransactionStatus,
    pub error: Option<String>,
    pub events: Vec<Event>,
    pub block_id: Identifier,
    pub block_height: u64,
}

impl TransactionResult {
    pub fn sealed(events: Vec<Event>) -> TransactionResult {
        TransactionResult {
            status: TransactionStatus::Sealed,
            events,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: Identifier,
    pub parent_id: Identifier,
    pub height: u64,
    pub timestamp: DateTime<Utc>,
    pub collection_ids: Vec<Identifier>,
    pub sealed: bool,
}

impl Block {
    pub fn new(id: Identifier, height: u64) -> Block {
        Block {
            id,
            parent_id: Identifier::EMPTY,
            height,
            timestamp: Utc::now(),
            collection_ids: vec![],
            sealed: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub id: Identifier,
    pub transaction_ids: Vec<Identifier>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockEvents {
    pub block_id: Identifier,
    pub height: u64,
    pub timestamp: DateTime<Utc>,
    pub events: Vec<Event>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_statuses() {
        assert_eq!(
            "sealed".parse::<TransactionStatus>().unwrap(),
            TransactionStatus::Sealed
        );
        assert!(TransactionStatus::Expired.is_final());
        assert!(!TransactionStatus::Executed.is_final());
        assert!("bogus".parse::<TransactionStatus>().is_err());
    }

    #[test]
    fn reads_event_fields() {
        let payload = br#"{"type":"Event","value":{"id":"flow.AccountCreated","fields":[{"name":"address","value":{"type":"Address","value":"0x0000000000000005"}}]}}"#;
        let event = Event::from_payload(ACCOUNT_CREATED_EVENT, Identifier::EMPTY, 0, 0, payload)
            .unwrap();
        assert_eq!(
            event.field("address"),
            Some(&Value::Address(Address::from_hex("05").unwrap()))
        );
        assert!(event.field("missing").is_none());
    }
}
