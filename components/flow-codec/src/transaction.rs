use rlp::{Rlp, RlpStream};
use sha3::{Digest, Sha3_256};

use crate::{Address, CodecError, Identifier};

pub const TRANSACTION_DOMAIN_TAG: &str = "FLOW-V0.0-transaction";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposalKey {
    pub address: Address,
    pub key_index: u32,
    pub sequence_number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSignature {
    pub address: Address,
    pub signer_index: usize,
    pub key_index: u32,
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    pub script: Vec<u8>,
    /// JSON-Cadence encoded arguments.
    pub arguments: Vec<Vec<u8>>,
    pub reference_block_id: Identifier,
    pub gas_limit: u64,
    pub proposal_key: ProposalKey,
    pub payer: Address,
    pub authorizers: Vec<Address>,
    pub payload_signatures: Vec<TransactionSignature>,
    pub envelope_signatures: Vec<TransactionSignature>,
}

impl Transaction {
    pub fn new() -> Transaction {
        Transaction::default()
    }

    /// Distinct participating addresses, ordered proposer, payer, authorizers.
    /// Signature entries reference signers by their position in this list.
    pub fn signer_list(&self) -> Vec<Address> {
        let mut signers: Vec<Address> = vec![];
        let mut push = |address: Address| {
            if !signers.contains(&address) {
                signers.push(address);
            }
        };
        push(self.proposal_key.address);
        push(self.payer);
        for authorizer in self.authorizers.iter() {
            push(*authorizer);
        }
        signers
    }

    fn signer_index(&self, address: &Address) -> Result<usize, CodecError> {
        self.signer_list()
            .iter()
            .position(|a| a == address)
            .ok_or_else(|| CodecError::Message(format!("{address} is not a transaction signer")))
    }

    fn append_payload(&self, stream: &mut RlpStream) {
        stream.begin_list(9);
        stream.append(&self.script);
        stream.begin_list(self.arguments.len());
        for argument in self.arguments.iter() {
            stream.append(argument);
        }
        stream.append(&self.reference_block_id.as_bytes().to_vec());
        stream.append(&self.gas_limit);
        stream.append(&self.proposal_key.address.as_bytes().to_vec());
        stream.append(&(self.proposal_key.key_index as u64));
        stream.append(&self.proposal_key.sequence_number);
        stream.append(&self.payer.as_bytes().to_vec());
        stream.begin_list(self.authorizers.len());
        for authorizer in self.authorizers.iter() {
            stream.append(&authorizer.as_bytes().to_vec());
        }
    }

    fn append_signatures(stream: &mut RlpStream, signatures: &[TransactionSignature]) {
        stream.begin_list(signatures.len());
        for signature in signatures.iter() {
            stream.begin_list(3);
            stream.append(&(signature.signer_index as u64));
            stream.append(&(signature.key_index as u64));
            stream.append(&signature.signature);
        }
    }

    pub fn payload_rlp(&self) -> Vec<u8> {
        let mut stream = RlpStream::new();
        self.append_payload(&mut stream);
        stream.out().to_vec()
    }

    pub fn envelope_rlp(&self) -> Vec<u8> {
        let mut stream = RlpStream::new_list(2);
        self.append_payload(&mut stream);
        Transaction::append_signatures(&mut stream, &self.payload_signatures);
        stream.out().to_vec()
    }

    /// Full wire form: payload, payload signatures, envelope signatures.
    pub fn encode(&self) -> Vec<u8> {
        let mut stream = RlpStream::new_list(3);
        self.append_payload(&mut stream);
        Transaction::append_signatures(&mut stream, &self.payload_signatures);
        Transaction::append_signatures(&mut stream, &self.envelope_signatures);
        stream.out().to_vec()
    }

    pub fn payload_message(&self) -> Vec<u8> {
        let mut message = domain_tag();
        message.extend(self.payload_rlp());
        message
    }

    pub fn envelope_message(&self) -> Vec<u8> {
        let mut message = domain_tag();
        message.extend(self.envelope_rlp());
        message
    }

    pub fn id(&self) -> Identifier {
        let digest = Sha3_256::digest(self.encode());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Identifier(bytes)
    }

    pub fn add_payload_signature(
        &mut self,
        address: Address,
        key_index: u32,
        signature: Vec<u8>,
    ) -> Result<(), CodecError> {
        let signer_index = self.signer_index(&address)?;
        self.payload_signatures.push(TransactionSignature {
            address,
            signer_index,
            key_index,
            signature,
        });
        sort_signatures(&mut self.payload_signatures);
        Ok(())
    }

    pub fn add_envelope_signature(
        &mut self,
        address: Address,
        key_index: u32,
        signature: Vec<u8>,
    ) -> Result<(), CodecError> {
        let signer_index = self.signer_index(&address)?;
        self.envelope_signatures.push(TransactionSignature {
            address,
            signer_index,
            key_index,
            signature,
        });
        sort_signatures(&mut self.envelope_signatures);
        Ok(())
    }

    /// Decodes either the full wire form or a bare payload.
    pub fn decode(bytes: &[u8]) -> Result<Transaction, CodecError> {
        let rlp = Rlp::new(bytes);
        let count = rlp.item_count()?;
        let mut transaction = match count {
            9 => decode_payload(&rlp)?,
            3 | 2 => decode_payload(&rlp.at(0)?)?,
            _ => {
                return Err(CodecError::Message(format!(
                    "unexpected transaction list length {count}"
                )))
            }
        };
        if count != 9 {
            let signers = transaction.signer_list();
            transaction.payload_signatures = decode_signatures(&rlp.at(1)?, &signers)?;
            if count == 3 {
                transaction.envelope_signatures = decode_signatures(&rlp.at(2)?, &signers)?;
            }
        }
        Ok(transaction)
    }

    pub fn decode_hex(value: &str) -> Result<Transaction, CodecError> {
        let trimmed = value.trim();
        let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(trimmed).map_err(|e| CodecError::Message(e.to_string()))?;
        Transaction::decode(&bytes)
    }
}

fn domain_tag() -> Vec<u8> {
    let mut tag = TRANSACTION_DOMAIN_TAG.as_bytes().to_vec();
    tag.resize(32, 0);
    tag
}

fn sort_signatures(signatures: &mut [TransactionSignature]) {
    signatures.sort_by_key(|s| (s.signer_index, s.key_index));
}

fn decode_address(rlp: &Rlp) -> Result<Address, CodecError> {
    let data = rlp.data()?;
    Address::from_bytes(data).ok_or_else(|| CodecError::Message("invalid address length".into()))
}

fn decode_payload(rlp: &Rlp) -> Result<Transaction, CodecError> {
    if rlp.item_count()? != 9 {
        return Err(CodecError::Message("invalid transaction payload".into()));
    }
    let script: Vec<u8> = rlp.val_at(0)?;
    let arguments: Vec<Vec<u8>> = rlp.list_at(1)?;
    let reference_block_id = Identifier::from_bytes(rlp.at(2)?.data()?)
        .ok_or_else(|| CodecError::Message("invalid reference block id".into()))?;
    let gas_limit: u64 = rlp.val_at(3)?;
    let proposer = decode_address(&rlp.at(4)?)?;
    let key_index: u64 = rlp.val_at(5)?;
    let sequence_number: u64 = rlp.val_at(6)?;
    let payer = decode_address(&rlp.at(7)?)?;
    let mut authorizers = vec![];
    for item in rlp.at(8)?.iter() {
        authorizers.push(decode_address(&item)?);
    }
    Ok(Transaction {
        script,
        arguments,
        reference_block_id,
        gas_limit,
        proposal_key: ProposalKey {
            address: proposer,
            key_index: key_index as u32,
            sequence_number,
        },
        payer,
        authorizers,
        payload_signatures: vec![],
        envelope_signatures: vec![],
    })
}

fn decode_signatures(
    rlp: &Rlp,
    signers: &[Address],
) -> Result<Vec<TransactionSignature>, CodecError> {
    let mut signatures = vec![];
    for item in rlp.iter() {
        let signer_index: u64 = item.val_at(0)?;
        let key_index: u64 = item.val_at(1)?;
        let signature: Vec<u8> = item.val_at(2)?;
        let address = signers
            .get(signer_index as usize)
            .copied()
            .ok_or_else(|| CodecError::Message(format!("invalid signer index {signer_index}")))?;
        signatures.push(TransactionSignature {
            address,
            signer_index: signer_index as usize,
            key_index: key_index as u32,
            signature,
        });
    }
    Ok(signatures)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transaction {
        Transaction {
            script: b"transaction { execute { log(\"hi\") } }".to_vec(),
            arguments: vec![br#"{"type":"String","value":"a"}"#.to_vec()],
            reference_block_id: Identifier([7u8; 32]),
            gas_limit: 9999,
            proposal_key: ProposalKey {
                address: Address::from_hex("01").unwrap(),
                key_index: 0,
                sequence_number: 42,
            },
            payer: Address::from_hex("02").unwrap(),
            authorizers: vec![Address::from_hex("01").unwrap()],
            payload_signatures: vec![],
            envelope_signatures: vec![],
        }
    }

    #[test]
    fn signer_list_is_deduplicated() {
        let tx = sample();
        assert_eq!(
            tx.signer_list(),
            vec![
                Address::from_hex("01").unwrap(),
                Address::from_hex("02").unwrap()
            ]
        );
    }

    #[test]
    fn decodes_payload_and_signed_forms() {
        let mut tx = sample();
        let from_payload = Transaction::decode(&tx.payload_rlp()).unwrap();
        assert_eq!(from_payload, tx);

        tx.add_payload_signature(Address::from_hex("01").unwrap(), 0, vec![1; 64])
            .unwrap();
        tx.add_envelope_signature(Address::from_hex("02").unwrap(), 3, vec![2; 64])
            .unwrap();
        let decoded = Transaction::decode(&tx.encode()).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.envelope_signatures[0].signer_index, 1);
    }

    #[test]
    fn signing_messages_carry_padded_domain_tag() {
        let tx = sample();
        let message = tx.payload_message();
        assert_eq!(&message[..21], TRANSACTION_DOMAIN_TAG.as_bytes());
        assert!(message[21..32].iter().all(|b| *b == 0));
        assert_eq!(&message[32..], &tx.payload_rlp()[..]);
    }

    #[test]
    fn signatures_change_the_id() {
        let mut tx = sample();
        let unsigned = tx.id();
        tx.add_envelope_signature(Address::from_hex("02").unwrap(), 0, vec![9; 64])
            .unwrap();
        assert_ne!(unsigned, tx.id());
    }

    #[test]
    fn rejects_signature_from_outsider() {
        let mut tx = sample();
        assert!(tx
            .add_payload_signature(Address::from_hex("03").unwrap(), 0, vec![0; 64])
            .is_err());
    }
}
