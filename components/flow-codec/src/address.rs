use std::fmt;
use std::str::FromStr;

use crate::CodecError;

pub const ADDRESS_LENGTH: usize = 8;
pub const IDENTIFIER_LENGTH: usize = 32;

/// 8-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub [u8; ADDRESS_LENGTH]);
impl_byte_array_newtype!(Address, ADDRESS_LENGTH);

/// 32-byte identifier of blocks, collections and transactions.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Identifier(pub [u8; IDENTIFIER_LENGTH]);
impl_byte_array_newtype!(Identifier, IDENTIFIER_LENGTH);

impl Identifier {
    pub const EMPTY: Identifier = Identifier([0; IDENTIFIER_LENGTH]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainId {
    Emulator,
    Testnet,
    Mainnet,
}

impl ChainId {
    pub fn service_address(&self) -> Address {
        match self {
            ChainId::Emulator => Address([0xf8, 0xd6, 0xe0, 0x58, 0x6b, 0x0a, 0x20, 0xc7]),
            ChainId::Testnet => Address([0x8c, 0x53, 0x03, 0xea, 0xa2, 0x62, 0x02, 0xd6]),
            ChainId::Mainnet => Address([0xe4, 0x67, 0xb9, 0xdd, 0x11, 0xfa, 0x00, 0xdf]),
        }
    }

    /// Chain a network host most likely belongs to.
    pub fn for_network_name(name: &str) -> ChainId {
        match name {
            "mainnet" => ChainId::Mainnet,
            "testnet" | "crescendo" => ChainId::Testnet,
            _ => ChainId::Emulator,
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainId::Emulator => write!(f, "flow-emulator"),
            ChainId::Testnet => write!(f, "flow-testnet"),
            ChainId::Mainnet => write!(f, "flow-mainnet"),
        }
    }
}

impl FromStr for ChainId {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flow-emulator" | "emulator" => Ok(ChainId::Emulator),
            "flow-testnet" | "testnet" => Ok(ChainId::Testnet),
            "flow-mainnet" | "mainnet" => Ok(ChainId::Mainnet),
            _ => Err(CodecError::Message(format!("unknown chain id {s}"))),
        }
    }
}

impl Address {
    /// The emulator service account.
    pub fn service() -> Address {
        ChainId::Emulator.service_address()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_fixed_width_lowercase_hex() {
        let address = Address::from_hex("0x01").unwrap();
        assert_eq!(address.to_string(), "0000000000000001");
        assert_eq!(address.to_hex_with_prefix(), "0x0000000000000001");
        assert_eq!(
            Address::from_hex("F8D6E0586B0A20C7").unwrap(),
            Address::service()
        );
    }

    #[test]
    fn rejects_oversized_or_non_hex_input() {
        assert!(Address::from_hex("0x0102030405060708ff").is_err());
        assert!(Address::from_hex("zz").is_err());
        assert!(Address::from_hex("").is_err());
    }

    #[test]
    fn service_addresses_per_chain() {
        assert_eq!(
            ChainId::Testnet.service_address().to_hex(),
            "8c5303eaa26202d6"
        );
        assert_eq!(
            ChainId::Mainnet.service_address().to_hex(),
            "e467b9dd11fa00df"
        );
    }

    #[test]
    fn identifier_parses_full_width_hex() {
        let hex = "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a";
        let id: Identifier = hex.parse().unwrap();
        assert_eq!(id.to_string(), hex);
        assert!(Identifier::EMPTY.is_empty());
    }

    #[test]
    fn from_bytes_requires_exact_width() {
        let address = Address::from_bytes(&[0, 0, 0, 0, 0, 0, 0, 5]).unwrap();
        assert_eq!(address, Address::from_hex("05").unwrap());
        assert!(Address::from_bytes(&[5]).is_none());
        assert!(Identifier::from_bytes(&[0; 31]).is_none());
        assert_eq!(Identifier::from_bytes(&[0; 32]), Some(Identifier::EMPTY));
    }
}
