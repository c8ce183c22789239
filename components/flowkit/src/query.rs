use std::fmt;
use std::str::FromStr;

use flow_codec::{Identifier, IDENTIFIER_LENGTH};

use crate::FlowkitError;

/// Which block an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockQuery {
    #[default]
    Latest,
    Height(u64),
    Id(Identifier),
}

impl FromStr for BlockQuery {
    type Err = FlowkitError;

    /// Accepts `latest`, a block height, or a 32-byte hex block id.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value == "latest" {
            return Ok(BlockQuery::Latest);
        }
        if let Ok(height) = value.parse::<u64>() {
            return Ok(BlockQuery::Height(height));
        }
        let hex = value.strip_prefix("0x").unwrap_or(value);
        if hex.len() == IDENTIFIER_LENGTH * 2 {
            if let Ok(id) = Identifier::from_hex(hex) {
                return Ok(BlockQuery::Id(id));
            }
        }
        Err(FlowkitError::QueryParse(value.to_string()))
    }
}

impl fmt::Display for BlockQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockQuery::Latest => write!(f, "latest"),
            BlockQuery::Height(height) => write!(f, "{height}"),
            BlockQuery::Id(id) => write!(f, "{id}"),
        }
    }
}

/// Block state a script executes against.
pub type ScriptQuery = BlockQuery;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_block_queries() {
        assert_eq!("latest".parse::<BlockQuery>().unwrap(), BlockQuery::Latest);
        assert_eq!("42".parse::<BlockQuery>().unwrap(), BlockQuery::Height(42));
        let id = "a".repeat(64);
        assert_eq!(
            id.parse::<BlockQuery>().unwrap(),
            BlockQuery::Id(Identifier([0xaa; 32]))
        );
    }

    #[test]
    fn rejects_unknown_queries() {
        for query in ["Latest", "-1", "abc", "", "0x1234"] {
            let err = query.parse::<BlockQuery>().unwrap_err();
            assert!(matches!(err, FlowkitError::QueryParse(_)), "{query}");
        }
        assert_eq!(
            "nope".parse::<BlockQuery>().unwrap_err().to_string(),
            "invalid query nope, valid are: \"latest\", block height or block id"
        );
    }
}
