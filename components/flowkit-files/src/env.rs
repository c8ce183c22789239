use std::collections::HashMap;

use regex::Regex;
use serde_json::Value as JsonValue;

use crate::ConfigError;

lazy_static! {
    static ref ENV_REFERENCE: Regex =
        Regex::new(r"^\$\{(\w+)\}$|^\$(\w+)$").expect("env reference pattern");
}

/// Environment lookup, `std::env::var` outside of tests.
pub type EnvLookup = dyn Fn(&str) -> Option<String> + Send + Sync;

pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Variable named by a `$NAME` or `${NAME}` token.
pub fn reference_name(value: &str) -> Option<&str> {
    let captures = ENV_REFERENCE.captures(value)?;
    captures
        .get(1)
        .or_else(|| captures.get(2))
        .map(|m| m.as_str())
}

/// Original tokens of substituted values, keyed by JSON pointer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvTokens(HashMap<String, String>);

impl EnvTokens {
    pub fn token_at(&self, pointer: &str) -> Option<String> {
        self.0.get(pointer).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Replaces every string that is an env reference with the variable's value.
pub fn substitute(document: &mut JsonValue, lookup: &EnvLookup) -> Result<EnvTokens, ConfigError> {
    let mut tokens = EnvTokens::default();
    substitute_at(document, String::new(), lookup, &mut tokens)?;
    Ok(tokens)
}

fn substitute_at(
    value: &mut JsonValue,
    pointer: String,
    lookup: &EnvLookup,
    tokens: &mut EnvTokens,
) -> Result<(), ConfigError> {
    match value {
        JsonValue::String(text) => {
            if let Some(name) = reference_name(text) {
                let resolved = lookup(name).ok_or_else(|| ConfigError::EnvNotSet(name.to_string()))?;
                tokens.0.insert(pointer, text.clone());
                *text = resolved;
            }
        }
        JsonValue::Array(items) => {
            for (index, item) in items.iter_mut().enumerate() {
                substitute_at(item, format!("{pointer}/{index}"), lookup, tokens)?;
            }
        }
        JsonValue::Object(entries) => {
            for (key, item) in entries.iter_mut() {
                substitute_at(item, format!("{pointer}/{}", escape(key)), lookup, tokens)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Escapes a key for use in a JSON pointer.
pub fn escape(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "PRIVATE_KEY" => Some("abcd".into()),
            "HOST" => Some("127.0.0.1:3570".into()),
            _ => None,
        }
    }

    #[test]
    fn matches_only_whole_references() {
        assert_eq!(reference_name("$NAME"), Some("NAME"));
        assert_eq!(reference_name("${NAME}"), Some("NAME"));
        for value in ["$$NAME", "{NAME}", "$NAME}", "${NAME", "123", "prefix$NAME"] {
            assert_eq!(reference_name(value), None, "{value}");
        }
    }

    #[test]
    fn substitutes_and_remembers_tokens() {
        let mut document = json!({
            "networks": { "local": "${HOST}" },
            "accounts": { "a/b": { "key": "$PRIVATE_KEY" } },
            "deployments": { "emulator": { "a": ["$PRIVATE_KEY"] } }
        });
        let tokens = substitute(&mut document, &lookup).unwrap();
        assert_eq!(document["networks"]["local"], "127.0.0.1:3570");
        assert_eq!(document["accounts"]["a/b"]["key"], "abcd");
        assert_eq!(
            tokens.token_at("/accounts/a~1b/key"),
            Some("$PRIVATE_KEY".to_string())
        );
        assert_eq!(
            tokens.token_at("/deployments/emulator/a/0"),
            Some("$PRIVATE_KEY".to_string())
        );
        assert_eq!(tokens.token_at("/networks/local"), Some("${HOST}".to_string()));
    }

    #[test]
    fn missing_variable_fails() {
        let mut document = json!({ "accounts": { "a": { "key": "$MISSING" } } });
        assert_eq!(
            substitute(&mut document, &lookup).unwrap_err().to_string(),
            "required environment variable MISSING not set"
        );
    }
}
