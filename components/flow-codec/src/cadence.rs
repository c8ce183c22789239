//! Cadence values and their JSON-Cadence interchange encoding.

use std::fmt;

use serde_json::{json, Map, Value as JsonValue};

use crate::{Address, CodecError};

const FIX64_SCALE: u64 = 100_000_000;
const FIX64_DECIMALS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeKind {
    Struct,
    Resource,
    Event,
    Contract,
    Enum,
}

impl CompositeKind {
    fn as_str(&self) -> &'static str {
        match self {
            CompositeKind::Struct => "Struct",
            CompositeKind::Resource => "Resource",
            CompositeKind::Event => "Event",
            CompositeKind::Contract => "Contract",
            CompositeKind::Enum => "Enum",
        }
    }

    fn from_str(value: &str) -> Option<CompositeKind> {
        match value {
            "Struct" => Some(CompositeKind::Struct),
            "Resource" => Some(CompositeKind::Resource),
            "Event" => Some(CompositeKind::Event),
            "Contract" => Some(CompositeKind::Contract),
            "Enum" => Some(CompositeKind::Enum),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    pub kind: CompositeKind,
    pub id: String,
    pub fields: Vec<(String, Value)>,
}

impl Composite {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Void,
    Optional(Option<Box<Value>>),
    Bool(bool),
    String(String),
    Character(String),
    Address(Address),
    Int(i128),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Int128(i128),
    UInt(u128),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    UInt128(u128),
    Word8(u8),
    Word16(u16),
    Word32(u32),
    Word64(u64),
    /// Fixed point with 8 decimals, stored scaled by 10^8.
    Fix64(i64),
    UFix64(u64),
    Array(Vec<Value>),
    Dictionary(Vec<(Value, Value)>),
    Path { domain: String, identifier: String },
    Type(String),
    Composite(Composite),
}

impl Value {
    pub fn some(value: Value) -> Value {
        Value::Optional(Some(Box::new(value)))
    }

    pub fn string(value: &str) -> Value {
        Value::String(value.to_string())
    }

    /// Parses a decimal such as `"10.5"` into a `UFix64`.
    pub fn ufix64(value: &str) -> Result<Value, CodecError> {
        let scaled = parse_fixed_point(value.trim_start_matches('+'))?;
        if scaled < 0 {
            return Err(CodecError::Cadence(format!("negative UFix64 {value}")));
        }
        Ok(Value::UFix64(scaled as u64))
    }

    pub fn fix64(value: &str) -> Result<Value, CodecError> {
        Ok(Value::Fix64(parse_fixed_point(value)?))
    }

    /// Static type identifier, as it would be written in a Cadence parameter list.
    pub fn type_id(&self) -> String {
        match self {
            Value::Void => "Void".into(),
            Value::Optional(Some(inner)) => format!("{}?", inner.type_id()),
            Value::Optional(None) => "AnyStruct?".into(),
            Value::Bool(_) => "Bool".into(),
            Value::String(_) => "String".into(),
            Value::Character(_) => "Character".into(),
            Value::Address(_) => "Address".into(),
            Value::Int(_) => "Int".into(),
            Value::Int8(_) => "Int8".into(),
            Value::Int16(_) => "Int16".into(),
            Value::Int32(_) => "Int32".into(),
            Value::Int64(_) => "Int64".into(),
            Value::Int128(_) => "Int128".into(),
            Value::UInt(_) => "UInt".into(),
            Value::UInt8(_) => "UInt8".into(),
            Value::UInt16(_) => "UInt16".into(),
            Value::UInt32(_) => "UInt32".into(),
            Value::UInt64(_) => "UInt64".into(),
            Value::UInt128(_) => "UInt128".into(),
            Value::Word8(_) => "Word8".into(),
            Value::Word16(_) => "Word16".into(),
            Value::Word32(_) => "Word32".into(),
            Value::Word64(_) => "Word64".into(),
            Value::Fix64(_) => "Fix64".into(),
            Value::UFix64(_) => "UFix64".into(),
            Value::Array(values) => format!("[{}]", uniform_type(values.iter())),
            Value::Dictionary(entries) => format!(
                "{{{}: {}}}",
                uniform_type(entries.iter().map(|(k, _)| k)),
                uniform_type(entries.iter().map(|(_, v)| v))
            ),
            Value::Path { domain, .. } => match domain.as_str() {
                "storage" => "StoragePath".into(),
                "public" => "PublicPath".into(),
                "private" => "PrivatePath".into(),
                _ => "Path".into(),
            },
            Value::Type(_) => "Type".into(),
            Value::Composite(composite) => composite.id.clone(),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Void => json!({ "type": "Void" }),
            Value::Optional(inner) => json!({
                "type": "Optional",
                "value": inner.as_ref().map(|v| v.to_json()),
            }),
            Value::Bool(v) => json!({ "type": "Bool", "value": v }),
            Value::String(v) => json!({ "type": "String", "value": v }),
            Value::Character(v) => json!({ "type": "Character", "value": v }),
            Value::Address(v) => json!({ "type": "Address", "value": v.to_hex_with_prefix() }),
            Value::Int(v) => number_json("Int", v),
            Value::Int8(v) => number_json("Int8", v),
            Value::Int16(v) => number_json("Int16", v),
            Value::Int32(v) => number_json("Int32", v),
            Value::Int64(v) => number_json("Int64", v),
            Value::Int128(v) => number_json("Int128", v),
            Value::UInt(v) => number_json("UInt", v),
            Value::UInt8(v) => number_json("UInt8", v),
            Value::UInt16(v) => number_json("UInt16", v),
            Value::UInt32(v) => number_json("UInt32", v),
            Value::UInt64(v) => number_json("UInt64", v),
            Value::UInt128(v) => number_json("UInt128", v),
            Value::Word8(v) => number_json("Word8", v),
            Value::Word16(v) => number_json("Word16", v),
            Value::Word32(v) => number_json("Word32", v),
            Value::Word64(v) => number_json("Word64", v),
            Value::Fix64(v) => json!({ "type": "Fix64", "value": format_fixed_point(*v as i128) }),
            Value::UFix64(v) => {
                json!({ "type": "UFix64", "value": format_fixed_point(*v as i128) })
            }
            Value::Array(values) => json!({
                "type": "Array",
                "value": values.iter().map(|v| v.to_json()).collect::<Vec<_>>(),
            }),
            Value::Dictionary(entries) => json!({
                "type": "Dictionary",
                "value": entries
                    .iter()
                    .map(|(k, v)| json!({ "key": k.to_json(), "value": v.to_json() }))
                    .collect::<Vec<_>>(),
            }),
            Value::Path { domain, identifier } => json!({
                "type": "Path",
                "value": { "domain": domain, "identifier": identifier },
            }),
            Value::Type(static_type) => json!({
                "type": "Type",
                "value": { "staticType": static_type },
            }),
            Value::Composite(composite) => json!({
                "type": composite.kind.as_str(),
                "value": {
                    "id": composite.id,
                    "fields": composite
                        .fields
                        .iter()
                        .map(|(name, value)| json!({ "name": name, "value": value.to_json() }))
                        .collect::<Vec<_>>(),
                },
            }),
        }
    }

    pub fn from_json(json: &JsonValue) -> Result<Value, CodecError> {
        let object = json
            .as_object()
            .ok_or_else(|| CodecError::Cadence(format!("expected object, found {json}")))?;
        let kind = object
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| CodecError::Cadence("missing field type".into()))?;
        let value = object.get("value").unwrap_or(&JsonValue::Null);

        let parsed = match kind {
            "Void" => Value::Void,
            "Optional" => match value {
                JsonValue::Null => Value::Optional(None),
                inner => Value::some(Value::from_json(inner)?),
            },
            "Bool" => Value::Bool(
                value
                    .as_bool()
                    .ok_or_else(|| invalid_value(kind, value))?,
            ),
            "String" => Value::String(expect_str(kind, value)?.to_string()),
            "Character" => Value::Character(expect_str(kind, value)?.to_string()),
            "Address" => Value::Address(Address::from_hex(expect_str(kind, value)?)?),
            "Int" => Value::Int(parse_number(kind, value)?),
            "Int8" => Value::Int8(parse_number(kind, value)?),
            "Int16" => Value::Int16(parse_number(kind, value)?),
            "Int32" => Value::Int32(parse_number(kind, value)?),
            "Int64" => Value::Int64(parse_number(kind, value)?),
            "Int128" => Value::Int128(parse_number(kind, value)?),
            "UInt" => Value::UInt(parse_number(kind, value)?),
            "UInt8" => Value::UInt8(parse_number(kind, value)?),
            "UInt16" => Value::UInt16(parse_number(kind, value)?),
            "UInt32" => Value::UInt32(parse_number(kind, value)?),
            "UInt64" => Value::UInt64(parse_number(kind, value)?),
            "UInt128" => Value::UInt128(parse_number(kind, value)?),
            "Word8" => Value::Word8(parse_number(kind, value)?),
            "Word16" => Value::Word16(parse_number(kind, value)?),
            "Word32" => Value::Word32(parse_number(kind, value)?),
            "Word64" => Value::Word64(parse_number(kind, value)?),
            "Fix64" => Value::fix64(expect_str(kind, value)?)?,
            "UFix64" => Value::ufix64(expect_str(kind, value)?)?,
            "Array" => Value::Array(
                value
                    .as_array()
                    .ok_or_else(|| invalid_value(kind, value))?
                    .iter()
                    .map(Value::from_json)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            "Dictionary" => {
                let mut entries = vec![];
                for entry in value.as_array().ok_or_else(|| invalid_value(kind, value))? {
                    let key = entry
                        .get("key")
                        .ok_or_else(|| invalid_value(kind, entry))?;
                    let val = entry
                        .get("value")
                        .ok_or_else(|| invalid_value(kind, entry))?;
                    entries.push((Value::from_json(key)?, Value::from_json(val)?));
                }
                Value::Dictionary(entries)
            }
            "Path" => Value::Path {
                domain: expect_str(kind, value.get("domain").unwrap_or(&JsonValue::Null))?
                    .to_string(),
                identifier: expect_str(kind, value.get("identifier").unwrap_or(&JsonValue::Null))?
                    .to_string(),
            },
            "Type" => {
                let static_type = value.get("staticType").unwrap_or(&JsonValue::Null);
                let rendered = match static_type {
                    JsonValue::String(s) => s.clone(),
                    JsonValue::Object(o) => o
                        .get("typeID")
                        .or_else(|| o.get("kind"))
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    _ => String::new(),
                };
                Value::Type(rendered)
            }
            other => {
                let composite_kind = CompositeKind::from_str(other)
                    .ok_or_else(|| CodecError::Cadence(format!("unsupported type {other}")))?;
                let id = expect_str(kind, value.get("id").unwrap_or(&JsonValue::Null))?;
                let mut fields = vec![];
                if let Some(entries) = value.get("fields").and_then(|f| f.as_array()) {
                    for field in entries {
                        let name = expect_str(kind, field.get("name").unwrap_or(&JsonValue::Null))?;
                        let val = field
                            .get("value")
                            .ok_or_else(|| invalid_value(kind, field))?;
                        fields.push((name.to_string(), Value::from_json(val)?));
                    }
                }
                Value::Composite(Composite {
                    kind: composite_kind,
                    id: id.to_string(),
                    fields,
                })
            }
        };
        Ok(parsed)
    }

    /// JSON-Cadence bytes, the form transaction and script arguments travel in.
    pub fn encode(&self) -> Vec<u8> {
        self.to_json().to_string().into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<Value, CodecError> {
        let json: JsonValue =
            serde_json::from_slice(bytes).map_err(|e| CodecError::Cadence(e.to_string()))?;
        Value::from_json(&json)
    }
}

/// Parses a JSON array of JSON-Cadence values, as accepted on the command line.
pub fn parse_json_arguments(input: &str) -> Result<Vec<Value>, CodecError> {
    let json: JsonValue =
        serde_json::from_str(input).map_err(|e| CodecError::Cadence(e.to_string()))?;
    match json {
        JsonValue::Array(values) => values.iter().map(Value::from_json).collect(),
        other => Err(CodecError::Cadence(format!(
            "arguments must be a JSON array, found {other}"
        ))),
    }
}

fn uniform_type<'a>(mut values: impl Iterator<Item = &'a Value>) -> String {
    let first = match values.next() {
        Some(value) => value.type_id(),
        None => return "AnyStruct".into(),
    };
    if values.all(|v| v.type_id() == first) {
        first
    } else {
        "AnyStruct".into()
    }
}

fn number_json<T: ToString>(kind: &str, value: &T) -> JsonValue {
    let mut map = Map::new();
    map.insert("type".into(), JsonValue::String(kind.into()));
    map.insert("value".into(), JsonValue::String(value.to_string()));
    JsonValue::Object(map)
}

fn invalid_value(kind: &str, value: &JsonValue) -> CodecError {
    CodecError::Cadence(format!("invalid {kind} value {value}"))
}

fn expect_str<'a>(kind: &str, value: &'a JsonValue) -> Result<&'a str, CodecError> {
    value.as_str().ok_or_else(|| invalid_value(kind, value))
}

fn parse_number<T: std::str::FromStr>(kind: &str, value: &JsonValue) -> Result<T, CodecError> {
    let raw = match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        _ => return Err(invalid_value(kind, value)),
    };
    raw.parse::<T>().map_err(|_| invalid_value(kind, value))
}

fn parse_fixed_point(value: &str) -> Result<i64, CodecError> {
    let invalid = || CodecError::Cadence(format!("invalid fixed point number {value}"));
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    let (integer, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if integer.is_empty()
        || fraction.len() > FIX64_DECIMALS
        || !integer.chars().all(|c| c.is_ascii_digit())
        || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }
    let integer: i64 = integer.parse().map_err(|_| invalid())?;
    let fraction: i64 = if fraction.is_empty() {
        0
    } else {
        format!("{:0<width$}", fraction, width = FIX64_DECIMALS)
            .parse()
            .map_err(|_| invalid())?
    };
    let scaled = integer
        .checked_mul(FIX64_SCALE as i64)
        .and_then(|v| v.checked_add(fraction))
        .ok_or_else(invalid)?;
    Ok(if negative { -scaled } else { scaled })
}

fn format_fixed_point(value: i128) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    format!(
        "{}{}.{:0width$}",
        sign,
        abs / FIX64_SCALE as u128,
        abs % FIX64_SCALE as u128,
        width = FIX64_DECIMALS
    )
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "()"),
            Value::Optional(None) => write!(f, "nil"),
            Value::Optional(Some(inner)) => write!(f, "{inner}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v:?}"),
            Value::Character(v) => write!(f, "{v:?}"),
            Value::Address(v) => write!(f, "{}", v.to_hex_with_prefix()),
            Value::Int(v) | Value::Int128(v) => write!(f, "{v}"),
            Value::Int8(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt(v) | Value::UInt128(v) => write!(f, "{v}"),
            Value::UInt8(v) | Value::Word8(v) => write!(f, "{v}"),
            Value::UInt16(v) | Value::Word16(v) => write!(f, "{v}"),
            Value::UInt32(v) | Value::Word32(v) => write!(f, "{v}"),
            Value::UInt64(v) | Value::Word64(v) => write!(f, "{v}"),
            Value::Fix64(v) => write!(f, "{}", format_fixed_point(*v as i128)),
            Value::UFix64(v) => write!(f, "{}", format_fixed_point(*v as i128)),
            Value::Array(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
            Value::Dictionary(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            Value::Path { domain, identifier } => write!(f, "/{domain}/{identifier}"),
            Value::Type(static_type) => write!(f, "Type<{static_type}>()"),
            Value::Composite(composite) => {
                write!(f, "{}(", composite.id)?;
                for (i, (name, value)) in composite.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                write!(f, ")")
            }
        }
    }
}
