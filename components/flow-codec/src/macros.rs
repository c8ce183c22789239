#[macro_export]
macro_rules! impl_byte_array_newtype {
    ($thing:ident, $len:expr) => {
        impl $thing {
            /// Instantiates from a hex string, with or without the `0x` prefix.
            /// Shorter inputs are left-padded with zeros.
            pub fn from_hex(hex_str: &str) -> Result<$thing, $crate::CodecError> {
                let trimmed = hex_str.trim();
                let trimmed = trimmed
                    .strip_prefix("0x")
                    .or_else(|| trimmed.strip_prefix("0X"))
                    .unwrap_or(trimmed);
                if trimmed.is_empty() || trimmed.len() > $len * 2 {
                    return Err($crate::CodecError::InvalidHex {
                        kind: stringify!($thing),
                        value: hex_str.to_string(),
                    });
                }
                let padded = format!("{:0>width$}", trimmed, width = $len * 2);
                let bytes = hex::decode(&padded).map_err(|_| $crate::CodecError::InvalidHex {
                    kind: stringify!($thing),
                    value: hex_str.to_string(),
                })?;
                let mut ret = [0; $len];
                ret.copy_from_slice(&bytes);
                Ok($thing(ret))
            }

            /// Instantiates from a slice of bytes
            pub fn from_bytes(inp: &[u8]) -> Option<$thing> {
                if inp.len() == $len {
                    let mut ret = [0; $len];
                    ret.copy_from_slice(inp);
                    Some($thing(ret))
                } else {
                    None
                }
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Lowercase hex, fixed width, no prefix.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn to_hex_with_prefix(&self) -> String {
                format!("0x{}", self.to_hex())
            }

            pub fn is_empty(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }
        }
        impl std::fmt::Display for $thing {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }
        impl std::fmt::Debug for $thing {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($thing), self.to_hex())
            }
        }
        impl std::str::FromStr for $thing {
            type Err = $crate::CodecError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $thing::from_hex(s)
            }
        }
        impl std::convert::AsRef<[u8]> for $thing {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }
        impl std::convert::From<[u8; $len]> for $thing {
            fn from(o: [u8; $len]) -> Self {
                Self(o)
            }
        }
        impl serde::Serialize for $thing {
            fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.serialize_str(&self.to_hex())
            }
        }
        impl<'de> serde::Deserialize<'de> for $thing {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<$thing, D::Error> {
                let value = String::deserialize(d)?;
                $thing::from_hex(&value).map_err(serde::de::Error::custom)
            }
        }
    };
}
