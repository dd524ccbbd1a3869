//! Symbolic values and their bit-level codes.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use crate::circuit::{from_int, to_int};
use crate::error::{CoinsError, Result};

/// A value carried on a port, before encoding or after decoding.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Value {
    Int(u64),
    Bits(Vec<bool>),
    Sym(String),
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bits(vec![value])
    }
}

impl From<Vec<bool>> for Value {
    fn from(bits: Vec<bool>) -> Self {
        Value::Bits(bits)
    }
}

impl From<&str> for Value {
    fn from(sym: &str) -> Self {
        Value::Sym(sym.to_string())
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Bits(bits) => {
                write!(f, "0b")?;
                for &b in bits.iter().rev() {
                    write!(f, "{}", b as u8)?;
                }
                Ok(())
            }
            Value::Sym(s) => write!(f, "{}", s),
        }
    }
}

/// A partial bijection between symbols and integer codes.
///
/// Values without a symbol fall back to their plain integer or bit reading,
/// so the empty encoding is the identity.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Encoding {
    encode: BTreeMap<Value, u64>,
    decode: BTreeMap<u64, Value>,
}

impl Encoding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an encoding from `(value, code)` pairs.
    pub fn from_pairs<V: Into<Value>>(pairs: impl IntoIterator<Item = (V, u64)>) -> Self {
        let mut enc = Self::new();
        for (value, code) in pairs {
            enc = enc.with(value, code);
        }
        enc
    }

    pub fn with(mut self, value: impl Into<Value>, code: u64) -> Self {
        let value = value.into();
        assert!(!self.decode.contains_key(&code), "code {} is already taken", code);
        assert!(!self.encode.contains_key(&value), "value {} is already encoded", value);
        self.encode.insert(value.clone(), code);
        self.decode.insert(code, value);
        self
    }

    pub fn is_identity(&self) -> bool {
        self.encode.is_empty()
    }

    /// Encodes `value` as `width` bits of port `name`.
    pub fn encode(&self, name: &str, value: &Value, width: usize) -> Result<Vec<bool>> {
        let code = match (self.encode.get(value), value) {
            (Some(&code), _) => code,
            (None, Value::Int(v)) => *v,
            (None, Value::Bits(bits)) => {
                if bits.len() != width {
                    return Err(CoinsError::WidthMismatch {
                        name: name.to_string(),
                        expected: width,
                        actual: bits.len(),
                    });
                }
                return Ok(bits.clone());
            }
            (None, Value::Sym(sym)) => {
                return Err(CoinsError::UnknownSymbol {
                    name: name.to_string(),
                    symbol: sym.clone(),
                });
            }
        };
        if width < 64 && code >> width != 0 {
            return Err(CoinsError::ValueTooWide { value: code, width });
        }
        Ok(from_int(code, width))
    }

    /// Decodes bits; codes without a symbol come back as [`Value::Int`].
    ///
    /// Ports wider than 64 bits decode to [`Value::Bits`].
    pub fn decode(&self, bits: &[bool]) -> Value {
        if bits.len() > 64 {
            return Value::Bits(bits.to_vec());
        }
        let code = to_int(bits);
        self.decode.get(&code).cloned().unwrap_or(Value::Int(code))
    }
}
