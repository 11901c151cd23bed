//! Runtime values manipulated by contracts

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{GammaVmError, Result};

/// A typed runtime value
///
/// The serde representation is externally tagged so that values can be
/// stored with a compact binary encoding; [`Value::to_json`] gives the plain
/// JSON form used in outcomes.
///
/// String and byte payloads are shared: cloning a value never copies them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// Absence of a value
    Null,
    /// Boolean
    Bool(bool),
    /// Signed 64-bit integer
    Int(i64),
    /// UTF-8 string
    Str(Arc<str>),
    /// Raw bytes
    Bytes(Arc<[u8]>),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bytes(bytes) => {
                write!(f, "0x")?;
                for byte in bytes.iter() {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

impl Value {
    /// Type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
        }
    }

    /// Integer payload or a type fault
    pub fn as_int(&self, what: &str) -> Result<i64> {
        match self {
            Value::Int(i) => Ok(*i),
            other => Err(Self::mismatch(what, "int", other)),
        }
    }

    /// Boolean payload or a type fault
    pub fn as_bool(&self, what: &str) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(Self::mismatch(what, "bool", other)),
        }
    }

    fn mismatch(what: &str, expected: &str, found: &Value) -> GammaVmError {
        GammaVmError::fault(format!(
            "{} expected {}, found {}",
            what,
            expected,
            found.type_name()
        ))
    }

    /// Payload size of a string or byte string, 0 for scalars
    pub fn payload_len(&self) -> usize {
        match self {
            Value::Str(s) => s.len(),
            Value::Bytes(bytes) => bytes.len(),
            Value::Null | Value::Bool(_) | Value::Int(_) => 0,
        }
    }

    /// Length of the `Display` rendering, computed without rendering
    pub fn rendered_len(&self) -> usize {
        match self {
            Value::Null => 4,
            Value::Bool(true) => 4,
            Value::Bool(false) => 5,
            Value::Int(i) => {
                let digits = i.unsigned_abs().checked_ilog10().unwrap_or(0);
                // ilog10 of a u64 is at most 19
                let digits = usize::try_from(digits).unwrap_or(19).saturating_add(1);
                digits.saturating_add(usize::from(*i < 0))
            }
            Value::Str(s) => s.len(),
            Value::Bytes(bytes) => bytes.len().saturating_mul(2).saturating_add(2),
        }
    }

    /// Bytes identifying this value when used as a storage key
    pub fn key_bytes(&self) -> Vec<u8> {
        match self {
            Value::Bytes(bytes) => bytes.to_vec(),
            Value::Str(s) => s.as_bytes().to_vec(),
            other => other.to_string().into_bytes(),
        }
    }

    /// Size of [`Value::key_bytes`], computed without building the key
    pub fn key_len(&self) -> usize {
        match self {
            Value::Bytes(_) | Value::Str(_) => self.payload_len(),
            other => other.rendered_len(),
        }
    }

    /// Binary encoding used for storage values and state payloads
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Size of [`Value::encode`], computed without encoding
    pub fn encoded_len(&self) -> Result<usize> {
        let size = bincode::serialized_size(self)?;
        usize::try_from(size).map_err(|_| GammaVmError::fault("Value too large to encode"))
    }

    /// Inverse of [`Value::encode`]
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes)
            .map_err(|e| GammaVmError::fault(format!("Corrupt stored value: {}", e)))
    }

    /// Convert from JSON: integers map to `Int`, arrays of small integers to
    /// `Bytes`, everything else that has no counterpart is rejected
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        match json {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Value::Int)
                .ok_or_else(|| GammaVmError::fault(format!("Unsupported number {}", n))),
            serde_json::Value::String(s) => Ok(Value::from(s.as_str())),
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_u64()
                        .and_then(|b| u8::try_from(b).ok())
                        .ok_or_else(|| GammaVmError::fault("Arrays must contain bytes (0-255)"))
                })
                .collect::<Result<Vec<u8>>>()
                .map(Value::from),
            serde_json::Value::Object(_) => Err(GammaVmError::fault("Objects are not contract values")),
        }
    }

    /// Convert to plain JSON
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::json!(*i),
            Value::Str(s) => serde_json::Value::String(s.to_string()),
            Value::Bytes(bytes) => serde_json::json!(bytes.as_ref()),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(Arc::from(bytes))
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Value::Bytes(Arc::from(bytes))
    }
}
