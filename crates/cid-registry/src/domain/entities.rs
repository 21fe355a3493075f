//! # Domain Entities
//!
//! `CidRecord` is the only entity the chaincode persists. It binds a
//! caller-supplied biometric hash to the content identifier of the vector
//! uploaded off-chain.
//!
//! ## Write-once, delete-once
//!
//! A record is created by `ConfirmCIDUpload` and removed by
//! `DeleteCIDRecord`. No operation rewrites an existing record, so `cid`
//! never changes while the record exists.
//!
//! ## Serialization
//!
//! JSON object `{"id": <hash>, "cid": <cid>}`, stored under the key `id`.
//!
//! Decoding is as forgiving as the records already on the ledger require:
//! field names match case-insensitively (an exact match wins), a missing
//! or `null` field reads as an empty string and unknown fields are ignored.
//! A field holding a non-string value, or bytes that are neither a JSON
//! object nor `null`, is a `Decode` error.

use crate::errors::RegistryError;
use serde::Serialize;
use serde_json::{Map, Value};

/// World-state keys starting with this byte are reserved for composite keys.
pub const COMPOSITE_KEY_NAMESPACE: char = '\u{0}';

/// Binding of a biometric hash to an off-chain content identifier.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct CidRecord {
    /// Biometric hash; also the world-state key.
    pub id: String,
    /// Content identifier of the uploaded vector.
    pub cid: String,
}

impl CidRecord {
    /// Create a record binding `id` to `cid`.
    pub fn new(id: impl Into<String>, cid: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cid: cid.into(),
        }
    }

    /// Serialize to the stored byte form.
    pub fn encode(&self) -> Result<Vec<u8>, RegistryError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse the stored byte form.
    pub fn decode(bytes: &[u8]) -> Result<Self, RegistryError> {
        let fields = match serde_json::from_slice::<Value>(bytes)? {
            Value::Object(fields) => fields,
            // A JSON null leaves every field at its zero value
            Value::Null => return Ok(Self::default()),
            other => {
                return Err(RegistryError::Decode(format!(
                    "expected a JSON object, got {}",
                    json_kind(&other)
                )))
            }
        };

        Ok(Self {
            id: string_field(&fields, "id")?,
            cid: string_field(&fields, "cid")?,
        })
    }
}

fn string_field(fields: &Map<String, Value>, name: &str) -> Result<String, RegistryError> {
    let value = fields.get(name).or_else(|| {
        fields
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    });

    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(RegistryError::Decode(format!(
            "field {name:?} must be a string, got {}",
            json_kind(other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Check that `hash` can become a world-state key.
///
/// Only the create path (`RegisterHash`, `ConfirmCIDUpload`) validates;
/// reads and deletes of an unusable key simply find nothing.
pub fn validate_hash(hash: &str) -> Result<(), RegistryError> {
    if hash.is_empty() {
        return Err(RegistryError::InvalidArgument(
            "hash must not be empty".to_string(),
        ));
    }
    if hash.starts_with(COMPOSITE_KEY_NAMESPACE) {
        return Err(RegistryError::InvalidArgument(
            "hash must not start with the composite key namespace".to_string(),
        ));
    }
    Ok(())
}
