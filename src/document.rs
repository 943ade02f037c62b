//! Document layer
//!
//! JSON objects stored one per block. Updates merge shallowly: top-level
//! keys from the fragment overwrite the stored ones, nested values are
//! replaced wholesale.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Result, VaultError};

/// A JSON object
pub type Document = Map<String, Value>;

/// Serialize a document to its stored bytes
pub fn serialize(doc: &Document) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(doc)?)
}

/// Parse stored bytes back into a document
///
/// Anything other than a JSON object is a serialization error.
pub fn deserialize(bytes: &[u8]) -> Result<Document> {
    match serde_json::from_slice::<Value>(bytes)? {
        Value::Object(map) => Ok(map),
        other => Err(VaultError::Serialization(format!(
            "expected a JSON object, found {}",
            kind(&other)
        ))),
    }
}

/// Merge `fragment` into `base`, fragment keys winning
pub fn merge(base: &mut Document, fragment: &Document) {
    for (key, value) in fragment {
        base.insert(key.clone(), value.clone());
    }
}

/// Merge `fragment` into the document stored as `existing`
pub fn merge_bytes(existing: &[u8], fragment: &Document) -> Result<Vec<u8>> {
    let mut doc = deserialize(existing)?;
    merge(&mut doc, fragment);
    serialize(&doc)
}

/// Serialize any serde type to stored bytes
pub fn to_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Deserialize stored bytes into any serde type
pub fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
