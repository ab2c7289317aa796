//! Mapping of plain JSON onto the Firestore REST `Value` representation.

use serde_json::{json, Map, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    /// Firestore does not allow an array directly inside another array.
    #[error("field '{path}' holds an array directly inside an array")]
    NestedArray { path: String },
}

/// Encodes the top-level fields of a document.
pub fn encode_fields(fields: &Map<String, Value>) -> Result<Map<String, Value>, EncodeError> {
    encode_map(fields, "")
}

fn encode_map(fields: &Map<String, Value>, prefix: &str) -> Result<Map<String, Value>, EncodeError> {
    fields
        .iter()
        .map(|(key, value)| {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            Ok((key.clone(), encode_value(value, &path, false)?))
        })
        .collect()
}

fn encode_value(value: &Value, path: &str, in_array: bool) -> Result<Value, EncodeError> {
    let encoded = match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            // int64 travels as a decimal string
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            if in_array {
                return Err(EncodeError::NestedArray {
                    path: path.to_string(),
                });
            }
            let values = items
                .iter()
                .enumerate()
                .map(|(i, item)| encode_value(item, &format!("{path}[{i}]"), true))
                .collect::<Result<Vec<_>, _>>()?;
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_map(map, path)? } }),
    };
    Ok(encoded)
}
