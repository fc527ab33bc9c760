//! Conversion between plain JSON and the typed value format of the
//! Firestore REST API (`{"stringValue": "..."}`, `{"mapValue": {...}}`, ...).

use chrono::DateTime;
use serde_json::{json, Map, Value};

use super::{Fields, StoreError};

/// Field names ending in this suffix are sent as timestamps.
const TIMESTAMP_SUFFIX: &str = "_at";

pub fn encode_fields(fields: &Fields) -> Value {
    let mut out = Map::new();
    for (name, value) in fields {
        out.insert(name.clone(), encode_value(name, value));
    }
    Value::Object(out)
}

fn encode_value(name: &str, value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                // Firestore transports int64 as a decimal string
                json!({ "integerValue": i.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64().unwrap_or_default() })
            }
        }
        Value::String(s) => {
            if name.ends_with(TIMESTAMP_SUFFIX) && DateTime::parse_from_rfc3339(s).is_ok() {
                json!({ "timestampValue": s })
            } else {
                json!({ "stringValue": s })
            }
        }
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(|v| encode_value(name, v)).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => {
            json!({ "mapValue": { "fields": encode_fields(map) } })
        }
    }
}

pub fn decode_fields(fields: &Map<String, Value>) -> Result<Fields, StoreError> {
    let mut out = Map::new();
    for (name, value) in fields {
        out.insert(name.clone(), decode_value(value)?);
    }
    Ok(out)
}

fn decode_value(value: &Value) -> Result<Value, StoreError> {
    let obj = value
        .as_object()
        .ok_or_else(|| StoreError::InvalidResponse(format!("expected typed value, got {}", value)))?;

    let (kind, inner) = obj
        .iter()
        .next()
        .ok_or_else(|| StoreError::InvalidResponse("empty typed value".to_string()))?;

    let decoded = match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" | "stringValue" | "doubleValue" | "timestampValue" | "referenceValue" => {
            inner.clone()
        }
        "integerValue" => {
            let raw = inner.as_str().map(str::to_string).unwrap_or_else(|| inner.to_string());
            let parsed: i64 = raw
                .parse()
                .map_err(|_| StoreError::InvalidResponse(format!("bad integerValue {}", raw)))?;
            Value::from(parsed)
        }
        "arrayValue" => {
            let items = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect::<Result<Vec<_>, _>>())
                .transpose()?
                .unwrap_or_default();
            Value::Array(items)
        }
        "mapValue" => {
            let fields = inner
                .get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .transpose()?
                .unwrap_or_default();
            Value::Object(fields)
        }
        other => {
            return Err(StoreError::InvalidResponse(format!(
                "unsupported value type {}",
                other
            )))
        }
    };
    Ok(decoded)
}

/// Encode a single filter operand (no field-name context).
pub fn encode_operand(value: &Value) -> Value {
    encode_value("", value)
}
