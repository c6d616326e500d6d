//! Value codec: `serde_json::Value` <-> tagged [`WireValue`] understood by the query backend.
//!
//! Encoding precedence is fixed: float, then signed integer, then unsigned integer,
//! then the runtime kind (bool, string, map, array). Unsigned sources are sent with
//! the INT64 tag; the backend decodes them as signed. Scalars are 8-byte little-endian.

use crate::error::CodecError;
use crate::querykit::proto::{DataType, Field, WireValue};
use base64::Engine as _;
use serde_json::{Map, Number, Value};

/// Encode a decoded value for the backend. Null fails with [`CodecError::ValueRequired`].
///
/// Elements of maps and arrays that fail to encode are logged and dropped; the
/// enclosing map or array still encodes.
pub fn encode(value: &Value) -> Result<WireValue, CodecError> {
    match value {
        Value::Null => Err(CodecError::ValueRequired),
        Value::Number(n) => Ok(encode_number(n)),
        Value::Bool(b) => Ok(WireValue::scalar(DataType::Boolean, vec![u8::from(*b)])),
        Value::String(s) => Ok(WireValue::scalar(DataType::String, s.as_bytes().to_vec())),
        Value::Object(map) => {
            let mut fields = Vec::with_capacity(map.len());
            for (name, v) in map {
                match encode(v) {
                    Ok(encoded) => fields.push(Field {
                        name: name.clone(),
                        value: Some(encoded),
                    }),
                    Err(e) => tracing::warn!(field = %name, error = %e, "dropping map entry"),
                }
            }
            Ok(WireValue::map(fields))
        }
        Value::Array(items) => {
            let mut elements = Vec::with_capacity(items.len());
            for (index, v) in items.iter().enumerate() {
                match encode(v) {
                    Ok(encoded) => elements.push(encoded),
                    Err(e) => tracing::warn!(index, error = %e, "dropping array element"),
                }
            }
            Ok(WireValue::array(elements))
        }
    }
}

fn encode_number(n: &Number) -> WireValue {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            return WireValue::scalar(DataType::Float64, f.to_le_bytes().to_vec());
        }
    }
    if let Some(i) = n.as_i64() {
        return WireValue::scalar(DataType::Int64, i.to_le_bytes().to_vec());
    }
    if let Some(u) = n.as_u64() {
        return WireValue::scalar(DataType::Int64, u.to_le_bytes().to_vec());
    }
    WireValue::scalar(DataType::Binary, n.to_string().into_bytes())
}

/// Decode a backend value for rendering. Unknown tags and BINARY decode to a base64 string.
pub fn decode(wire: &WireValue) -> Value {
    match DataType::try_from(wire.data_type) {
        Ok(DataType::Float64) => read_u64(&wire.value)
            .map(f64::from_bits)
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Ok(DataType::Int64) => read_u64(&wire.value)
            .map(|bits| Value::from(bits as i64))
            .unwrap_or(Value::Null),
        Ok(DataType::Uint64) => read_u64(&wire.value).map(Value::from).unwrap_or(Value::Null),
        Ok(DataType::Boolean) => Value::Bool(wire.value.first().is_some_and(|b| b & 1 == 1)),
        Ok(DataType::String) => Value::String(String::from_utf8_lossy(&wire.value).into_owned()),
        Ok(DataType::Map) => {
            let mut out = Map::new();
            if let Some(map) = &wire.map {
                for field in &map.fields {
                    let value = field.value.as_ref().map(decode).unwrap_or(Value::Null);
                    out.insert(field.name.clone(), value);
                }
            }
            Value::Object(out)
        }
        Ok(DataType::Array) => Value::Array(
            wire.array
                .as_ref()
                .map(|a| a.elements.iter().map(decode).collect())
                .unwrap_or_default(),
        ),
        Ok(DataType::Binary) | Err(_) => {
            Value::String(base64::engine::general_purpose::STANDARD.encode(&wire.value))
        }
    }
}

/// Project a record's fields into a JSON object keyed by field name.
pub fn decode_fields(fields: &[Field]) -> Map<String, Value> {
    fields
        .iter()
        .map(|f| (f.name.clone(), f.value.as_ref().map(decode).unwrap_or(Value::Null)))
        .collect()
}

fn read_u64(bytes: &[u8]) -> Option<u64> {
    let head: [u8; 8] = bytes.get(..8)?.try_into().ok()?;
    Some(u64::from_le_bytes(head))
}
