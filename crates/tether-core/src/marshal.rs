//! Argument marshaling between structured [`Value`]s and the string-keyed,
//! string-valued wire mapping the native layer accepts.
//!
//! Every value is encoded as JSON text. Marshaling is all-or-nothing: the
//! first value that cannot be encoded rejects the whole mapping.

use std::collections::HashMap;

use serde_json::Number;

use crate::errors::{ClientError, Result};
use crate::value::{Args, Value};

/// Marshaled argument mapping. Key order carries no meaning.
pub type WireArgs = HashMap<String, String>;

/// Encode every argument value into its canonical JSON text.
pub fn marshal(args: &Args) -> Result<WireArgs> {
    args.iter()
        .map(|(key, value)| Ok((key.clone(), encode_value(key, value)?)))
        .collect()
}

/// Encode a single value. `key` is only used to name the offending argument.
pub fn encode_value(key: &str, value: &Value) -> Result<String> {
    let json = to_json(value).map_err(|reason| ClientError::ArgumentEncoding {
        key: key.to_owned(),
        reason,
    })?;
    serde_json::to_string(&json).map_err(|e| ClientError::ArgumentEncoding {
        key: key.to_owned(),
        reason: e.to_string(),
    })
}

/// Inverse of [`marshal`], as performed on the native side of the boundary.
pub fn unmarshal(wire: &WireArgs) -> Result<Args> {
    wire.iter()
        .map(|(key, text)| {
            let json: serde_json::Value =
                serde_json::from_str(text).map_err(|e| ClientError::ArgumentDecoding {
                    key: key.clone(),
                    reason: e.to_string(),
                })?;
            Ok((key.clone(), Value::from(json)))
        })
        .collect()
}

fn to_json(value: &Value) -> std::result::Result<serde_json::Value, String> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::Number(Number::from(*i)),
        Value::UInt(u) => serde_json::Value::Number(Number::from(*u)),
        Value::Float(f) => match Number::from_f64(*f) {
            Some(n) => serde_json::Value::Number(n),
            None => return Err(format!("non-finite number {f}")),
        },
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(to_json).collect::<std::result::Result<_, _>>()?)
        }
        Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), to_json(v)?)))
                .collect::<std::result::Result<_, String>>()?,
        ),
    })
}
