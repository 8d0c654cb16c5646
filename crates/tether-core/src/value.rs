use std::collections::BTreeMap;

/// Structured argument value accepted by remote functions.
///
/// Integers and floats are kept apart so that `10` and `10.0` keep their
/// literal form across the wire. `UInt` only holds integers above `i64::MAX`.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

/// Argument mapping for one remote call.
pub type Args = BTreeMap<String, Value>;

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) | Self::UInt(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

macro_rules! int_from {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Self::Int(i64::from(v))
            }
        })*
    };
}

int_from!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        i64::try_from(v).map_or(Self::UInt(v), Self::Int)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Object(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::UInt(u)
                } else {
                    // Without arbitrary_precision every other Number is an f64.
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            serde_json::Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

/// Build an argument mapping from a JSON object.
///
/// Returns `None` when `json` is not an object.
pub fn args_from_json(json: serde_json::Value) -> Option<Args> {
    match json {
        serde_json::Value::Object(map) => Some(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn primitive_conversions() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(10_i32), Value::Int(10));
        assert_eq!(Value::from(10_u32), Value::Int(10));
        assert_eq!(Value::from(10_u64), Value::Int(10));
        assert_eq!(Value::from(u64::MAX), Value::UInt(u64::MAX));
        assert_eq!(Value::from(1.5_f64), Value::Float(1.5));
        assert_eq!(Value::from("hi"), Value::String("hi".into()));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::String("x".into()));
    }

    #[test]
    fn vec_and_pairs() {
        assert_eq!(
            Value::from(vec![1_i64, 2]),
            Value::Array(vec![Value::Int(1), Value::Int(2)])
        );
        let obj: Value = [("a", 1_i64)].into_iter().collect();
        assert_eq!(obj, Value::Object(BTreeMap::from([("a".to_string(), Value::Int(1))])));
    }

    #[test]
    fn json_numbers_keep_int_float_split() {
        assert_eq!(Value::from(json!(10)), Value::Int(10));
        assert_eq!(Value::from(json!(10.0)), Value::Float(10.0));
        assert_eq!(Value::from(json!(u64::MAX)), Value::UInt(u64::MAX));
    }

    #[test]
    fn json_nested() {
        let v = Value::from(json!({"tags": ["a", null], "n": {"ok": false}}));
        let Value::Object(map) = v else {
            panic!("expected object");
        };
        assert_eq!(
            map["tags"],
            Value::Array(vec![Value::String("a".into()), Value::Null])
        );
        assert_eq!(map["n"].type_name(), "object");
    }

    #[test]
    fn args_from_json_requires_object() {
        let args = args_from_json(json!({"limit": 10})).unwrap();
        assert_eq!(args["limit"], Value::Int(10));
        assert!(args_from_json(json!([1, 2])).is_none());
        assert!(args_from_json(json!("x")).is_none());
    }
}
