//! Request descriptors handed to the transport

use crate::agent::ConnectionAgent;
use crate::error::{CourierError, CourierResult};
use courier_common::HttpMethod;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Request body types
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// No body
    None,
    /// JSON body (application/json)
    Json(Value),
    /// Form data (application/x-www-form-urlencoded)
    Form(Map<String, Value>),
}

/// Everything the transport needs to perform one call
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub url: String,
    /// `None` when no timeout is enforced
    pub timeout: Option<Duration>,
    /// Pooled agent for the URL's scheme
    pub agent: Arc<ConnectionAgent>,
    /// Measure elapsed time for this call
    pub timing: bool,
    /// Query string parameters, omitted when empty
    pub query: Option<Map<String, Value>>,
    pub body: RequestBody,
}

impl RequestDescriptor {
    /// Query parameters flattened into encodable pairs
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.query.as_ref().map(encode_pairs).unwrap_or_default()
    }
}

/// Convert any serializable value into a [`Value`].
///
/// Fails with a validation error when the value has no JSON representation,
/// for instance a map keyed by non-string values.
pub fn to_serializable<T: Serialize + ?Sized>(value: &T) -> CourierResult<Value> {
    serde_json::to_value(value)
        .map_err(|_| CourierError::Validation("params must be serializable value".to_string()))
}

/// Check query or form parameters: absent or a mapping. Empty mappings are
/// dropped so the request carries no query string or form body at all.
pub(crate) fn object_params(params: Option<Value>) -> CourierResult<Option<Map<String, Value>>> {
    match params {
        None => Ok(None),
        Some(Value::Object(map)) if map.is_empty() => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(CourierError::Validation(
            "params must be an object".to_string(),
        )),
    }
}

/// Check a JSON body that the caller must supply explicitly.
pub(crate) fn required_body(body: Option<Value>) -> CourierResult<Value> {
    body.ok_or_else(|| {
        CourierError::Validation("Request body must be explicitly specified".to_string())
    })
}

/// Flatten a mapping into key/value pairs for query strings and form bodies.
///
/// Scalars are rendered as text (`null` becomes empty) and nested mappings
/// use bracket notation (`a[b]=c`). Arrays of scalars repeat the key; arrays
/// holding mappings or arrays index each element (`a[0][b]=c`) so items keep
/// their own fields.
pub fn encode_pairs(params: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in params {
        push_pairs(key.clone(), value, &mut pairs);
    }
    pairs
}

fn push_pairs(key: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => pairs.push((key, String::new())),
        Value::Bool(b) => pairs.push((key, b.to_string())),
        Value::Number(n) => pairs.push((key, n.to_string())),
        Value::String(s) => pairs.push((key, s.clone())),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                match item {
                    Value::Array(_) | Value::Object(_) => {
                        push_pairs(format!("{}[{}]", key, index), item, pairs)
                    }
                    _ => push_pairs(key.clone(), item, pairs),
                }
            }
        }
        Value::Object(map) => {
            for (child, item) in map {
                push_pairs(format!("{}[{}]", key, child), item, pairs);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn pairs(value: Value) -> Vec<(String, String)> {
        match value {
            Value::Object(map) => encode_pairs(&map),
            _ => unreachable!(),
        }
    }

    fn p(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn test_scalar_pairs() {
        assert_eq!(
            pairs(json!({"a": "1", "b": 2, "c": true, "d": null})),
            vec![p("a", "1"), p("b", "2"), p("c", "true"), p("d", "")]
        );
    }

    #[test]
    fn test_array_repeats_key() {
        assert_eq!(pairs(json!({"id": [1, 2]})), vec![p("id", "1"), p("id", "2")]);
    }

    #[test]
    fn test_nested_object_uses_brackets() {
        assert_eq!(
            pairs(json!({"filter": {"name": "x", "tags": ["a"]}})),
            vec![p("filter[name]", "x"), p("filter[tags]", "a")]
        );
    }

    #[test]
    fn test_array_of_objects_keeps_items_apart() {
        let split = pairs(json!({"items": [{"id": 1}, {"n": "x"}]}));
        let merged = pairs(json!({"items": [{"id": 1, "n": "x"}]}));

        assert_eq!(split, vec![p("items[0][id]", "1"), p("items[1][n]", "x")]);
        assert_eq!(merged, vec![p("items[0][id]", "1"), p("items[0][n]", "x")]);
        assert_ne!(split, merged);
    }

    #[test]
    fn test_nested_arrays_are_indexed() {
        assert_eq!(
            pairs(json!({"m": [[1, 2], [3]]})),
            vec![p("m[0]", "1"), p("m[0]", "2"), p("m[1]", "3")]
        );
    }

    #[test]
    fn test_object_params() {
        assert_eq!(object_params(None).unwrap(), None);
        assert_eq!(object_params(Some(json!({}))).unwrap(), None);

        let map = object_params(Some(json!({"a": "1"}))).unwrap().unwrap();
        assert_eq!(map.get("a"), Some(&json!("1")));

        for bad in [json!([]), json!(["a"]), json!("a=1"), json!(1), json!(null), json!(false)] {
            let err = object_params(Some(bad)).unwrap_err();
            assert!(matches!(err, CourierError::Validation(_)));
            assert_eq!(err.to_string(), "params must be an object");
        }
    }

    #[test]
    fn test_required_body() {
        let err = required_body(None).unwrap_err();
        assert_eq!(err.to_string(), "Request body must be explicitly specified");

        for value in [json!(null), json!(false), json!(0), json!(""), json!([]), json!({})] {
            assert_eq!(required_body(Some(value.clone())).unwrap(), value);
        }
    }

    #[test]
    fn test_to_serializable() {
        #[derive(Serialize)]
        struct Payload {
            name: &'static str,
            count: u32,
        }

        let value = to_serializable(&Payload { name: "a", count: 2 }).unwrap();
        assert_eq!(value, json!({"name": "a", "count": 2}));
    }

    #[test]
    fn test_to_serializable_rejects_non_string_keys() {
        let mut map = HashMap::new();
        map.insert(vec![1u8], "x");
        let err = to_serializable(&map).unwrap_err();
        assert_eq!(err.to_string(), "params must be serializable value");
    }
}
