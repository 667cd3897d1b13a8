use serde_json::{Map, Value};

/// Open-ended feature attribute bag. Keys are never guaranteed present.
pub type Properties = Map<String, Value>;

/// Reads `key` as a finite number, accepting JSON numbers and numeric strings.
pub fn number_property(properties: &Properties, key: &str) -> Option<f64> {
    let v = match properties.get(key)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

pub fn str_property<'a>(properties: &'a Properties, key: &str) -> Option<&'a str> {
    properties.get(key).and_then(Value::as_str)
}
