//! Optional-chaining access into raw log records.
//!
//! Records come from an upstream system we do not control, so every accessor
//! tolerates a missing key or a value of the wrong JSON type by returning
//! `None` or an empty collection.

use serde_json::{Map, Value};

static NULL: Value = Value::Null;

pub trait RecordExt {
    /// String value under `key`
    fn field_str(&self, key: &str) -> Option<&str>;

    /// Mapping under `key`
    fn field_object(&self, key: &str) -> Option<&Map<String, Value>>;

    /// Sequence under `key`, empty when absent
    fn field_array(&self, key: &str) -> &[Value];

    /// Entries of the mapping under `key`, empty when absent
    fn entries(&self, key: &str) -> Box<dyn Iterator<Item = (&String, &Value)> + '_>;

    /// Value under `key` unless it is JSON `null`
    fn non_null(&self, key: &str) -> Option<&Value>;
}

impl RecordExt for Value {
    fn field_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    fn field_object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.get(key).and_then(Value::as_object)
    }

    fn field_array(&self, key: &str) -> &[Value] {
        self.get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn entries(&self, key: &str) -> Box<dyn Iterator<Item = (&String, &Value)> + '_> {
        match self.field_object(key) {
            Some(map) => Box::new(map.iter()),
            None => Box::new(std::iter::empty()),
        }
    }

    fn non_null(&self, key: &str) -> Option<&Value> {
        self.get(key).filter(|v| !v.is_null())
    }
}

/// Value under `key`, or `null` so further accessors chain safely
pub fn field_or_null<'a>(record: &'a Value, key: &str) -> &'a Value {
    record.get(key).unwrap_or(&NULL)
}

/// Python-style truthiness, used where the upstream emitter relies on it
/// (`""`, `0`, `[]`, `{}` and `null` all count as absent).
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
