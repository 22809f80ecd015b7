use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::Result;
use crate::parser::time::format_epoch_seconds;

/// Raw log record as decoded from one NDJSON line. No schema is enforced.
pub type RawRecord = Value;

/// Tag set of a point. `None` tags are dropped by the writer.
pub type Tags = BTreeMap<String, Option<String>>;

/// Field set of a point.
pub type Fields = BTreeMap<String, FieldValue>;

/// The closed set of measurements this crate writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Measurement {
    #[serde(rename = "rogerthat.all_users")]
    AllUsers,
    #[serde(rename = "rogerthat.api_calls")]
    ApiCalls,
    #[serde(rename = "rogerthat.callback_api")]
    CallbackApi,
    #[serde(rename = "rogerthat.created_apps")]
    CreatedApps,
    #[serde(rename = "rogerthat.released_apps")]
    ReleasedApps,
    #[serde(rename = "rogerthat.client_call")]
    ClientCall,
    #[serde(rename = "rogerthat.messages")]
    Messages,
    #[serde(rename = "rogerthat.total_services")]
    TotalServices,
}

impl Measurement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Measurement::AllUsers => "rogerthat.all_users",
            Measurement::ApiCalls => "rogerthat.api_calls",
            Measurement::CallbackApi => "rogerthat.callback_api",
            Measurement::CreatedApps => "rogerthat.created_apps",
            Measurement::ReleasedApps => "rogerthat.released_apps",
            Measurement::ClientCall => "rogerthat.client_call",
            Measurement::Messages => "rogerthat.messages",
            Measurement::TotalServices => "rogerthat.total_services",
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A measured value. InfluxDB has no null field, so there is no null variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl FieldValue {
    /// Converts a JSON value taken from a record. `null` yields `None`;
    /// arrays and objects are carried as their JSON text.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(FieldValue::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(FieldValue::Integer(i)),
                None => n.as_f64().map(FieldValue::Float),
            },
            Value::String(s) => Some(FieldValue::String(s.clone())),
            other => Some(FieldValue::String(other.to_string())),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

/// One time-series observation produced from a log record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricPoint {
    pub measurement: Measurement,
    pub tags: Tags,
    /// ISO-8601 UTC, always ending in `Z`
    pub time: String,
    /// The epoch seconds `time` was rendered from
    #[serde(skip)]
    pub epoch_seconds: i64,
    pub fields: Fields,
}

impl MetricPoint {
    /// A point with no tags or fields yet, at `epoch_seconds` UTC
    pub fn at(measurement: Measurement, epoch_seconds: i64) -> Result<Self> {
        Ok(Self {
            measurement,
            tags: Tags::new(),
            time: format_epoch_seconds(epoch_seconds)?,
            epoch_seconds,
            fields: Fields::new(),
        })
    }

    pub fn tag(mut self, key: &str, value: Option<impl Into<String>>) -> Self {
        self.tags.insert(key.to_string(), value.map(Into::into));
        self
    }

    pub fn field(mut self, key: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Adds a field only when the source value is present and not null
    pub fn json_field(mut self, key: &str, value: Option<&Value>) -> Self {
        if let Some(v) = value.and_then(FieldValue::from_json) {
            self.fields.insert(key.to_string(), v);
        }
        self
    }

    /// Tags with a value, in key order
    pub fn present_tags(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags
            .iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (k.as_str(), v)))
    }
}
