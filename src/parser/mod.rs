//! Record classification: picks the transformer for a record's type and
//! turns the record into metric points.

pub mod tag;
pub mod time;
pub mod transformers;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::constants::RECORD_TYPE_PREFIX;
use crate::error::{ParserError, Result};
use crate::lookup::ServiceResolver;
use crate::metrics::ParserMetrics;
use crate::record::RecordExt;
use crate::types::MetricPoint;

pub use tag::parse_to_human_readable_tag;
pub use time::format_time;

/// Every record type the parser knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    CallbackApi,
    App,
    Api,
    CreatedApps,
    ReleasedApps,
    AllUsers,
    TotalServices,
    Web,
    WebChannel,
}

impl RecordType {
    pub const ALL: [RecordType; 9] = [
        RecordType::CallbackApi,
        RecordType::App,
        RecordType::Api,
        RecordType::CreatedApps,
        RecordType::ReleasedApps,
        RecordType::AllUsers,
        RecordType::TotalServices,
        RecordType::Web,
        RecordType::WebChannel,
    ];

    /// Accepts the logical name, optionally prefixed with `rogerthat.`
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.strip_prefix(RECORD_TYPE_PREFIX).unwrap_or(name);
        match name {
            "callback_api" => Some(RecordType::CallbackApi),
            "app" => Some(RecordType::App),
            "api" => Some(RecordType::Api),
            "created_apps" => Some(RecordType::CreatedApps),
            "released_apps" => Some(RecordType::ReleasedApps),
            "all_users" => Some(RecordType::AllUsers),
            "total_services" => Some(RecordType::TotalServices),
            "web" => Some(RecordType::Web),
            "channel" | "web_channel" => Some(RecordType::WebChannel),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::CallbackApi => "callback_api",
            RecordType::App => "app",
            RecordType::Api => "api",
            RecordType::CreatedApps => "created_apps",
            RecordType::ReleasedApps => "released_apps",
            RecordType::AllUsers => "all_users",
            RecordType::TotalServices => "total_services",
            RecordType::Web => "web",
            RecordType::WebChannel => "web_channel",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = ParserError;

    fn from_str(s: &str) -> Result<Self> {
        RecordType::from_name(s).ok_or_else(|| ParserError::InvalidField {
            field: "type".to_string(),
            message: format!("unknown record type '{}'", s),
        })
    }
}

/// Behavior switches for the transformers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Emit `rogerthat.messages` for results carrying only a
    /// `received_timestamp`. Off by default: existing dashboards were built
    /// without this measurement.
    pub count_received_messages: bool,
}

/// Routes records to their transformer. Owns the service resolver so its
/// cache lives as long as the dispatcher.
pub struct Dispatcher<R> {
    resolver: R,
    options: ParseOptions,
}

impl<R: ServiceResolver> Dispatcher<R> {
    pub fn new(resolver: R, options: ParseOptions) -> Self {
        Self { resolver, options }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Dispatches on the record's own `type` field
    pub fn dispatch(&mut self, record: &Value) -> Result<Vec<MetricPoint>> {
        match record.field_str("type") {
            Some(type_name) => self.dispatch_as(type_name, record),
            None => {
                debug!("record has no type; ignoring");
                Ok(Vec::new())
            }
        }
    }

    /// Dispatches on a type known from outside the record, such as the log
    /// folder it was read from. Unknown types produce nothing.
    pub fn dispatch_as(&mut self, type_name: &str, record: &Value) -> Result<Vec<MetricPoint>> {
        let Some(record_type) = RecordType::from_name(type_name) else {
            debug!(record_type = type_name, "ignoring unknown record type");
            ParserMetrics::record_processed("unknown", 0);
            return Ok(Vec::new());
        };

        match self.transform(record_type, record) {
            Ok(points) => {
                ParserMetrics::record_processed(record_type.as_str(), points.len());
                for point in &points {
                    ParserMetrics::record_point(point.measurement);
                }
                Ok(points)
            }
            Err(e) => {
                warn!(record_type = record_type.as_str(), error = %e, "record transformation failed");
                ParserMetrics::record_failed(record_type.as_str());
                Err(e)
            }
        }
    }

    pub fn transform(&mut self, record_type: RecordType, record: &Value) -> Result<Vec<MetricPoint>> {
        match record_type {
            RecordType::CallbackApi => transformers::callback_api(record),
            RecordType::App => transformers::app(record, &self.options),
            RecordType::Api => transformers::api(record, &mut self.resolver),
            RecordType::CreatedApps => transformers::created_apps(record),
            RecordType::ReleasedApps => transformers::released_apps(record),
            RecordType::AllUsers => transformers::all_users(record),
            RecordType::TotalServices => transformers::total_services(record),
            RecordType::Web => transformers::web(record),
            RecordType::WebChannel => transformers::web_channel(record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::tests::CountingResolver;
    use crate::types::Measurement;
    use serde_json::json;

    fn dispatcher() -> Dispatcher<CountingResolver> {
        Dispatcher::new(CountingResolver::default(), ParseOptions::default())
    }

    #[test]
    fn test_record_type_names() {
        for record_type in RecordType::ALL {
            assert_eq!(RecordType::from_name(record_type.as_str()), Some(record_type));
        }
        assert_eq!(RecordType::from_name("channel"), Some(RecordType::WebChannel));
        assert_eq!(
            RecordType::from_name("rogerthat.created_apps"),
            Some(RecordType::CreatedApps)
        );
        assert_eq!(RecordType::from_name("rogerthat.callback_api"), Some(RecordType::CallbackApi));
        assert_eq!(RecordType::from_name("cron"), None);
        assert!("cron".parse::<RecordType>().is_err());
        assert_eq!("api".parse::<RecordType>().unwrap(), RecordType::Api);
    }

    #[test]
    fn test_unknown_type_is_ignored() {
        let mut d = dispatcher();
        let record = json!({"type": "cron", "timestamp": 1518603982});
        assert!(d.dispatch(&record).unwrap().is_empty());
        assert!(d.dispatch_as("something_else", &json!(null)).unwrap().is_empty());
    }

    #[test]
    fn test_record_without_type_is_ignored() {
        let mut d = dispatcher();
        let record = json!({"user": "abc", "request_data": "{\"c\": [", "timestamp": 1518603982});
        assert!(d.dispatch(&record).unwrap().is_empty());
    }

    #[test]
    fn test_dispatch_uses_record_type() {
        let mut d = dispatcher();
        let record = json!({
            "type": "rogerthat.all_users",
            "request_data": {"rogerthat": 10},
            "timestamp": 1520985600
        });
        let points = d.dispatch(&record).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].measurement, Measurement::AllUsers);
    }

    #[test]
    fn test_dispatch_as_overrides_record_type() {
        let mut d = dispatcher();
        let record = json!({"function": "system.ping", "user": "abc", "timestamp": 1518583750});
        let points = d.dispatch_as("api", &record).unwrap();
        assert_eq!(points[0].measurement, Measurement::ApiCalls);
        assert_eq!(d.resolver().calls, vec!["abc"]);
    }

    #[test]
    fn test_ignored_types_emit_nothing() {
        let mut d = dispatcher();
        for type_name in ["web", "channel", "web_channel"] {
            let record = json!({"type": type_name, "request_data": "garbage"});
            assert!(d.dispatch(&record).unwrap().is_empty());
        }
    }

    #[test]
    fn test_errors_propagate() {
        let mut d = Dispatcher::new(
            CountingResolver {
                fail: true,
                ..Default::default()
            },
            ParseOptions::default(),
        );
        let record = json!({"type": "api", "user": "abc", "timestamp": 1518583750});
        assert!(matches!(
            d.dispatch(&record),
            Err(ParserError::Lookup { status: 500, .. })
        ));
    }
}
