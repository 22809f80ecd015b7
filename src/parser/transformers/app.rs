use serde_json::Value;
use tracing::debug;

use crate::constants::{PLATFORM_APP_ID, RECEIVED_TIMESTAMP_KEY, UNKNOWN};
use crate::error::Result;
use crate::parser::time::{coerce_epoch_seconds, RecordTime};
use crate::parser::ParseOptions;
use crate::record::{field_or_null, is_truthy, RecordExt};
use crate::types::{Measurement, MetricPoint};

/// Splits `user` into (user, app id). `hash:app` carries its own app id, a
/// bare user belongs to the platform app.
fn split_user(record: &Value) -> (&str, &str) {
    match record.field_str("user").filter(|u| !u.is_empty()) {
        Some(user) => match user.split_once(':') {
            Some((user, app_id)) => (user, app_id),
            None => (user, PLATFORM_APP_ID),
        },
        None => (UNKNOWN, UNKNOWN),
    }
}

/// A message result whose only key is `received_timestamp`
fn is_received_ack(result: &Value) -> bool {
    match result.as_object() {
        Some(map) => map.len() == 1 && map.contains_key(RECEIVED_TIMESTAMP_KEY),
        None => false,
    }
}

/// Points for app (client) traffic: received messages and client calls
pub fn app(record: &Value, options: &ParseOptions) -> Result<Vec<MetricPoint>> {
    let request_data = field_or_null(record, "request_data");

    // Lines too long for the log pipeline lose their `type` and keep the
    // request as an unparsed string
    if record.non_null("type").is_none() && request_data.is_string() {
        debug!("skipping truncated app record");
        return Ok(Vec::new());
    }

    let (user, app_id) = split_user(record);
    let mut time = RecordTime::new(record);
    let mut points = Vec::new();

    for request in request_data.field_array("r") {
        let result = field_or_null(field_or_null(request, "item"), "r");
        if !is_truthy(result) || !options.count_received_messages {
            continue;
        }
        if is_received_ack(result) {
            points.push(
                MetricPoint::at(Measurement::Messages, time.seconds()?)?
                    .tag("app", Some(app_id))
                    .field("user", user),
            );
        }
    }

    let response_calls = field_or_null(record, "response_data").field_array("c");
    let request_calls = request_data.field_array("c");
    for call in response_calls.iter().chain(request_calls) {
        let Some(t) = call.get("t") else {
            continue;
        };
        let call_time = coerce_epoch_seconds("t", t)?;
        let call_type = match call.get("f") {
            None => Some(UNKNOWN.to_string()),
            Some(f) => f.as_str().map(str::to_string),
        };
        points.push(
            MetricPoint::at(Measurement::ClientCall, call_time)?
                .tag("app", Some(app_id))
                .tag("type", call_type)
                .field("user", user),
        );
    }

    Ok(points)
}
