use serde_json::Value;

use crate::constants::{SYSTEM_API_CALL, UNKNOWN};
use crate::error::Result;
use crate::parser::tag::usable_tag;
use crate::parser::time::record_epoch_seconds;
use crate::record::{field_or_null, is_truthy, RecordExt};
use crate::types::{Measurement, MetricPoint};

/// One point per callback the platform made to a service
pub fn callback_api(record: &Value) -> Result<Vec<MetricPoint>> {
    let request_data = field_or_null(record, "request_data");
    let params = field_or_null(request_data, "params");

    let function = record
        .field_str("function")
        .filter(|f| !f.is_empty())
        .or_else(|| request_data.field_str("method"));

    // user_details is either one object or a list of them; only the first counts
    let user_details = match params.get("user_details").filter(|d| is_truthy(d)) {
        Some(Value::Array(list)) => list.first(),
        other => other,
    };
    let (app_id, user_email) = match user_details {
        Some(details) => (
            details.field_str("app_id").unwrap_or(UNKNOWN),
            details.field_str("email").unwrap_or(UNKNOWN),
        ),
        None => (UNKNOWN, UNKNOWN),
    };

    let mut point = MetricPoint::at(Measurement::CallbackApi, record_epoch_seconds(record)?)?
        .tag("tag", usable_tag(params.field_str("tag")))
        .tag("app", Some(app_id))
        .tag("function", function);
    if function == Some(SYSTEM_API_CALL) {
        point = point.tag("method", params.field_str("method"));
    }
    let point = point
        .field("user", user_email)
        .json_field("service", record.get("user"));

    Ok(vec![point])
}
