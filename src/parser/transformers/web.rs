use serde_json::Value;

use crate::error::Result;
use crate::types::MetricPoint;

/// Web requests are logged but not measured
pub fn web(_record: &Value) -> Result<Vec<MetricPoint>> {
    Ok(Vec::new())
}

/// Web channel traffic is logged but not measured
pub fn web_channel(_record: &Value) -> Result<Vec<MetricPoint>> {
    Ok(Vec::new())
}
