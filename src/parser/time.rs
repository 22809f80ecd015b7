use chrono::DateTime;
use serde_json::Value;

use crate::error::{ParserError, Result};

const ISO_UTC_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Formats the record's `timestamp` (epoch seconds) as ISO-8601 UTC with a
/// trailing `Z`. Fractional seconds are dropped.
pub fn format_time(record: &Value) -> Result<String> {
    format_epoch_seconds(record_epoch_seconds(record)?)
}

/// The record's `timestamp` as whole epoch seconds, floored
pub fn record_epoch_seconds(record: &Value) -> Result<i64> {
    let value = record
        .get("timestamp")
        .filter(|v| !v.is_null())
        .ok_or_else(|| ParserError::MissingField("timestamp".to_string()))?;
    let seconds = match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i,
            None => n
                .as_f64()
                .map(|f| f.floor() as i64)
                .ok_or_else(|| invalid("timestamp", value))?,
        },
        _ => return Err(invalid("timestamp", value)),
    };
    Ok(seconds)
}

/// Integer-coerces a sub-record timestamp such as a client call's `t`.
/// Accepts integers, floats (truncated) and integer strings.
pub fn coerce_epoch_seconds(field: &str, value: &Value) -> Result<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .ok_or_else(|| invalid(field, value)),
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid(field, value)),
        _ => Err(invalid(field, value)),
    }
}

/// Reads a record's timestamp on first use and reuses it afterwards.
/// Records that emit no points never need a timestamp.
pub struct RecordTime<'a> {
    record: &'a Value,
    seconds: Option<i64>,
}

impl<'a> RecordTime<'a> {
    pub fn new(record: &'a Value) -> Self {
        Self {
            record,
            seconds: None,
        }
    }

    pub fn seconds(&mut self) -> Result<i64> {
        if let Some(seconds) = self.seconds {
            return Ok(seconds);
        }
        let seconds = record_epoch_seconds(self.record)?;
        self.seconds = Some(seconds);
        Ok(seconds)
    }
}

pub fn format_epoch_seconds(seconds: i64) -> Result<String> {
    let dt = DateTime::from_timestamp(seconds, 0).ok_or_else(|| ParserError::InvalidField {
        field: "timestamp".to_string(),
        message: format!("{} is out of range", seconds),
    })?;
    Ok(dt.format(ISO_UTC_FORMAT).to_string())
}

fn invalid(field: &str, value: &Value) -> ParserError {
    ParserError::InvalidField {
        field: field.to_string(),
        message: format!("expected epoch seconds, got {}", value),
    }
}
