//! InfluxDB 1.x line protocol encoding and the HTTP write path

use std::fmt::Write as _;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::InfluxConfig;
use crate::error::{ParserError, Result};
use crate::metrics::ParserMetrics;
use crate::pipeline::PointSink;
use crate::types::{FieldValue, MetricPoint};

// A line break ends a point and has no escape sequence, so it becomes a space
fn flatten_line_breaks(s: &str) -> String {
    s.replace("\r\n", " ").replace(&['\n', '\r'][..], " ")
}

fn escape_measurement(s: &str) -> String {
    flatten_line_breaks(s).replace(',', "\\,").replace(' ', "\\ ")
}

fn escape_key(s: &str) -> String {
    flatten_line_breaks(s)
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

fn escape_string_field(s: &str) -> String {
    flatten_line_breaks(s).replace('\\', "\\\\").replace('"', "\\\"")
}

fn encode_field_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Bool(b) => b.to_string(),
        FieldValue::Integer(i) => format!("{}i", i),
        FieldValue::Float(f) => f.to_string(),
        FieldValue::String(s) => format!("\"{}\"", escape_string_field(s)),
    }
}

/// Encodes one point in line protocol with second precision. Null and empty
/// tags are dropped. Returns `None` for points without fields, which InfluxDB
/// rejects.
pub fn encode_line(point: &MetricPoint) -> Option<String> {
    if point.fields.is_empty() {
        return None;
    }

    let mut line = escape_measurement(point.measurement.as_str());
    for (key, value) in point.present_tags().filter(|(_, v)| !v.is_empty()) {
        let _ = write!(line, ",{}={}", escape_key(key), escape_key(value));
    }

    let fields: Vec<String> = point
        .fields
        .iter()
        .map(|(key, value)| format!("{}={}", escape_key(key), encode_field_value(value)))
        .collect();
    let _ = write!(line, " {} {}", fields.join(","), point.epoch_seconds);
    Some(line)
}

/// Buffers points and writes them to InfluxDB in batches
pub struct InfluxWriter {
    client: reqwest::blocking::Client,
    write_url: String,
    config: InfluxConfig,
    buffer: Vec<String>,
    written: usize,
}

impl InfluxWriter {
    pub fn new(config: InfluxConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        let write_url = format!("{}/write", config.host.trim_end_matches('/'));
        Ok(Self {
            client,
            write_url,
            buffer: Vec::with_capacity(config.batch_size),
            config,
            written: 0,
        })
    }

    /// Points successfully written so far
    pub fn written(&self) -> usize {
        self.written
    }

    // Credentials go in the Authorization header so they never show up in
    // the request URL, which reqwest errors print
    fn request(&self, body: String) -> reqwest::blocking::RequestBuilder {
        let mut request = self
            .client
            .post(&self.write_url)
            .query(&[("db", self.config.db.as_str()), ("precision", "s")]);
        if let Some(username) = self.config.username.as_deref() {
            request = request.basic_auth(username, self.config.password.as_deref());
        }
        request.body(body)
    }

    fn send_batch(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let body = self.buffer.join("\n");

        debug!("Writing {} points to {}", self.buffer.len(), self.write_url);
        let response = self.request(body).send()?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(ParserError::Influx { status, body });
        }

        let count = self.buffer.len();
        self.written += count;
        ParserMetrics::record_written(count);
        info!("Wrote {} points to InfluxDB database {}", count, self.config.db);
        self.buffer.clear();
        Ok(())
    }
}

impl PointSink for InfluxWriter {
    fn write(&mut self, points: &[MetricPoint]) -> Result<()> {
        for point in points {
            match encode_line(point) {
                Some(line) => self.buffer.push(line),
                None => warn!(measurement = %point.measurement, "dropping point without fields"),
            }
            if self.buffer.len() >= self.config.batch_size.max(1) {
                self.send_batch()?;
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.send_batch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Measurement;

    fn point(measurement: Measurement, epoch_seconds: i64) -> MetricPoint {
        MetricPoint::at(measurement, epoch_seconds).unwrap()
    }

    #[test]
    fn test_encode_drops_null_tags() {
        let point = point(Measurement::CallbackApi, 1518603982)
            .tag("tag", None::<String>)
            .tag("app", Some("em-be-idola"))
            .tag("function", Some("system.api_call"))
            .field("user", "a@b.c");
        let line = encode_line(&point).unwrap();
        assert_eq!(
            line,
            "rogerthat.callback_api,app=em-be-idola,function=system.api_call user=\"a@b.c\" 1518603982"
        );
    }

    #[test]
    fn test_encode_escapes_and_types() {
        let point = point(Measurement::CreatedApps, 1520985600)
            .tag("type", Some("City app"))
            .tag("country", Some("BE"))
            .field("amount", 24i64)
            .field("note", "say \"hi\"")
            .field("ok", true);
        let line = encode_line(&point).unwrap();
        assert_eq!(
            line,
            "rogerthat.created_apps,country=BE,type=City\\ app amount=24i,note=\"say \\\"hi\\\"\",ok=true 1520985600"
        );
    }

    #[test]
    fn test_line_breaks_never_split_a_point() {
        let point = point(Measurement::CallbackApi, 1518603982)
            .tag("tag", Some("line one\nline two"))
            .tag("app", Some("a\r\nb"))
            .field("user", "a\nb");
        let line = encode_line(&point).unwrap();
        assert!(!line.contains('\n'));
        assert!(!line.contains('\r'));
        assert_eq!(
            line,
            "rogerthat.callback_api,app=a\\ b,tag=line\\ one\\ line\\ two user=\"a b\" 1518603982"
        );
    }

    #[test]
    fn test_point_without_fields_is_skipped() {
        let point = point(Measurement::AllUsers, 1520985600).tag("app", Some("rogerthat"));
        assert_eq!(encode_line(&point), None);
    }

    #[test]
    fn test_writer_builds_write_url() {
        let config = InfluxConfig {
            host: "http://influx.local:8086/".to_string(),
            ..Default::default()
        };
        let writer = InfluxWriter::new(config, Duration::from_secs(1)).unwrap();
        assert_eq!(writer.write_url, "http://influx.local:8086/write");
        assert_eq!(writer.written(), 0);
    }

    #[test]
    fn test_credentials_stay_out_of_the_url() {
        let config = InfluxConfig {
            username: Some("writer".to_string()),
            password: Some("s3cret".to_string()),
            ..Default::default()
        };
        let writer = InfluxWriter::new(config, Duration::from_secs(1)).unwrap();
        let request = writer.request(String::new()).build().unwrap();

        let url = request.url().as_str();
        assert!(!url.contains("s3cret"));
        assert!(!url.contains("writer"));
        assert!(url.ends_with("/write?db=rogerthat&precision=s"));
        let auth = request.headers().get(reqwest::header::AUTHORIZATION).unwrap();
        assert!(auth.to_str().unwrap().starts_with("Basic "));
    }
}
