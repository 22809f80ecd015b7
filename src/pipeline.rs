use serde::Serialize;
use std::io::{BufRead, Write};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::influx::encode_line;
use crate::lookup::ServiceResolver;
use crate::metrics::ParserMetrics;
use crate::parser::Dispatcher;
use crate::types::{MetricPoint, RawRecord};

/// Destination for the points of each record
pub trait PointSink {
    fn write(&mut self, points: &[MetricPoint]) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Keeps every point in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub points: Vec<MetricPoint>,
}

impl PointSink for MemorySink {
    fn write(&mut self, points: &[MetricPoint]) -> Result<()> {
        self.points.extend_from_slice(points);
        Ok(())
    }
}

/// Writes one JSON object per point
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> PointSink for JsonLinesSink<W> {
    fn write(&mut self, points: &[MetricPoint]) -> Result<()> {
        for point in points {
            serde_json::to_writer(&mut self.out, point)?;
            self.out.write_all(b"\n")?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(self.out.flush()?)
    }
}

/// Writes points as InfluxDB line protocol without sending them anywhere
pub struct LineProtocolSink<W: Write> {
    out: W,
}

impl<W: Write> LineProtocolSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> PointSink for LineProtocolSink<W> {
    fn write(&mut self, points: &[MetricPoint]) -> Result<()> {
        for point in points {
            if let Some(line) = encode_line(point) {
                writeln!(self.out, "{}", line)?;
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(self.out.flush()?)
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct PipelineResult {
    pub total_records: usize,
    pub emitted_points: usize,
    pub empty_records: usize,
    pub errors: Vec<String>,
}

/// Feeds NDJSON log lines through the dispatcher into a sink, one record at
/// a time. A failing record is reported and contributes no points.
pub struct Pipeline<R, S> {
    dispatcher: Dispatcher<R>,
    sink: S,
    record_type: Option<String>,
}

impl<R: ServiceResolver, S: PointSink> Pipeline<R, S> {
    pub fn new(dispatcher: Dispatcher<R>, sink: S) -> Self {
        Self {
            dispatcher,
            sink,
            record_type: None,
        }
    }

    /// Treat every record as `record_type` instead of reading its `type`
    pub fn with_record_type(mut self, record_type: impl Into<String>) -> Self {
        self.record_type = Some(record_type.into());
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher<R> {
        &self.dispatcher
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn process_line(&mut self, line: &[u8]) -> Result<Vec<MetricPoint>> {
        let record: RawRecord = serde_json::from_slice(line)?;
        match &self.record_type {
            Some(record_type) => self.dispatcher.dispatch_as(record_type, &record),
            None => self.dispatcher.dispatch(&record),
        }
    }

    #[instrument(skip_all, fields(record_type = ?self.record_type))]
    pub fn run<B: BufRead>(&mut self, input: B) -> Result<PipelineResult> {
        let start = Instant::now();
        let mut result = PipelineResult::default();

        // Lines are decoded as bytes so a record with broken UTF-8 fails on
        // its own instead of ending the run
        for (index, line) in input.split(b'\n').enumerate() {
            let mut line = line?;
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            result.total_records += 1;

            match self.process_line(&line) {
                Ok(points) if points.is_empty() => {
                    result.empty_records += 1;
                }
                Ok(points) => {
                    debug!(line = index + 1, points = points.len(), "record parsed");
                    result.emitted_points += points.len();
                    self.sink.write(&points)?;
                }
                Err(e) => {
                    warn!(line = index + 1, error = %e, "skipping record");
                    result.errors.push(format!("line {}: {}", index + 1, e));
                }
            }
        }

        self.sink.flush()?;
        ParserMetrics::record_run_duration(start.elapsed().as_secs_f64());
        info!(
            "Processed {} records: {} points, {} empty, {} errors",
            result.total_records,
            result.emitted_points,
            result.empty_records,
            result.errors.len()
        );
        Ok(result)
    }
}
