pub mod config;
pub mod constants;
pub mod error;
pub mod influx;
pub mod logging;
pub mod lookup;
pub mod metrics;
pub mod parser;
pub mod pipeline;
pub mod record;
pub mod types;

pub use error::{ParserError, Result};
pub use lookup::{CachedResolver, HttpServiceResolver, ServiceResolver};
pub use parser::{Dispatcher, ParseOptions, RecordType};
pub use types::{FieldValue, Measurement, MetricPoint};
