use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

use rt_log_parser::config::Config;
use rt_log_parser::constants::DEFAULT_CONFIG_PATH;
use rt_log_parser::influx::InfluxWriter;
use rt_log_parser::lookup::{CachedResolver, HttpServiceResolver};
use rt_log_parser::pipeline::{JsonLinesSink, LineProtocolSink, Pipeline, PipelineResult, PointSink};
use rt_log_parser::{logging, metrics, Dispatcher, RecordType};

#[derive(Parser)]
#[command(name = "rt_log_parser")]
#[command(about = "Turns Rogerthat platform logs into InfluxDB metric points")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Line,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse NDJSON log records and print the resulting points
    Parse {
        /// Input file, or '-' for stdin
        #[arg(long, default_value = "-")]
        input: String,
        /// Treat every record as this type instead of reading its `type` field
        #[arg(long = "type")]
        record_type: Option<String>,
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
        /// Write Prometheus metrics of the run to this file
        #[arg(long)]
        metrics_out: Option<PathBuf>,
    },
    /// Parse NDJSON log records and write the points to InfluxDB
    Write {
        /// Input file, or '-' for stdin
        #[arg(long, default_value = "-")]
        input: String,
        /// Treat every record as this type instead of reading its `type` field
        #[arg(long = "type")]
        record_type: Option<String>,
        /// Write Prometheus metrics of the run to this file
        #[arg(long)]
        metrics_out: Option<PathBuf>,
    },
    /// Print the effective configuration
    CheckConfig,
}

fn open_input(input: &str) -> anyhow::Result<Box<dyn BufRead>> {
    if input == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(input).with_context(|| format!("Failed to open input '{}'", input))?;
    Ok(Box::new(BufReader::new(file)))
}

fn build_dispatcher(config: &Config) -> anyhow::Result<Dispatcher<CachedResolver<HttpServiceResolver>>> {
    let http = HttpServiceResolver::new(
        config.lookup.url.clone(),
        Duration::from_secs(config.lookup.timeout_seconds),
    )?;
    let resolver = CachedResolver::new(http, config.lookup.cache_capacity);
    Ok(Dispatcher::new(resolver, config.parser.clone()))
}

fn run_pipeline<S: PointSink>(
    config: &Config,
    sink: S,
    input: &str,
    record_type: Option<String>,
) -> anyhow::Result<PipelineResult> {
    if let Some(name) = record_type.as_deref() {
        // Validate early so a typo does not silently drop every record
        name.parse::<RecordType>()?;
    }
    let mut pipeline = Pipeline::new(build_dispatcher(config)?, sink);
    if let Some(name) = record_type {
        pipeline = pipeline.with_record_type(name);
    }
    Ok(pipeline.run(open_input(input)?)?)
}

fn report(result: &PipelineResult) {
    info!(
        records = result.total_records,
        points = result.emitted_points,
        empty = result.empty_records,
        errors = result.errors.len(),
        "Run finished"
    );
    if !result.errors.is_empty() {
        warn!("{} records failed", result.errors.len());
        for e in result.errors.iter().take(20) {
            warn!("  {}", e);
        }
    }
}

fn finish_metrics(metrics_out: Option<&Path>) {
    if let Some(path) = metrics_out {
        if let Err(e) = metrics::write_to_file(path) {
            error!("Failed to write metrics to {}: {}", path.display(), e);
        }
    }
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load config '{}'", cli.config.display()))?;
    let _guard = logging::init_logging(&config.log_dir);

    match cli.command {
        Commands::Parse {
            input,
            record_type,
            format,
            metrics_out,
        } => {
            if metrics_out.is_some() {
                metrics::init_metrics();
            }
            let stdout = io::stdout().lock();
            let result = match format {
                OutputFormat::Json => {
                    run_pipeline(&config, JsonLinesSink::new(stdout), &input, record_type)?
                }
                OutputFormat::Line => {
                    run_pipeline(&config, LineProtocolSink::new(stdout), &input, record_type)?
                }
            };
            report(&result);
            finish_metrics(metrics_out.as_deref());
        }
        Commands::Write {
            input,
            record_type,
            metrics_out,
        } => {
            if metrics_out.is_some() {
                metrics::init_metrics();
            }
            if let Some(bucket) = config.cloudstorage_bucket.as_deref() {
                info!("Source bucket: {}", bucket);
            }
            let writer = InfluxWriter::new(
                config.influxdb.clone(),
                Duration::from_secs(config.influxdb.timeout_seconds),
            )?;
            let result = run_pipeline(&config, writer, &input, record_type)?;
            report(&result);
            finish_metrics(metrics_out.as_deref());
        }
        Commands::CheckConfig => {
            println!("{}", toml::to_string_pretty(&config.redacted())?);
        }
    }
    Ok(())
}
