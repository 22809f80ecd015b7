use thiserror::Error;

/// Everything that can fail a record, a lookup or a run
#[derive(Error, Debug)]
pub enum ParserError {
    #[error("HTTP call failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config file is not valid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("bad configuration: {0}")]
    Config(String),

    #[error("record has no '{0}'")]
    MissingField(String),

    #[error("bad '{field}' value: {message}")]
    InvalidField { field: String, message: String },

    #[error("service-app lookup for {service_hash} returned status {status}")]
    Lookup { service_hash: String, status: u16 },

    #[error("InfluxDB rejected the batch with status {status}: {body}")]
    Influx { status: u16, body: String },
}

pub type Result<T> = std::result::Result<T, ParserError>;
