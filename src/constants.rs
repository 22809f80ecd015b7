/// Placeholder used wherever a record does not carry a user, app or call type
pub const UNKNOWN: &str = "unknown";

/// App id assigned to users that carry no `:app_id` suffix
pub const PLATFORM_APP_ID: &str = "rogerthat";

/// Prefix used by stats records in their `type` field, e.g. `rogerthat.created_apps`
pub const RECORD_TYPE_PREFIX: &str = "rogerthat.";

/// Callback function whose invocations also carry the called API method
pub const SYSTEM_API_CALL: &str = "system.api_call";

/// Tag key holding the human readable label inside JSON-encoded tags
pub const HUMAN_READABLE_TAG_KEY: &str = "__rt__.tag";

/// Only key of a message result that marks a received message
pub const RECEIVED_TIMESTAMP_KEY: &str = "received_timestamp";

// Service lookup defaults
pub const DEFAULT_LOOKUP_URL: &str = "https://rogerth.at/unauthenticated/service-app";
pub const DEFAULT_LOOKUP_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

// InfluxDB defaults
pub const DEFAULT_INFLUX_HOST: &str = "http://localhost:8086";
pub const DEFAULT_INFLUX_DB: &str = "rogerthat";
pub const DEFAULT_BATCH_SIZE: usize = 5000;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const DEFAULT_LOG_DIR: &str = "logs";
