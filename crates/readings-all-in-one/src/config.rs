use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

/// What the service publishes for each reading
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PublishMode {
    /// Wrap readings in events partitioned by sensor id
    Envelope,
    /// Publish bare readings under the configured partition key
    Plain,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // NATS configuration
    /// NATS server URL
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// NATS JetStream stream name
    #[serde(default = "default_nats_stream")]
    pub nats_stream: String,

    /// Startup timeout for initialization operations in seconds
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    // Pipeline configuration
    #[serde(default = "default_publish_mode")]
    pub publish_mode: PublishMode,

    /// Partition key for plain mode
    #[serde(default = "default_partition_key")]
    pub partition_key: String,

    /// Records per put-batch call (at most 250)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Payload document to process; stdin when unset
    #[serde(default)]
    pub payload_path: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

// NATS defaults
fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_nats_stream() -> String {
    "readings".to_string()
}

fn default_startup_timeout_secs() -> u64 {
    30
}

fn default_publish_mode() -> PublishMode {
    PublishMode::Envelope
}

fn default_partition_key() -> String {
    readings_domain::DEFAULT_PARTITION_KEY.to_string()
}

fn default_batch_size() -> usize {
    readings_domain::MAX_BATCH_SIZE
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("READINGS"))
            .build()?
            .try_deserialize()
    }
}
