use anyhow::Result;
use async_nats::jetstream;
use async_trait::async_trait;
use bytes::Bytes;

/// Message ready to be published on a JetStream subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub subject: String,
    /// Carried verbatim in the `Partition-Key` header
    pub partition_key: String,
    pub payload: Bytes,
}

/// Trait for JetStream publisher operations
/// Abstracts the operations needed to create streams and publish batches
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait JetStreamPublisher: Send + Sync {
    /// Get an existing stream by name
    async fn get_stream(&self, stream_name: &str) -> Result<()>;

    /// Create a new stream with the given configuration
    async fn create_stream(&self, config: jetstream::stream::Config) -> Result<()>;

    /// Publish every message, then await all acknowledgments.
    /// Fails if any message is not acknowledged.
    async fn publish_batch(&self, messages: Vec<OutboundMessage>) -> Result<()>;
}
