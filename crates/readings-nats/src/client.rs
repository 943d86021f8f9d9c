use crate::traits::{JetStreamPublisher, OutboundMessage};
use anyhow::{Context, Result};
use async_nats::jetstream::{self, stream::Config as StreamConfig};
use async_nats::HeaderMap;
use async_trait::async_trait;
use std::future::IntoFuture;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Header carrying the unmodified partition key of a record
pub const PARTITION_KEY_HEADER: &str = "Partition-Key";

pub struct NatsClient {
    jetstream: jetstream::Context,
}

impl NatsClient {
    pub async fn connect(url: &str, timeout: std::time::Duration) -> Result<Self> {
        info!(url = %url, timeout_ms = timeout.as_millis(), "Connecting to NATS");

        // Configure connection timeout for establishing the TCP connection
        let client = async_nats::ConnectOptions::new()
            .connection_timeout(timeout)
            .connect(url)
            .await
            .context("Failed to connect to NATS")?;

        let jetstream = jetstream::new(client);

        info!("Successfully connected to NATS");
        Ok(Self { jetstream })
    }

    /// Create a JetStreamPublisher trait object from this client
    pub fn create_publisher_client(&self) -> Arc<dyn JetStreamPublisher> {
        Arc::new(NatsJetStreamPublisher::new(self.jetstream.clone()))
    }

    pub async fn close(self) {
        info!("Closing NATS connection");
        // Connection closes automatically when dropped
    }
}

/// Make sure the readings stream exists, capturing every partition subject below it
pub async fn ensure_stream(publisher: &dyn JetStreamPublisher, stream_name: &str) -> Result<()> {
    info!(stream = %stream_name, "Ensuring stream exists");

    if publisher.get_stream(stream_name).await.is_ok() {
        info!(stream = %stream_name, "Stream already exists");
        return Ok(());
    }

    let stream_config = StreamConfig {
        name: stream_name.to_string(),
        subjects: vec![format!("{}.>", stream_name)],
        description: Some("Stream for pivoted sensor readings".to_string()),
        ..Default::default()
    };

    publisher
        .create_stream(stream_config)
        .await
        .context("Failed to create stream")?;
    info!(stream = %stream_name, "Created stream");

    Ok(())
}

/// Concrete implementation of JetStreamPublisher using async-nats
pub struct NatsJetStreamPublisher {
    context: jetstream::Context,
}

impl NatsJetStreamPublisher {
    pub fn new(context: jetstream::Context) -> Self {
        Self { context }
    }
}

#[async_trait]
impl JetStreamPublisher for NatsJetStreamPublisher {
    async fn get_stream(&self, stream_name: &str) -> Result<()> {
        self.context
            .get_stream(stream_name)
            .await
            .context("Failed to get stream")?;
        Ok(())
    }

    async fn create_stream(&self, config: jetstream::stream::Config) -> Result<()> {
        self.context
            .create_stream(config)
            .await
            .context("Failed to create stream")?;
        Ok(())
    }

    #[instrument(skip(self, messages), fields(messages = messages.len()))]
    async fn publish_batch(&self, messages: Vec<OutboundMessage>) -> Result<()> {
        let mut acks = Vec::with_capacity(messages.len());

        for message in messages {
            let mut headers = HeaderMap::new();
            headers.insert(PARTITION_KEY_HEADER, message.partition_key.as_str());

            let ack = self
                .context
                .publish_with_headers(message.subject, headers, message.payload)
                .await
                .context("Failed to publish message to JetStream")?;
            acks.push(ack.into_future());
        }

        let acked = futures::future::try_join_all(acks)
            .await
            .context("Failed to receive JetStream acknowledgment")?;

        debug!(acknowledged = acked.len(), "Batch acknowledged");
        Ok(())
    }
}
