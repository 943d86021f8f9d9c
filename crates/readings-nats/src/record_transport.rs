use crate::traits::{JetStreamPublisher, OutboundMessage};
use anyhow::Context;
use async_trait::async_trait;
use readings_domain::error::{DomainError, DomainResult};
use readings_domain::{PutRecordsRequest, StreamTransport};
use std::sync::Arc;
use tracing::{debug, info};

/// Map a partition key onto a single NATS subject token.
///
/// Whitespace, `.`, `*` and `>` are not allowed inside a token and become `_`.
pub fn subject_token(partition_key: &str) -> String {
    if partition_key.is_empty() {
        return "_".to_string();
    }

    partition_key
        .chars()
        .map(|c| match c {
            '.' | '*' | '>' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}

/// Stream transport backed by NATS JetStream.
///
/// Each record is published on `{stream_name}.{partition token}`; a batch succeeds only
/// when JetStream acknowledged every record in it.
pub struct NatsStreamTransport {
    jetstream: Arc<dyn JetStreamPublisher>,
}

impl NatsStreamTransport {
    pub fn new(jetstream: Arc<dyn JetStreamPublisher>) -> Self {
        info!("Created NatsStreamTransport");
        Self { jetstream }
    }
}

#[async_trait]
impl StreamTransport for NatsStreamTransport {
    async fn put_records(&self, request: PutRecordsRequest) -> DomainResult<()> {
        let count = request.records.len();
        let messages: Vec<OutboundMessage> = request
            .records
            .into_iter()
            .map(|record| OutboundMessage {
                subject: format!(
                    "{}.{}",
                    request.stream_name,
                    subject_token(&record.partition_key)
                ),
                partition_key: record.partition_key,
                payload: record.data.into(),
            })
            .collect();

        debug!(
            stream = %request.stream_name,
            records = count,
            size_bytes = messages.iter().map(|m| m.payload.len()).sum::<usize>(),
            "Publishing record batch"
        );

        self.jetstream
            .publish_batch(messages)
            .await
            .context("Failed to publish record batch")
            .map_err(DomainError::TransportError)?;

        debug!(
            stream = %request.stream_name,
            records = count,
            "Record batch acknowledged"
        );

        Ok(())
    }
}
