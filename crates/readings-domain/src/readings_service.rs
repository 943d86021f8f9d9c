use crate::batch_publisher::{BatchPublisher, PartitionKeyRule};
use crate::envelope::EnvelopeBuilder;
use crate::error::DomainResult;
use crate::reading_assembler::pivot_payload;
use crate::transport::StreamTransport;
use crate::types::SensorPayload;
use std::sync::Arc;
use tracing::{debug, info};

/// Partition key used when readings are published without envelopes
pub const DEFAULT_PARTITION_KEY: &str = "aggregated-readings-api";

/// What gets published for each reading. Chosen once per deployment.
#[derive(Clone)]
pub enum PipelineVariant {
    /// Readings go to the stream as-is, all under one partition key
    Plain { partition_key: String },
    /// Each reading is wrapped in an event partitioned by its sensor id
    Envelope(EnvelopeBuilder),
}

impl PipelineVariant {
    fn partition_rule(&self) -> PartitionKeyRule {
        match self {
            PipelineVariant::Plain { partition_key } => {
                PartitionKeyRule::Fixed(partition_key.clone())
            }
            PipelineVariant::Envelope(_) => PartitionKeyRule::SensorId,
        }
    }
}

/// Domain service that orchestrates wide payload → narrow stream records
///
/// Flow:
/// 1. Resolve the payload timeline and assemble per-timestamp readings
/// 2. Optionally wrap each reading in an event envelope
/// 3. Publish in sequential batches via the stream transport
pub struct ReadingsService {
    publisher: BatchPublisher,
    variant: PipelineVariant,
}

impl ReadingsService {
    pub fn new(
        transport: Arc<dyn StreamTransport>,
        stream_name: String,
        variant: PipelineVariant,
    ) -> Self {
        let publisher = BatchPublisher::new(transport, stream_name, variant.partition_rule());
        Self { publisher, variant }
    }

    /// Same as [`ReadingsService::new`] with batches smaller than the maximum
    pub fn with_batch_size(
        transport: Arc<dyn StreamTransport>,
        stream_name: String,
        variant: PipelineVariant,
        batch_size: usize,
    ) -> DomainResult<Self> {
        let publisher = BatchPublisher::new(transport, stream_name, variant.partition_rule())
            .with_batch_size(batch_size)?;
        Ok(Self { publisher, variant })
    }

    /// Pivot a payload and publish the result. Nothing is published when the payload
    /// is malformed.
    pub async fn process_payload(&self, payload: SensorPayload) -> DomainResult<()> {
        debug!(
            sensor_id = %payload.sensor_id,
            series = payload.measurements.len(),
            "Processing sensor payload"
        );

        let readings = pivot_payload(&payload)?;

        if readings.is_empty() {
            info!(sensor_id = %payload.sensor_id, "Payload produced no readings");
            return Ok(());
        }

        let count = readings.len();
        match &self.variant {
            PipelineVariant::Plain { .. } => self.publisher.publish(&readings).await?,
            PipelineVariant::Envelope(builder) => {
                let events = builder.build_all(readings);
                self.publisher.publish(&events).await?
            }
        }

        info!(
            sensor_id = %payload.sensor_id,
            readings = count,
            "Successfully published readings"
        );

        Ok(())
    }
}
