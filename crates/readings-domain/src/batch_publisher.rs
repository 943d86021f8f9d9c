use crate::envelope::PublishedEvent;
use crate::error::{DomainError, DomainResult};
use crate::transport::{PutRecordsRequest, StreamRecord, StreamTransport};
use crate::types::Reading;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Largest number of records sent in one put-batch call
pub const MAX_BATCH_SIZE: usize = 250;

/// Items that can be routed by the sensor they describe
pub trait SensorScoped {
    fn sensor_id(&self) -> &str;
}

impl SensorScoped for Reading {
    fn sensor_id(&self) -> &str {
        &self.sensor_id
    }
}

impl SensorScoped for PublishedEvent {
    fn sensor_id(&self) -> &str {
        &self.data.element.sensor_id
    }
}

/// How each record's partition key is derived
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionKeyRule {
    /// Same key for every record of the deployment
    Fixed(String),
    /// Key is the sensor id of the item
    SensorId,
}

impl PartitionKeyRule {
    pub fn resolve<T: SensorScoped>(&self, item: &T) -> String {
        match self {
            PartitionKeyRule::Fixed(key) => key.clone(),
            PartitionKeyRule::SensorId => item.sensor_id().to_string(),
        }
    }
}

/// Publishes items in consecutive batches with at most one batch in flight.
///
/// Batch `i + 1` is only submitted after the put call for batch `i` resolved. The first
/// failing call aborts the publish; batches already accepted stay published.
pub struct BatchPublisher {
    transport: Arc<dyn StreamTransport>,
    stream_name: String,
    partition_key: PartitionKeyRule,
    batch_size: usize,
}

impl BatchPublisher {
    pub fn new(
        transport: Arc<dyn StreamTransport>,
        stream_name: String,
        partition_key: PartitionKeyRule,
    ) -> Self {
        Self {
            transport,
            stream_name,
            partition_key,
            batch_size: MAX_BATCH_SIZE,
        }
    }

    /// Use smaller batches than [`MAX_BATCH_SIZE`]
    pub fn with_batch_size(mut self, batch_size: usize) -> DomainResult<Self> {
        if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
            return Err(DomainError::InvalidBatchSize(batch_size));
        }
        self.batch_size = batch_size;
        Ok(self)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub async fn publish<T>(&self, items: &[T]) -> DomainResult<()>
    where
        T: Serialize + SensorScoped + Sync,
    {
        let mut batches = 0usize;

        for (index, chunk) in items.chunks(self.batch_size).enumerate() {
            let records = chunk
                .iter()
                .map(|item| {
                    Ok(StreamRecord {
                        data: serde_json::to_string(item)?,
                        partition_key: self.partition_key.resolve(item),
                    })
                })
                .collect::<DomainResult<Vec<_>>>()?;

            debug!(
                stream = %self.stream_name,
                batch = index,
                records = records.len(),
                "Putting stream records"
            );

            self.transport
                .put_records(PutRecordsRequest {
                    records,
                    stream_name: self.stream_name.clone(),
                })
                .await?;

            batches += 1;
        }

        info!(
            stream = %self.stream_name,
            records = items.len(),
            batches,
            "Published records"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{EventData, EventSource, READING_INSERTED_EVENT_TYPE};
    use crate::transport::MockStreamTransport;
    use crate::types::{MeasurementPoint, MeasurementSource, MeasurementType};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use mockall::Sequence;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    fn reading(sensor_id: &str, index: usize) -> Reading {
        Reading {
            sensor_id: sensor_id.to_string(),
            timestamp: Utc.timestamp_millis_opt(index as i64 * 1000).unwrap(),
            measurements: vec![MeasurementPoint {
                measurement_type: MeasurementType::ActiveEnergy,
                source: MeasurementSource::Forecast,
                value: index as f64,
                unit_of_measurement: "kWh".to_string(),
            }],
        }
    }

    fn readings(count: usize) -> Vec<Reading> {
        (0..count).map(|i| reading("sensor-1", i)).collect()
    }

    fn publisher(transport: MockStreamTransport, rule: PartitionKeyRule) -> BatchPublisher {
        BatchPublisher::new(Arc::new(transport), "readings".to_string(), rule)
    }

    #[tokio::test]
    async fn test_publish_splits_into_full_batches() {
        let mut transport = MockStreamTransport::new();
        transport
            .expect_put_records()
            .withf(|request: &PutRecordsRequest| {
                request.records.len() == 250 && request.stream_name == "readings"
            })
            .times(6)
            .returning(|_| Ok(()));

        let publisher = publisher(transport, PartitionKeyRule::SensorId);

        let result = publisher.publish(&readings(1500)).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_publish_last_batch_carries_remainder() {
        let sizes = Arc::new(Mutex::new(Vec::new()));
        let recorded = sizes.clone();

        let mut transport = MockStreamTransport::new();
        transport
            .expect_put_records()
            .times(3)
            .returning(move |request| {
                recorded.lock().unwrap().push(request.records.len());
                Ok(())
            });

        let publisher = publisher(transport, PartitionKeyRule::SensorId);

        publisher.publish(&readings(501)).await.unwrap();

        assert_eq!(*sizes.lock().unwrap(), vec![250, 250, 1]);
    }

    #[tokio::test]
    async fn test_publish_preserves_item_order_across_batches() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = seen.clone();

        let mut transport = MockStreamTransport::new();
        transport.expect_put_records().returning(move |request| {
            let mut seen = recorded.lock().unwrap();
            for record in request.records {
                let reading: Reading = serde_json::from_str(&record.data).unwrap();
                seen.push(reading.measurements[0].value as usize);
            }
            Ok(())
        });

        let publisher = publisher(transport, PartitionKeyRule::SensorId)
            .with_batch_size(7)
            .unwrap();

        publisher.publish(&readings(30)).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), (0..30).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_publish_empty_input_makes_no_calls() {
        let mut transport = MockStreamTransport::new();
        transport.expect_put_records().times(0);

        let publisher = publisher(transport, PartitionKeyRule::SensorId);

        let result = publisher.publish::<Reading>(&[]).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_publish_failure_aborts_remaining_batches() {
        let mut seq = Sequence::new();
        let mut transport = MockStreamTransport::new();
        transport
            .expect_put_records()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        transport
            .expect_put_records()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Err(DomainError::TransportError(anyhow::anyhow!(
                    "stream write throughput exceeded"
                )))
            });

        let publisher = publisher(transport, PartitionKeyRule::SensorId);

        let result = publisher.publish(&readings(1000)).await;

        assert!(matches!(result, Err(DomainError::TransportError(_))));
    }

    #[tokio::test]
    async fn test_fixed_partition_key() {
        let mut transport = MockStreamTransport::new();
        transport
            .expect_put_records()
            .withf(|request: &PutRecordsRequest| {
                request
                    .records
                    .iter()
                    .all(|r| r.partition_key == "aggregated-readings-api")
            })
            .times(1)
            .returning(|_| Ok(()));

        let publisher = publisher(
            transport,
            PartitionKeyRule::Fixed("aggregated-readings-api".to_string()),
        );

        let items = vec![reading("sensor-1", 0), reading("sensor-2", 1)];
        publisher.publish(&items).await.unwrap();
    }

    #[tokio::test]
    async fn test_sensor_partition_key_matches_nested_reading() {
        let mut transport = MockStreamTransport::new();
        transport
            .expect_put_records()
            .withf(|request: &PutRecordsRequest| {
                request.records.iter().all(|record| {
                    let event: PublishedEvent = serde_json::from_str(&record.data).unwrap();
                    event.data.element.sensor_id == record.partition_key
                })
            })
            .times(1)
            .returning(|_| Ok(()));

        let publisher = publisher(transport, PartitionKeyRule::SensorId);

        let events: Vec<PublishedEvent> = ["north", "south", "east"]
            .iter()
            .enumerate()
            .map(|(i, sensor)| PublishedEvent {
                id: format!("event-{i}"),
                timestamp: Utc::now(),
                event_type: READING_INSERTED_EVENT_TYPE.to_string(),
                data: EventData {
                    id: format!("data-{i}"),
                    element: reading(sensor, i),
                },
                source: EventSource {
                    partition_key: sensor.to_string(),
                },
            })
            .collect();

        publisher.publish(&events).await.unwrap();
    }

    #[test]
    fn test_batch_size_bounds() {
        let make = || publisher(MockStreamTransport::new(), PartitionKeyRule::SensorId);

        assert!(matches!(
            make().with_batch_size(0),
            Err(DomainError::InvalidBatchSize(0))
        ));
        assert!(matches!(
            make().with_batch_size(251),
            Err(DomainError::InvalidBatchSize(251))
        ));
        assert_eq!(make().with_batch_size(100).unwrap().batch_size(), 100);
        assert_eq!(make().batch_size(), MAX_BATCH_SIZE);
    }

    /// Transport that takes a fixed time per call and records overlap
    struct SlowTransport {
        delay: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        started: Mutex<Vec<Instant>>,
    }

    impl SlowTransport {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                started: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl StreamTransport for SlowTransport {
        async fn put_records(&self, _request: PutRecordsRequest) -> DomainResult<()> {
            self.started.lock().unwrap().push(Instant::now());
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);

            tokio::time::sleep(self.delay).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_batches_are_sequential() {
        let transport = Arc::new(SlowTransport::new(Duration::from_millis(100)));
        let publisher = BatchPublisher::new(
            transport.clone(),
            "readings".to_string(),
            PartitionKeyRule::SensorId,
        );

        publisher.publish(&readings(1500)).await.unwrap();

        let started = transport.started.lock().unwrap();
        assert_eq!(started.len(), 6);
        assert_eq!(transport.max_in_flight.load(Ordering::SeqCst), 1);
        for pair in started.windows(2) {
            let delta = pair[1] - pair[0];
            assert!(delta >= Duration::from_millis(100));
            assert!(delta <= Duration::from_millis(120));
        }
    }
}
