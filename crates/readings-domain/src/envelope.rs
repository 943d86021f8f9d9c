use crate::types::{iso_millis, Reading};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Event type tag carried by every published reading event
pub const READING_INSERTED_EVENT_TYPE: &str = "element inserted in collection readings";

/// Envelope wrapping one reading for publication on the stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedEvent {
    pub id: String,
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
    pub source: EventSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    pub id: String,
    pub element: Reading,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    pub partition_key: String,
}

/// Source of fresh, opaque identifiers
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Source of the emission time stamped on events
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Generates identifiers using xid
#[derive(Debug, Default, Clone, Copy)]
pub struct XidGenerator;

impl IdGenerator for XidGenerator {
    fn next_id(&self) -> String {
        xid::new().to_string()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wraps readings into published events.
///
/// Identity and time are injected, so construction is otherwise pure.
#[derive(Clone)]
pub struct EnvelopeBuilder {
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl EnvelopeBuilder {
    pub fn new(ids: Arc<dyn IdGenerator>, clock: Arc<dyn Clock>) -> Self {
        Self { ids, clock }
    }

    /// Builder backed by xid identifiers and the system clock
    pub fn system() -> Self {
        Self::new(Arc::new(XidGenerator), Arc::new(SystemClock))
    }

    pub fn build(&self, reading: Reading) -> PublishedEvent {
        let id = self.ids.next_id();
        let data_id = self.ids.next_id();

        PublishedEvent {
            id,
            timestamp: self.clock.now(),
            event_type: READING_INSERTED_EVENT_TYPE.to_string(),
            source: EventSource {
                partition_key: reading.sensor_id.clone(),
            },
            data: EventData {
                id: data_id,
                element: reading,
            },
        }
    }

    pub fn build_all(&self, readings: Vec<Reading>) -> Vec<PublishedEvent> {
        readings.into_iter().map(|reading| self.build(reading)).collect()
    }
}
