pub mod batch_publisher;
pub mod envelope;
pub mod error;
pub mod reading_assembler;
pub mod readings_service;
pub mod timeline;
pub mod transport;
pub mod types;

pub use batch_publisher::{BatchPublisher, PartitionKeyRule, SensorScoped, MAX_BATCH_SIZE};
pub use envelope::*;
pub use error::{DomainError, DomainResult};
pub use reading_assembler::{assemble_readings, pivot_payload};
pub use readings_service::{PipelineVariant, ReadingsService, DEFAULT_PARTITION_KEY};
pub use timeline::{resolve_timeline, ResolvedTimeline, TimelineMode};
pub use transport::{PutRecordsRequest, StreamRecord, StreamTransport};
pub use types::*;
