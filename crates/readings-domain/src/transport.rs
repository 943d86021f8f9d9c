use crate::error::DomainResult;
use async_trait::async_trait;

/// One record of a put-batch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRecord {
    /// Text encoding of the published item
    pub data: String,
    pub partition_key: String,
}

/// Batch of records destined for one stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRecordsRequest {
    pub records: Vec<StreamRecord>,
    pub stream_name: String,
}

/// Append-only partitioned stream the pivoted records are published into.
/// Infrastructure layer (e.g., readings-nats) implements this trait.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Put a batch of records, resolving once the stream accepted or rejected it
    async fn put_records(&self, request: PutRecordsRequest) -> DomainResult<()>;
}
