mod client;
mod record_transport;
mod traits;

pub use client::{ensure_stream, NatsClient, NatsJetStreamPublisher, PARTITION_KEY_HEADER};
pub use record_transport::{subject_token, NatsStreamTransport};
pub use traits::{JetStreamPublisher, OutboundMessage};

#[cfg(any(test, feature = "testing"))]
pub use traits::MockJetStreamPublisher;
