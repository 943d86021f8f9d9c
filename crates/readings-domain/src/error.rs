use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("Timestamp out of range at offset {offset}")]
    TimestampOutOfRange { offset: usize },

    #[error("Invalid time step: {0} (must be a positive number of milliseconds)")]
    InvalidTimeStep(f64),

    #[error("Incomplete timeline: both date and timeStep are required")]
    IncompleteTimeline,

    #[error("Ambiguous timeline: payload carries date/timeStep and per-series dates")]
    AmbiguousTimeline,

    #[error("Series {index} has no dates and the payload has no date/timeStep")]
    MissingSeriesDates { index: usize },

    #[error("Series {index} has {values} values but {dates} dates")]
    SeriesLengthMismatch {
        index: usize,
        values: usize,
        dates: usize,
    },

    #[error("Invalid batch size: {0} (must be between 1 and 250)")]
    InvalidBatchSize(usize),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    TransportError(#[from] anyhow::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;
