use crate::error::{DomainError, DomainResult};
use crate::types::{parse_timestamp, SensorPayload};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// How the values of a payload are addressed in time. Selected once per payload.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineMode {
    /// Value `i` of every series occurs at `start + i * step_ms`
    Equidistant { start: DateTime<Utc>, step_ms: f64 },
    /// Every series carries its own `dates`, parallel to its values
    Explicit,
}

impl TimelineMode {
    /// Select the addressing mode for a payload, rejecting inconsistent combinations
    pub fn from_payload(payload: &SensorPayload) -> DomainResult<Self> {
        let any_dates = payload.measurements.iter().any(|m| m.dates.is_some());

        match (&payload.date, payload.time_step) {
            (Some(_), Some(_)) if any_dates => Err(DomainError::AmbiguousTimeline),
            (Some(date), Some(step_ms)) => {
                if !step_ms.is_finite() || step_ms <= 0.0 {
                    return Err(DomainError::InvalidTimeStep(step_ms));
                }
                Ok(TimelineMode::Equidistant {
                    start: parse_timestamp(date)?,
                    step_ms,
                })
            }
            (Some(_), None) | (None, Some(_)) => Err(DomainError::IncompleteTimeline),
            (None, None) => {
                if let Some(index) = payload.measurements.iter().position(|m| m.dates.is_none())
                {
                    return Err(DomainError::MissingSeriesDates { index });
                }
                Ok(TimelineMode::Explicit)
            }
        }
    }
}

/// Ordered, duplicate-free set of instants at which at least one series may have a value,
/// together with the lookup from (instant, series) to a position in that series' values.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedTimeline {
    /// Slot `k` reads index `k` of every series
    Equidistant { timestamps: Vec<DateTime<Utc>> },
    Explicit {
        timestamps: Vec<DateTime<Utc>>,
        /// Per series: instant -> index of its first occurrence in that series
        positions: Vec<BTreeMap<DateTime<Utc>, usize>>,
    },
}

impl ResolvedTimeline {
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        match self {
            ResolvedTimeline::Equidistant { timestamps } => timestamps,
            ResolvedTimeline::Explicit { timestamps, .. } => timestamps,
        }
    }

    /// Index into series `series`' values for timeline slot `slot`, if the series is
    /// addressed at that instant. Out-of-range indices are left to the caller.
    pub fn value_index(&self, slot: usize, series: usize) -> Option<usize> {
        match self {
            ResolvedTimeline::Equidistant { .. } => Some(slot),
            ResolvedTimeline::Explicit {
                timestamps,
                positions,
            } => {
                let timestamp = timestamps.get(slot)?;
                positions.get(series)?.get(timestamp).copied()
            }
        }
    }
}

/// Compute the candidate timeline for a payload
pub fn resolve_timeline(payload: &SensorPayload) -> DomainResult<ResolvedTimeline> {
    match TimelineMode::from_payload(payload)? {
        TimelineMode::Equidistant { start, step_ms } => {
            resolve_equidistant(payload, start, step_ms)
        }
        TimelineMode::Explicit => resolve_explicit(payload),
    }
}

fn resolve_equidistant(
    payload: &SensorPayload,
    start: DateTime<Utc>,
    step_ms: f64,
) -> DomainResult<ResolvedTimeline> {
    let max_length = payload
        .measurements
        .iter()
        .map(|m| m.values.len())
        .max()
        .unwrap_or(0);

    let start_ms = start.timestamp_millis() as f64;
    let timestamps = (0..max_length)
        .map(|offset| {
            let ms = (start_ms + offset as f64 * step_ms).trunc();
            if !ms.is_finite() || ms.abs() > i64::MAX as f64 {
                return Err(DomainError::TimestampOutOfRange { offset });
            }
            Utc.timestamp_millis_opt(ms as i64)
                .single()
                .ok_or(DomainError::TimestampOutOfRange { offset })
        })
        .collect::<DomainResult<Vec<_>>>()?;

    Ok(ResolvedTimeline::Equidistant { timestamps })
}

fn resolve_explicit(payload: &SensorPayload) -> DomainResult<ResolvedTimeline> {
    let mut union = BTreeSet::new();
    let mut positions = Vec::with_capacity(payload.measurements.len());

    for (index, series) in payload.measurements.iter().enumerate() {
        let dates = series
            .dates
            .as_ref()
            .ok_or(DomainError::MissingSeriesDates { index })?;

        if dates.len() != series.values.len() {
            return Err(DomainError::SeriesLengthMismatch {
                index,
                values: series.values.len(),
                dates: dates.len(),
            });
        }

        let mut lookup = BTreeMap::new();
        for (position, raw) in dates.iter().enumerate() {
            let timestamp = parse_timestamp(raw)?;
            lookup.entry(timestamp).or_insert(position);
            union.insert(timestamp);
        }
        positions.push(lookup);
    }

    Ok(ResolvedTimeline::Explicit {
        timestamps: union.into_iter().collect(),
        positions,
    })
}
