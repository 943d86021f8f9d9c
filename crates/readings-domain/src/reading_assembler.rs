use crate::error::DomainResult;
use crate::timeline::{resolve_timeline, ResolvedTimeline};
use crate::types::{MeasurementPoint, Reading, SensorPayload};
use tracing::debug;

/// Collect the present values of every series at each timeline slot.
///
/// Slots where no series has a value are dropped, so every returned reading has at least
/// one measurement. Series order is preserved within a reading.
pub fn assemble_readings(payload: &SensorPayload, timeline: &ResolvedTimeline) -> Vec<Reading> {
    timeline
        .timestamps()
        .iter()
        .enumerate()
        .filter_map(|(slot, timestamp)| {
            let measurements: Vec<MeasurementPoint> = payload
                .measurements
                .iter()
                .enumerate()
                .filter_map(|(index, series)| {
                    let value = timeline
                        .value_index(slot, index)
                        .and_then(|position| series.values.get(position).copied().flatten())?;
                    Some(MeasurementPoint {
                        measurement_type: series.measurement_type,
                        source: series.source,
                        value,
                        unit_of_measurement: series.unit_of_measurement.clone(),
                    })
                })
                .collect();

            if measurements.is_empty() {
                return None;
            }

            Some(Reading {
                sensor_id: payload.sensor_id.clone(),
                timestamp: *timestamp,
                measurements,
            })
        })
        .collect()
}

/// Pivot a wide-format payload into its per-timestamp readings
pub fn pivot_payload(payload: &SensorPayload) -> DomainResult<Vec<Reading>> {
    let timeline = resolve_timeline(payload)?;
    let readings = assemble_readings(payload, &timeline);

    debug!(
        sensor_id = %payload.sensor_id,
        series = payload.measurements.len(),
        slots = timeline.timestamps().len(),
        readings = readings.len(),
        "Pivoted payload"
    );

    Ok(readings)
}
