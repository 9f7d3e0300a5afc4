//! Snapshot screening: malformed records are isolated, never fatal
//!
//! One bad record must not lose the batch. Screening turns wire records into
//! domain types, rejecting records that cannot participate in reconciliation
//! and reporting each rejection as a data-quality defect for logging.

use crate::backend::{DeviceRecord, SensorRecord};
use crate::core::{Anchor, Device, Measurement};
use nalgebra::Point2;
use std::collections::HashSet;
use thiserror::Error;

/// Why a record (or part of one) was screened out of a snapshot
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordDefect {
    #[error("device record without id")]
    MissingDeviceId,
    #[error("device {device_id}: duplicate id in snapshot")]
    DuplicateDeviceId { device_id: String },
    #[error("device {device_id}: estimated position is not finite")]
    NonFiniteEstimate { device_id: String },
    #[error("device {device_id}: ground-truth position is not finite")]
    NonFiniteGroundTruth { device_id: String },
    #[error("device {device_id}: dropped measurement ({reason})")]
    DroppedMeasurement { device_id: String, reason: String },
    #[error("sensor record without id")]
    MissingSensorId,
    #[error("sensor {sensor_id}: position missing or not finite")]
    BadSensorPosition { sensor_id: String },
}

/// Outcome of screening a devices snapshot
#[derive(Debug, Default)]
pub struct DeviceScreenResult {
    pub accepted: Vec<Device>,
    /// Records excluded from the authoritative list, with the reason
    pub rejected: Vec<RecordDefect>,
    /// Per-measurement drops on otherwise accepted devices
    pub warnings: Vec<RecordDefect>,
}

/// Outcome of screening a sensors snapshot
#[derive(Debug, Default)]
pub struct SensorScreenResult {
    pub accepted: Vec<Anchor>,
    pub rejected: Vec<RecordDefect>,
}

fn screen_position(
    position: Option<crate::backend::PositionDto>,
) -> Result<Option<Point2<f64>>, ()> {
    match position {
        None => Ok(None),
        Some(dto) if dto.is_finite() => Ok(Some(dto.to_point())),
        Some(_) => Err(()),
    }
}

/// Screens a devices snapshot into domain devices.
///
/// A device is rejected when its id is missing or duplicated, or when a
/// position field is present but not finite. An absent position is fine;
/// the device simply contributes no coordinates this cycle. Measurements
/// with no sensor id or a non-finite RSSI are dropped individually.
pub fn screen_devices(records: Vec<DeviceRecord>) -> DeviceScreenResult {
    let mut result = DeviceScreenResult::default();
    let mut seen_ids: HashSet<String> = HashSet::new();

    for record in records {
        if record.id.is_empty() {
            result.rejected.push(RecordDefect::MissingDeviceId);
            continue;
        }
        if !seen_ids.insert(record.id.clone()) {
            result.rejected.push(RecordDefect::DuplicateDeviceId {
                device_id: record.id,
            });
            continue;
        }

        let estimated = match screen_position(record.position) {
            Ok(p) => p,
            Err(()) => {
                result.rejected.push(RecordDefect::NonFiniteEstimate {
                    device_id: record.id,
                });
                continue;
            }
        };
        let ground_truth = match screen_position(record.real_position) {
            Ok(p) => p,
            Err(()) => {
                result.rejected.push(RecordDefect::NonFiniteGroundTruth {
                    device_id: record.id,
                });
                continue;
            }
        };

        let mut measurements = Vec::with_capacity(record.measurements.len());
        for m in record.measurements {
            if m.sensor_id.is_empty() {
                result.warnings.push(RecordDefect::DroppedMeasurement {
                    device_id: record.id.clone(),
                    reason: "no sensor id".to_string(),
                });
                continue;
            }
            if !m.rssi.is_finite() {
                result.warnings.push(RecordDefect::DroppedMeasurement {
                    device_id: record.id.clone(),
                    reason: format!("non-finite rssi from {}", m.sensor_id),
                });
                continue;
            }
            measurements.push(Measurement {
                anchor_id: m.sensor_id,
                rssi_dbm: m.rssi,
                distance_m: m.distance,
            });
        }

        result.accepted.push(Device {
            id: record.id,
            kind: record.kind,
            estimated,
            ground_truth,
            measurements,
        });
    }

    result
}

/// Screens a sensors snapshot into the anchor set.
pub fn screen_sensors(records: Vec<SensorRecord>) -> SensorScreenResult {
    let mut result = SensorScreenResult::default();

    for record in records {
        if record.id.is_empty() {
            result.rejected.push(RecordDefect::MissingSensorId);
            continue;
        }
        match record.position {
            Some(dto) if dto.is_finite() => result.accepted.push(Anchor {
                id: record.id,
                position: dto.to_point(),
            }),
            _ => result.rejected.push(RecordDefect::BadSensorPosition {
                sensor_id: record.id,
            }),
        }
    }

    result
}
