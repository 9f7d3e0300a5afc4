//! Wire types mirroring the backend JSON contract

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 2D position as serialized by the backend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionDto {
    pub x: f64,
    pub y: f64,
}

impl PositionDto {
    pub fn to_point(self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    pub fn from_point(point: Point2<f64>) -> Self {
        Self {
            x: point.x,
            y: point.y,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// One sensor reading attached to a device record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub sensor_id: String,
    /// Received signal strength (dBm)
    pub rssi: f64,
    /// Backend-derived distance estimate (meters)
    pub distance: f64,
}

fn default_kind() -> String {
    "unknown".to_string()
}

/// A device as returned by `GET devices`.
///
/// Fields default individually so that one incomplete record degrades to a
/// screening rejection instead of failing the whole payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub position: Option<PositionDto>,
    #[serde(default)]
    pub real_position: Option<PositionDto>,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub measurements: Vec<MeasurementRecord>,
}

/// A sensor (anchor) as returned by `GET sensors`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub position: Option<PositionDto>,
}

/// Body of `POST update_position`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub device_id: String,
    pub x: f64,
    pub y: f64,
}

/// One sample of the server-owned signal log
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RssiLogSample {
    pub timestamp_ms: u64,
    pub rssi: f64,
}

/// Signal log series per anchor for one device
pub type RssiLogs = HashMap<String, Vec<RssiLogSample>>;
