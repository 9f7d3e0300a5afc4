//! Backend collaborator contract
//!
//! The backend performs position estimation and signal simulation; this
//! crate only consumes its request/response surface. The trait keeps the
//! transport pluggable and the engine testable without a network.

pub mod sim;
pub mod types;

pub use sim::SimulatedBackend;
pub use types::{
    DeviceRecord, MeasurementRecord, PositionDto, PositionUpdate, RssiLogSample, RssiLogs,
    SensorRecord,
};

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a backend implementation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    /// Network or backend failure; the current cycle is abandoned and the
    /// next scheduled cycle retries.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The backend answered but the payload did not match the contract
    #[error("malformed backend payload: {0}")]
    Payload(String),
    #[error("unknown device {0}")]
    UnknownDevice(String),
    #[error("position update rejected for {device_id}: {reason}")]
    UpdateRejected { device_id: String, reason: String },
}

impl BackendError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn payload(msg: impl Into<String>) -> Self {
        Self::Payload(msg.into())
    }
}

/// Request/response surface of the positioning backend.
///
/// A successful [`update_position`](Self::update_position) implies the
/// backend has recomputed the device's estimate and measurements, observable
/// on the next [`fetch_devices`](Self::fetch_devices).
#[async_trait]
pub trait PositioningBackend: Send + Sync {
    /// All devices with their current estimates and latest measurements
    async fn fetch_devices(&self) -> Result<Vec<DeviceRecord>, BackendError>;

    /// All sensors (anchors) with their fixed positions
    async fn fetch_sensors(&self) -> Result<Vec<SensorRecord>, BackendError>;

    /// Manually relocates a device's ground truth
    async fn update_position(&self, update: PositionUpdate) -> Result<(), BackendError>;

    /// Server-owned signal history for one device, keyed by anchor id.
    /// Displayed as-is, never reconciled client-side.
    async fn device_rssi_logs(&self, device_id: &str) -> Result<RssiLogs, BackendError>;
}

#[async_trait]
impl<B: PositioningBackend + ?Sized> PositioningBackend for std::sync::Arc<B> {
    async fn fetch_devices(&self) -> Result<Vec<DeviceRecord>, BackendError> {
        (**self).fetch_devices().await
    }

    async fn fetch_sensors(&self) -> Result<Vec<SensorRecord>, BackendError> {
        (**self).fetch_sensors().await
    }

    async fn update_position(&self, update: PositionUpdate) -> Result<(), BackendError> {
        (**self).update_position(update).await
    }

    async fn device_rssi_logs(&self, device_id: &str) -> Result<RssiLogs, BackendError> {
        (**self).device_rssi_logs(device_id).await
    }
}
