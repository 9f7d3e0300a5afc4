//! Simulated backend for development and testing
//!
//! Synthesizes RSSI readings from ground-truth geometry with the log-distance
//! path loss model, supports manual relocation, and can inject fetch failures
//! so the engine's failure paths are exercisable without a network.

use crate::backend::{
    BackendError, DeviceRecord, MeasurementRecord, PositionDto, PositionUpdate,
    PositioningBackend, RssiLogSample, RssiLogs, SensorRecord,
};
use crate::signal::PathLossModel;
use async_trait::async_trait;
use nalgebra::Point2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct SimDevice {
    id: String,
    kind: String,
    position: Point2<f64>,
}

#[derive(Debug)]
struct SimState {
    anchors: Vec<(String, Point2<f64>)>,
    devices: Vec<SimDevice>,
    rng: StdRng,
    logs: HashMap<String, RssiLogs>,
    clock_ms: u64,
    noise_dbm: f64,
    drift_m: f64,
    estimate_noise_m: f64,
    fail_devices: bool,
    fail_sensors: bool,
    update_count: u32,
}

/// In-process stand-in for the positioning backend
pub struct SimulatedBackend {
    model: PathLossModel,
    state: Mutex<SimState>,
}

impl SimulatedBackend {
    pub fn new(seed: u64) -> Self {
        Self {
            model: PathLossModel::default(),
            state: Mutex::new(SimState {
                anchors: Vec::new(),
                devices: Vec::new(),
                rng: StdRng::seed_from_u64(seed),
                logs: HashMap::new(),
                clock_ms: 0,
                noise_dbm: 0.0,
                drift_m: 0.0,
                estimate_noise_m: 0.0,
                fail_devices: false,
                fail_sensors: false,
                update_count: 0,
            }),
        }
    }

    /// A small ready-made floor: four corner anchors on a 20 m square and
    /// `num_devices` devices scattered inside, with realistic noise levels.
    pub fn demo(num_devices: usize, seed: u64) -> Self {
        let backend = Self::new(seed);
        backend.add_anchor("S1", 0.0, 0.0);
        backend.add_anchor("S2", 20.0, 0.0);
        backend.add_anchor("S3", 0.0, 20.0);
        backend.add_anchor("S4", 20.0, 20.0);

        {
            let mut state = backend.state.lock().unwrap();
            state.noise_dbm = 1.5;
            state.drift_m = 0.4;
            state.estimate_noise_m = 0.5;
            for i in 0..num_devices {
                let x = state.rng.gen_range(2.0..18.0);
                let y = state.rng.gen_range(2.0..18.0);
                state.devices.push(SimDevice {
                    id: format!("aa:bb:cc:00:00:{:02x}", i),
                    kind: "phone".to_string(),
                    position: Point2::new(x, y),
                });
            }
        }

        backend
    }

    pub fn add_anchor(&self, id: &str, x: f64, y: f64) {
        let mut state = self.state.lock().unwrap();
        state.anchors.push((id.to_string(), Point2::new(x, y)));
    }

    pub fn add_device(&self, id: &str, kind: &str, x: f64, y: f64) {
        let mut state = self.state.lock().unwrap();
        state.devices.push(SimDevice {
            id: id.to_string(),
            kind: kind.to_string(),
            position: Point2::new(x, y),
        });
    }

    /// Takes a device out of subsequent snapshots (it went offline)
    pub fn remove_device(&self, id: &str) {
        let mut state = self.state.lock().unwrap();
        state.devices.retain(|d| d.id != id);
    }

    /// Gaussian-ish jitter applied to every synthesized RSSI sample (dBm)
    pub fn set_noise_dbm(&self, noise: f64) {
        self.state.lock().unwrap().noise_dbm = noise;
    }

    /// Maximum random-walk step applied to ground truth per devices fetch (m)
    pub fn set_drift_m(&self, drift: f64) {
        self.state.lock().unwrap().drift_m = drift;
    }

    /// Jitter applied to the reported estimate around ground truth (m)
    pub fn set_estimate_noise_m(&self, noise: f64) {
        self.state.lock().unwrap().estimate_noise_m = noise;
    }

    pub fn set_fail_devices(&self, fail: bool) {
        self.state.lock().unwrap().fail_devices = fail;
    }

    pub fn set_fail_sensors(&self, fail: bool) {
        self.state.lock().unwrap().fail_sensors = fail;
    }

    /// Number of accepted position updates, for asserting no-call paths
    pub fn update_count(&self) -> u32 {
        self.state.lock().unwrap().update_count
    }

    pub fn ground_truth(&self, device_id: &str) -> Option<Point2<f64>> {
        let state = self.state.lock().unwrap();
        state
            .devices
            .iter()
            .find(|d| d.id == device_id)
            .map(|d| d.position)
    }
}

#[async_trait]
impl PositioningBackend for SimulatedBackend {
    async fn fetch_devices(&self) -> Result<Vec<DeviceRecord>, BackendError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_devices {
            return Err(BackendError::transport("simulated devices fetch failure"));
        }

        state.clock_ms += 1_000;
        let clock_ms = state.clock_ms;

        let SimState {
            anchors,
            devices,
            rng,
            logs,
            noise_dbm,
            drift_m,
            estimate_noise_m,
            ..
        } = &mut *state;

        let mut records = Vec::with_capacity(devices.len());
        for device in devices.iter_mut() {
            if *drift_m > 0.0 {
                device.position.x += rng.gen_range(-1.0..=1.0) * *drift_m;
                device.position.y += rng.gen_range(-1.0..=1.0) * *drift_m;
            }

            let mut measurements = Vec::with_capacity(anchors.len());
            for (anchor_id, anchor_pos) in anchors.iter() {
                let true_distance = nalgebra::distance(&device.position, anchor_pos).max(0.1);
                let rssi = self.model.rssi_at_distance(true_distance)
                    + rng.gen_range(-1.0..=1.0) * *noise_dbm;
                let distance = self.model.distance_from_rssi(rssi);

                logs.entry(device.id.clone())
                    .or_default()
                    .entry(anchor_id.clone())
                    .or_default()
                    .push(RssiLogSample {
                        timestamp_ms: clock_ms,
                        rssi,
                    });

                measurements.push(MeasurementRecord {
                    sensor_id: anchor_id.clone(),
                    rssi,
                    distance,
                });
            }

            let estimated = Point2::new(
                device.position.x + rng.gen_range(-1.0..=1.0) * *estimate_noise_m,
                device.position.y + rng.gen_range(-1.0..=1.0) * *estimate_noise_m,
            );

            records.push(DeviceRecord {
                id: device.id.clone(),
                position: Some(PositionDto::from_point(estimated)),
                real_position: Some(PositionDto::from_point(device.position)),
                kind: device.kind.clone(),
                measurements,
            });
        }

        Ok(records)
    }

    async fn fetch_sensors(&self) -> Result<Vec<SensorRecord>, BackendError> {
        let state = self.state.lock().unwrap();
        if state.fail_sensors {
            return Err(BackendError::transport("simulated sensors fetch failure"));
        }

        Ok(state
            .anchors
            .iter()
            .map(|(id, position)| SensorRecord {
                id: id.clone(),
                position: Some(PositionDto::from_point(*position)),
            })
            .collect())
    }

    async fn update_position(&self, update: PositionUpdate) -> Result<(), BackendError> {
        if !update.x.is_finite() || !update.y.is_finite() {
            return Err(BackendError::UpdateRejected {
                device_id: update.device_id,
                reason: "coordinates must be finite".to_string(),
            });
        }

        let mut state = self.state.lock().unwrap();
        let device = state
            .devices
            .iter_mut()
            .find(|d| d.id == update.device_id)
            .ok_or_else(|| BackendError::UnknownDevice(update.device_id.clone()))?;

        device.position = Point2::new(update.x, update.y);
        state.update_count += 1;
        Ok(())
    }

    async fn device_rssi_logs(&self, device_id: &str) -> Result<RssiLogs, BackendError> {
        let state = self.state.lock().unwrap();
        if !state.devices.iter().any(|d| d.id == device_id) {
            return Err(BackendError::UnknownDevice(device_id.to_string()));
        }
        Ok(state.logs.get(device_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn noiseless_backend() -> SimulatedBackend {
        let backend = SimulatedBackend::new(7);
        backend.add_anchor("S1", 0.0, 0.0);
        backend.add_anchor("S2", 10.0, 0.0);
        backend.add_device("dev-1", "phone", 5.0, 5.0);
        backend
    }

    #[tokio::test]
    async fn test_noiseless_distances_match_geometry() {
        let backend = noiseless_backend();
        let records = backend.fetch_devices().await.unwrap();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.kind, "phone");
        // Zero noise: the estimate equals ground truth
        assert_eq!(record.position, record.real_position);

        let expected = (5.0f64 * 5.0 + 5.0 * 5.0).sqrt();
        for m in &record.measurements {
            assert_relative_eq!(m.distance, expected, epsilon = 1e-9);
        }
    }

    #[tokio::test]
    async fn test_update_position_moves_ground_truth() {
        let backend = noiseless_backend();
        backend
            .update_position(PositionUpdate {
                device_id: "dev-1".to_string(),
                x: 1.0,
                y: 2.0,
            })
            .await
            .unwrap();

        assert_eq!(backend.ground_truth("dev-1").unwrap(), Point2::new(1.0, 2.0));
        assert_eq!(backend.update_count(), 1);

        let err = backend
            .update_position(PositionUpdate {
                device_id: "ghost".to_string(),
                x: 0.0,
                y: 0.0,
            })
            .await
            .unwrap_err();
        assert_eq!(err, BackendError::UnknownDevice("ghost".to_string()));
        assert_eq!(backend.update_count(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_injection() {
        let backend = noiseless_backend();
        backend.set_fail_devices(true);
        assert!(matches!(
            backend.fetch_devices().await,
            Err(BackendError::Transport(_))
        ));

        backend.set_fail_devices(false);
        backend.set_fail_sensors(true);
        assert!(backend.fetch_devices().await.is_ok());
        assert!(matches!(
            backend.fetch_sensors().await,
            Err(BackendError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_rssi_logs_accumulate_per_anchor() {
        let backend = noiseless_backend();
        backend.fetch_devices().await.unwrap();
        backend.fetch_devices().await.unwrap();

        let logs = backend.device_rssi_logs("dev-1").await.unwrap();
        assert_eq!(logs.len(), 2);
        for series in logs.values() {
            assert_eq!(series.len(), 2);
            assert!(series[0].timestamp_ms < series[1].timestamp_ms);
        }

        assert_eq!(
            backend.device_rssi_logs("ghost").await.unwrap_err(),
            BackendError::UnknownDevice("ghost".to_string())
        );
    }

    #[tokio::test]
    async fn test_same_seed_same_noise_sequence() {
        let a = SimulatedBackend::demo(3, 42);
        let b = SimulatedBackend::demo(3, 42);

        let ra = a.fetch_devices().await.unwrap();
        let rb = b.fetch_devices().await.unwrap();
        assert_eq!(ra, rb);
    }
}
