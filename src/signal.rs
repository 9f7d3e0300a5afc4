//! RSSI-to-distance conversion using the log-distance path loss model

use crate::core::{PATH_LOSS_EXPONENT, REFERENCE_POWER_DBM};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by path loss model calibration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    #[error("calibration needs at least 2 samples, got {available}")]
    NotEnoughSamples { available: usize },
    #[error("calibration distance must be positive, got {distance}")]
    NonPositiveDistance { distance: f64 },
    #[error("calibration samples span no distance range")]
    DegenerateSamples,
}

/// Log-distance path loss model relating received power to distance.
///
/// `rssi = reference_power_dbm - 10 · path_loss_exponent · log10(d)`,
/// so `d = 10^((reference_power_dbm - rssi) / (10 · path_loss_exponent))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathLossModel {
    /// Received power at the 1 m reference distance (dBm)
    pub reference_power_dbm: f64,
    /// Environment-dependent attenuation exponent
    pub path_loss_exponent: f64,
}

impl Default for PathLossModel {
    fn default() -> Self {
        Self {
            reference_power_dbm: REFERENCE_POWER_DBM,
            path_loss_exponent: PATH_LOSS_EXPONENT,
        }
    }
}

impl PathLossModel {
    pub fn new(reference_power_dbm: f64, path_loss_exponent: f64) -> Self {
        Self {
            reference_power_dbm,
            path_loss_exponent,
        }
    }

    /// Estimated distance in meters for a received signal strength in dBm
    pub fn distance_from_rssi(&self, rssi_dbm: f64) -> f64 {
        10f64.powf((self.reference_power_dbm - rssi_dbm) / (10.0 * self.path_loss_exponent))
    }

    /// Expected signal strength in dBm at the given distance in meters
    pub fn rssi_at_distance(&self, distance_m: f64) -> f64 {
        self.reference_power_dbm - 10.0 * self.path_loss_exponent * distance_m.log10()
    }

    /// Refits both model parameters from (distance, rssi) sample pairs by
    /// least squares over `rssi` vs `log10(distance)`.
    pub fn calibrate(&mut self, samples: &[(f64, f64)]) -> Result<(), SignalError> {
        if samples.len() < 2 {
            return Err(SignalError::NotEnoughSamples {
                available: samples.len(),
            });
        }
        for &(distance, _) in samples {
            if distance <= 0.0 || !distance.is_finite() {
                return Err(SignalError::NonPositiveDistance { distance });
            }
        }

        let n = samples.len() as f64;
        let xs: Vec<f64> = samples.iter().map(|&(d, _)| d.log10()).collect();
        let ys: Vec<f64> = samples.iter().map(|&(_, r)| r).collect();

        let x_mean = xs.iter().sum::<f64>() / n;
        let y_mean = ys.iter().sum::<f64>() / n;

        let mut covariance = 0.0;
        let mut variance = 0.0;
        for (x, y) in xs.iter().zip(ys.iter()) {
            covariance += (x - x_mean) * (y - y_mean);
            variance += (x - x_mean) * (x - x_mean);
        }

        if variance.abs() < 1e-12 {
            return Err(SignalError::DegenerateSamples);
        }

        let slope = covariance / variance;
        self.path_loss_exponent = -slope / 10.0;
        self.reference_power_dbm = y_mean - slope * x_mean;

        Ok(())
    }
}
