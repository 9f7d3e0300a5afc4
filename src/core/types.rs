//! Domain types shared across the tracking engine

use nalgebra::Point2;
use serde::Serialize;
use std::collections::HashMap;

/// Fixed reference point with a known position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anchor {
    pub id: String,
    /// Position in meters
    pub position: Point2<f64>,
}

/// One anchor-to-device reading from the latest poll
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub anchor_id: String,
    /// Received signal strength (dBm)
    pub rssi_dbm: f64,
    /// Distance derived by the backend from the signal strength (meters)
    pub distance_m: f64,
}

/// A tracked mobile device as of the latest reconciled snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    pub id: String,
    /// Free-form device classification, "unknown" when the backend omits it
    pub kind: String,
    /// Backend-estimated position, absent when estimation failed this cycle
    pub estimated: Option<Point2<f64>>,
    /// Ground-truth position, absent when the backend has none
    pub ground_truth: Option<Point2<f64>>,
    /// Unique-by-anchor readings, overwritten each poll
    pub measurements: Vec<Measurement>,
}

impl Device {
    pub fn measurement_for(&self, anchor_id: &str) -> Option<&Measurement> {
        self.measurements.iter().find(|m| m.anchor_id == anchor_id)
    }

    /// Signal snapshot keyed by anchor id, as stored in history entries
    pub fn signal_snapshot(&self) -> HashMap<String, f64> {
        self.measurements
            .iter()
            .map(|m| (m.anchor_id.clone(), m.rssi_dbm))
            .collect()
    }
}

/// The anchor set of the current session, keyed by id for measurement resolution
#[derive(Debug, Clone, Default)]
pub struct AnchorSet {
    anchors: HashMap<String, Anchor>,
}

impl AnchorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_anchors(anchors: impl IntoIterator<Item = Anchor>) -> Self {
        Self {
            anchors: anchors
                .into_iter()
                .map(|a| (a.id.clone(), a))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Anchor> {
        self.anchors.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Anchor> {
        self.anchors.values()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}
