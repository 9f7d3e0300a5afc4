//! Append-only per-device position history with duplicate collapsing

use nalgebra::Point2;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// One retained snapshot of a device's position and signal state.
///
/// Entries are owned exclusively by the [`HistoryStore`]; they are appended,
/// never mutated or removed (except by the optional capacity cap).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    /// Strictly increasing per device, no gaps
    pub sequence_index: u64,
    pub estimated: Option<Point2<f64>>,
    pub ground_truth: Option<Point2<f64>>,
    /// Anchor id → signal strength (dBm) at the time the entry was taken
    pub signal_snapshot: HashMap<String, f64>,
}

/// A not-yet-stored entry computed from a fresh snapshot
#[derive(Debug, Clone)]
pub struct CandidateEntry {
    pub estimated: Option<Point2<f64>>,
    pub ground_truth: Option<Point2<f64>>,
    pub signal_snapshot: HashMap<String, f64>,
}

fn positions_match(a: Option<Point2<f64>>, b: Option<Point2<f64>>, tolerance: f64) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => (a.x - b.x).abs() <= tolerance && (a.y - b.y).abs() <= tolerance,
        _ => false,
    }
}

/// Owns the append-only history sequences, keyed by device id.
///
/// With `tolerance` 0.0 the duplicate check is exact floating-point equality
/// on both coordinates; a positive tolerance also collapses near-duplicates.
/// `capacity` bounds each device's retained history (oldest entries evicted
/// first); `None` retains everything for the process lifetime.
#[derive(Debug, Default)]
pub struct HistoryStore {
    histories: HashMap<String, Vec<HistoryEntry>>,
    capacity: Option<usize>,
    tolerance: f64,
}

impl HistoryStore {
    /// Unbounded store with exact duplicate comparison
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(capacity: Option<usize>, tolerance: f64) -> Self {
        Self {
            histories: HashMap::new(),
            capacity,
            tolerance,
        }
    }

    /// Appends `candidate` for `device_id` unless both of its positions match
    /// the most recent stored entry's. Returns whether an entry was stored.
    ///
    /// The signal snapshot rides with position changes only: a snapshot that
    /// changes while both positions hold still does not create an entry.
    pub fn append(&mut self, device_id: &str, candidate: CandidateEntry) -> bool {
        let history = self.histories.entry(device_id.to_string()).or_default();

        let next_index = match history.last() {
            Some(last) => {
                let unchanged = positions_match(last.estimated, candidate.estimated, self.tolerance)
                    && positions_match(last.ground_truth, candidate.ground_truth, self.tolerance);
                if unchanged {
                    return false;
                }
                last.sequence_index + 1
            }
            None => 0,
        };

        history.push(HistoryEntry {
            sequence_index: next_index,
            estimated: candidate.estimated,
            ground_truth: candidate.ground_truth,
            signal_snapshot: candidate.signal_snapshot,
        });

        if let Some(capacity) = self.capacity {
            if history.len() > capacity {
                let excess = history.len() - capacity;
                history.drain(..excess);
            }
        }

        true
    }

    /// Ordered history for a device; empty for unknown ids
    pub fn history_for(&self, device_id: &str) -> &[HistoryEntry] {
        self.histories
            .get(device_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of devices with at least one retained entry
    pub fn device_count(&self) -> usize {
        self.histories.len()
    }

    /// Drops history for devices not present in the latest snapshot, to bound
    /// memory in long-running deployments.
    pub fn prune_unseen(&mut self, current_device_ids: &HashSet<String>) {
        self.histories
            .retain(|id, _| current_device_ids.contains(id));
    }
}
