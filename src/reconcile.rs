//! Merges freshly polled snapshots into the tracked world
//!
//! Snapshots arrive as brand-new objects each cycle and carry no memory of
//! history; continuity lives in the [`HistoryStore`], which is keyed by
//! device id, so carrying history forward is a lookup rather than a copy.

use crate::core::Device;
use crate::history::{CandidateEntry, HistoryStore};
use std::collections::HashSet;

/// Summary of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// History entries stored this pass (including seeds)
    pub appended: usize,
    /// Devices seen for the first time that received entry 0 immediately
    pub seeded: usize,
    /// Devices present previously but absent from this snapshot
    pub departed: usize,
}

/// Produces the new authoritative device list from a screened snapshot.
///
/// Every snapshot device with at least one known position gets a candidate
/// entry appended (the store collapses consecutive duplicates). A device not
/// present in `previous` is seeded on sight, so its path is visible from the
/// first poll that knows its position rather than the second. Devices absent
/// from the snapshot leave the live set; their history stays in the store
/// until [`HistoryStore::prune_unseen`] is invoked.
pub fn reconcile_devices(
    previous: &[Device],
    snapshot: Vec<Device>,
    store: &mut HistoryStore,
) -> (Vec<Device>, ReconcileOutcome) {
    let previous_ids: HashSet<&str> = previous.iter().map(|d| d.id.as_str()).collect();
    let mut outcome = ReconcileOutcome::default();

    for device in &snapshot {
        if device.estimated.is_none() && device.ground_truth.is_none() {
            // Nothing position-bearing to record this cycle
            continue;
        }

        let candidate = CandidateEntry {
            estimated: device.estimated,
            ground_truth: device.ground_truth,
            signal_snapshot: device.signal_snapshot(),
        };

        if store.append(&device.id, candidate) {
            outcome.appended += 1;
            let first_seen = !previous_ids.contains(device.id.as_str())
                && store.history_for(&device.id).len() == 1;
            if first_seen {
                outcome.seeded += 1;
            }
        }
    }

    let current_ids: HashSet<&str> = snapshot.iter().map(|d| d.id.as_str()).collect();
    outcome.departed = previous
        .iter()
        .filter(|d| !current_ids.contains(d.id.as_str()))
        .count();

    (snapshot, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DeviceRecord, PositionDto};
    use crate::core::Measurement;
    use crate::validation::screen_devices;
    use nalgebra::Point2;

    fn device(id: &str, est: Option<(f64, f64)>, real: Option<(f64, f64)>) -> Device {
        Device {
            id: id.to_string(),
            kind: "unknown".to_string(),
            estimated: est.map(|(x, y)| Point2::new(x, y)),
            ground_truth: real.map(|(x, y)| Point2::new(x, y)),
            measurements: vec![],
        }
    }

    #[test]
    fn test_first_seen_device_is_seeded_immediately() {
        let mut store = HistoryStore::new();
        let snapshot = vec![device("d1", Some((5.0, 5.0)), Some((5.0, 5.0)))];

        let (devices, outcome) = reconcile_devices(&[], snapshot, &mut store);

        assert_eq!(devices.len(), 1);
        assert_eq!(outcome.seeded, 1);
        assert_eq!(outcome.appended, 1);
        // One path point exists after the very first poll
        let history = store.history_for("d1");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].sequence_index, 0);
    }

    #[test]
    fn test_device_without_any_position_is_not_seeded() {
        let mut store = HistoryStore::new();
        let snapshot = vec![device("d1", None, None)];

        let (devices, outcome) = reconcile_devices(&[], snapshot, &mut store);

        assert_eq!(devices.len(), 1);
        assert_eq!(outcome.appended, 0);
        assert!(store.history_for("d1").is_empty());
    }

    #[test]
    fn test_stationary_device_history_does_not_grow() {
        let mut store = HistoryStore::new();
        let poll = || vec![device("d1", Some((5.0, 5.0)), Some((5.0, 5.0)))];

        let (live, _) = reconcile_devices(&[], poll(), &mut store);
        let (live, outcome) = reconcile_devices(&live, poll(), &mut store);
        assert_eq!(outcome.appended, 0);
        assert_eq!(store.history_for("d1").len(), 1);

        // Third poll moves the estimate: a second entry appears
        let moved = vec![device("d1", Some((6.0, 5.0)), Some((5.0, 5.0)))];
        let (_, outcome) = reconcile_devices(&live, moved, &mut store);
        assert_eq!(outcome.appended, 1);

        let history = store.history_for("d1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].sequence_index, 1);
    }

    #[test]
    fn test_departed_devices_leave_live_set_but_keep_history() {
        let mut store = HistoryStore::new();
        let first = vec![
            device("d1", Some((1.0, 1.0)), None),
            device("d2", Some((2.0, 2.0)), None),
        ];
        let (live, _) = reconcile_devices(&[], first, &mut store);

        let second = vec![device("d1", Some((1.5, 1.0)), None)];
        let (live, outcome) = reconcile_devices(&live, second, &mut store);

        assert_eq!(live.len(), 1);
        assert_eq!(outcome.departed, 1);
        assert_eq!(store.history_for("d2").len(), 1);
    }

    #[test]
    fn test_returning_device_continues_its_history() {
        let mut store = HistoryStore::new();
        let (live, _) =
            reconcile_devices(&[], vec![device("d1", Some((1.0, 1.0)), None)], &mut store);
        // Device vanishes for a cycle
        let (live, _) = reconcile_devices(&live, vec![], &mut store);
        assert!(live.is_empty());
        // ...and returns somewhere else: not re-seeded at index 0
        let (_, outcome) =
            reconcile_devices(&live, vec![device("d1", Some((3.0, 1.0)), None)], &mut store);

        assert_eq!(outcome.seeded, 0);
        let history = store.history_for("d1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].sequence_index, 1);
    }

    #[test]
    fn test_malformed_record_is_isolated_from_the_batch() {
        let records = vec![
            DeviceRecord {
                id: "good-1".to_string(),
                position: Some(PositionDto { x: 1.0, y: 1.0 }),
                real_position: None,
                kind: "unknown".to_string(),
                measurements: vec![],
            },
            DeviceRecord {
                id: "bad".to_string(),
                position: Some(PositionDto {
                    x: f64::NAN,
                    y: 2.0,
                }),
                real_position: None,
                kind: "unknown".to_string(),
                measurements: vec![],
            },
            DeviceRecord {
                id: "good-2".to_string(),
                position: Some(PositionDto { x: 3.0, y: 3.0 }),
                real_position: None,
                kind: "unknown".to_string(),
                measurements: vec![],
            },
        ];

        let mut store = HistoryStore::new();
        let screened = screen_devices(records);
        let (live, _) = reconcile_devices(&[], screened.accepted, &mut store);

        assert_eq!(live.len(), 2);
        assert!(store.history_for("bad").is_empty());
        assert_eq!(store.device_count(), 2);
    }

    #[test]
    fn test_two_anchor_scenario_across_three_polls() {
        let measurements = vec![
            Measurement {
                anchor_id: "A1".to_string(),
                rssi_dbm: -48.0,
                distance_m: 5.0,
            },
            Measurement {
                anchor_id: "A2".to_string(),
                rssi_dbm: -48.0,
                distance_m: 5.0,
            },
        ];
        let poll = |x: f64| {
            vec![Device {
                id: "D1".to_string(),
                kind: "unknown".to_string(),
                estimated: Some(Point2::new(x, 5.0)),
                ground_truth: None,
                measurements: measurements.clone(),
            }]
        };

        let mut store = HistoryStore::new();
        let (live, _) = reconcile_devices(&[], poll(5.0), &mut store);
        assert_eq!(store.history_for("D1").len(), 1);

        let (live, _) = reconcile_devices(&live, poll(5.0), &mut store);
        assert_eq!(store.history_for("D1").len(), 1);

        let (_, _) = reconcile_devices(&live, poll(6.0), &mut store);
        let history = store.history_for("D1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].sequence_index, 1);
        assert_eq!(history[1].signal_snapshot.len(), 2);
    }
}
