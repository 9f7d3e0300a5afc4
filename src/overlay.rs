//! Overlay projection: renderable primitives plus a stable viewport
//!
//! Output is plain data; rendering technology is a consumer concern.

use crate::core::{
    Anchor, AnchorSet, Device, Measurement, DECORATIVE_RING_SEGMENTS, HIGHLIGHT_RING_RADIUS_M,
};
use crate::geometry::{bounding_box, circle_points, Viewport};
use nalgebra::Point2;
use serde::Serialize;

/// One renderable shape of a projection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum OverlayPrimitive {
    AnchorMarker {
        anchor_id: String,
        position: Point2<f64>,
    },
    /// Ring of possible device positions around an anchor at the derived
    /// distance. Hue cycles by ring index for legend/color assignment.
    DistanceRing {
        anchor_id: String,
        hue_deg: f64,
        points: Vec<Point2<f64>>,
    },
    DeviceMarker {
        device_id: String,
        position: Point2<f64>,
    },
    EstimateMarker {
        position: Point2<f64>,
    },
    GroundTruthMarker {
        position: Point2<f64>,
    },
    /// Low-resolution decorative ring around the selected device on the map
    HighlightRing {
        device_id: String,
        points: Vec<Point2<f64>>,
    },
}

/// Primitive set and viewport for one rendered view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayProjection {
    pub primitives: Vec<OverlayPrimitive>,
    pub viewport: Viewport,
}

fn is_finite(p: &Point2<f64>) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

fn collect_finite_points(primitives: &[OverlayPrimitive]) -> Vec<Point2<f64>> {
    let mut points = Vec::new();
    for primitive in primitives {
        match primitive {
            OverlayPrimitive::AnchorMarker { position, .. }
            | OverlayPrimitive::DeviceMarker { position, .. }
            | OverlayPrimitive::EstimateMarker { position }
            | OverlayPrimitive::GroundTruthMarker { position } => {
                if is_finite(position) {
                    points.push(*position);
                }
            }
            OverlayPrimitive::DistanceRing { points: ring, .. }
            | OverlayPrimitive::HighlightRing { points: ring, .. } => {
                points.extend(ring.iter().filter(|p| is_finite(p)).copied());
            }
        }
    }
    points
}

/// Detail-view projection for one device: an anchor marker and distance ring
/// per resolvable measurement, then the estimate and ground-truth markers.
///
/// Measurements whose anchor is unknown or whose derived distance is not a
/// finite non-negative number are skipped silently; a sensor may simply not
/// have produced a valid reading this cycle.
pub fn project_device(
    device: &Device,
    anchors: &AnchorSet,
    ring_segments: usize,
) -> OverlayProjection {
    let resolved: Vec<(&Measurement, &Anchor)> = device
        .measurements
        .iter()
        .filter_map(|m| anchors.get(&m.anchor_id).map(|a| (m, a)))
        .filter(|(m, _)| m.distance_m.is_finite() && m.distance_m >= 0.0)
        .collect();

    let ring_count = resolved.len();
    let mut primitives = Vec::with_capacity(2 * ring_count + 2);

    for (idx, (measurement, anchor)) in resolved.into_iter().enumerate() {
        primitives.push(OverlayPrimitive::AnchorMarker {
            anchor_id: anchor.id.clone(),
            position: anchor.position,
        });
        primitives.push(OverlayPrimitive::DistanceRing {
            anchor_id: anchor.id.clone(),
            hue_deg: idx as f64 * 360.0 / ring_count as f64,
            points: circle_points(anchor.position, measurement.distance_m, ring_segments),
        });
    }

    if let Some(position) = device.estimated.filter(is_finite) {
        primitives.push(OverlayPrimitive::EstimateMarker { position });
    }
    if let Some(position) = device.ground_truth.filter(is_finite) {
        primitives.push(OverlayPrimitive::GroundTruthMarker { position });
    }

    let viewport = bounding_box(&collect_finite_points(&primitives));
    OverlayProjection {
        primitives,
        viewport,
    }
}

/// Map-view projection of the whole fleet: every anchor and every device
/// with a finite estimate, plus a decorative highlight ring around the
/// optionally selected device. Anchors are emitted in id order so the
/// projection is identical for identical inputs.
pub fn project_map(
    devices: &[Device],
    anchors: &AnchorSet,
    highlight: Option<&str>,
) -> OverlayProjection {
    let mut sorted_anchors: Vec<&Anchor> = anchors.iter().collect();
    sorted_anchors.sort_by(|a, b| a.id.cmp(&b.id));

    let mut primitives = Vec::with_capacity(sorted_anchors.len() + devices.len() + 1);
    for anchor in sorted_anchors {
        primitives.push(OverlayPrimitive::AnchorMarker {
            anchor_id: anchor.id.clone(),
            position: anchor.position,
        });
    }

    for device in devices {
        if let Some(position) = device.estimated.filter(is_finite) {
            primitives.push(OverlayPrimitive::DeviceMarker {
                device_id: device.id.clone(),
                position,
            });
            if highlight == Some(device.id.as_str()) {
                primitives.push(OverlayPrimitive::HighlightRing {
                    device_id: device.id.clone(),
                    points: circle_points(
                        position,
                        HIGHLIGHT_RING_RADIUS_M,
                        DECORATIVE_RING_SEGMENTS,
                    ),
                });
            }
        }
    }

    let viewport = bounding_box(&collect_finite_points(&primitives));
    OverlayProjection {
        primitives,
        viewport,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RING_SEGMENTS;

    fn anchors() -> AnchorSet {
        AnchorSet::from_anchors(vec![
            Anchor {
                id: "A1".to_string(),
                position: Point2::new(0.0, 0.0),
            },
            Anchor {
                id: "A2".to_string(),
                position: Point2::new(10.0, 0.0),
            },
        ])
    }

    fn scenario_device() -> Device {
        Device {
            id: "D1".to_string(),
            kind: "unknown".to_string(),
            estimated: Some(Point2::new(5.0, 5.0)),
            ground_truth: Some(Point2::new(5.2, 4.8)),
            measurements: vec![
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
            ],
        }
    }

    #[test]
    fn test_detail_projection_emits_expected_primitives() {
        let projection = project_device(&scenario_device(), &anchors(), RING_SEGMENTS);

        // Two (marker, ring) pairs plus estimate and ground-truth markers
        assert_eq!(projection.primitives.len(), 6);

        let rings: Vec<_> = projection
            .primitives
            .iter()
            .filter_map(|p| match p {
                OverlayPrimitive::DistanceRing {
                    hue_deg, points, ..
                } => Some((*hue_deg, points.len())),
                _ => None,
            })
            .collect();
        assert_eq!(rings.len(), 2);
        assert_eq!(rings[0], (0.0, RING_SEGMENTS));
        assert_eq!(rings[1], (180.0, RING_SEGMENTS));

        // The viewport frames every emitted point, rings included
        assert!(projection.viewport.x_min < -5.0);
        assert!(projection.viewport.x_max > 15.0);
        assert!(projection.viewport.y_min < -5.0);
        assert!(projection.viewport.y_max > 5.0);
    }

    #[test]
    fn test_unknown_anchor_reference_is_skipped_silently() {
        let mut device = scenario_device();
        device.measurements.push(Measurement {
            anchor_id: "A9".to_string(),
            rssi_dbm: -60.0,
            distance_m: 12.0,
        });

        let projection = project_device(&device, &anchors(), RING_SEGMENTS);
        assert_eq!(projection.primitives.len(), 6);
    }

    #[test]
    fn test_invalid_distances_are_skipped() {
        let mut device = scenario_device();
        device.measurements[0].distance_m = f64::NAN;
        device.measurements[1].distance_m = -3.0;

        let projection = project_device(&device, &anchors(), RING_SEGMENTS);
        // Only the two position markers survive
        assert_eq!(projection.primitives.len(), 2);
    }

    #[test]
    fn test_markers_skipped_when_positions_absent() {
        let device = Device {
            id: "D1".to_string(),
            kind: "unknown".to_string(),
            estimated: None,
            ground_truth: None,
            measurements: vec![],
        };

        let projection = project_device(&device, &anchors(), RING_SEGMENTS);
        assert!(projection.primitives.is_empty());
        assert_eq!(projection.viewport, Viewport::default_box());
    }

    #[test]
    fn test_projection_is_deterministic() {
        let device = scenario_device();
        let a = project_device(&device, &anchors(), RING_SEGMENTS);
        let b = project_device(&device, &anchors(), RING_SEGMENTS);
        assert_eq!(a, b);
    }

    #[test]
    fn test_map_projection_with_highlight() {
        let devices = vec![
            scenario_device(),
            Device {
                id: "D2".to_string(),
                kind: "unknown".to_string(),
                estimated: Some(Point2::new(1.0, 1.0)),
                ground_truth: None,
                measurements: vec![],
            },
        ];

        let projection = project_map(&devices, &anchors(), Some("D2"));

        // 2 anchors + 2 device markers + 1 highlight ring
        assert_eq!(projection.primitives.len(), 5);
        let ring = projection
            .primitives
            .iter()
            .find_map(|p| match p {
                OverlayPrimitive::HighlightRing { device_id, points } => {
                    Some((device_id.clone(), points.len()))
                }
                _ => None,
            })
            .unwrap();
        assert_eq!(ring, ("D2".to_string(), DECORATIVE_RING_SEGMENTS));

        // Anchor markers come first, ordered by id
        match (&projection.primitives[0], &projection.primitives[1]) {
            (
                OverlayPrimitive::AnchorMarker { anchor_id: a, .. },
                OverlayPrimitive::AnchorMarker { anchor_id: b, .. },
            ) => {
                assert_eq!(a, "A1");
                assert_eq!(b, "A2");
            }
            other => panic!("unexpected leading primitives: {:?}", other),
        }

        let again = project_map(&devices, &anchors(), Some("D2"));
        assert_eq!(projection, again);
    }
}
