//! Indoor Device Tracking Engine
//!
//! Tracks moving wireless devices from periodic distance-to-anchor snapshots:
//! polls a positioning backend, merges each snapshot into append-only
//! per-device histories, and derives the geometric overlays (distance rings,
//! viewport framing) used to visualize the estimates.

pub mod backend;
pub mod config;
pub mod core;
pub mod geometry;
pub mod history;
pub mod overlay;
pub mod reconcile;
pub mod signal;
pub mod tracker;
pub mod validation;

// Re-export commonly used types
pub use backend::{BackendError, PositioningBackend, SimulatedBackend};
pub use config::{ConfigError, TrackerConfig};
pub use core::{Anchor, AnchorSet, Device, Measurement};
pub use geometry::{bounding_box, bounding_box_with_padding, circle_points, Viewport};
pub use history::{CandidateEntry, HistoryEntry, HistoryStore};
pub use overlay::{project_device, project_map, OverlayPrimitive, OverlayProjection};
pub use reconcile::{reconcile_devices, ReconcileOutcome};
pub use signal::PathLossModel;
pub use tracker::{CycleSummary, Tracker, TrackerError, TrackerHandle};
pub use validation::{screen_devices, screen_sensors, RecordDefect};
