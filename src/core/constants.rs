//! System parameters and signal-model constants

/// Default interval between poll cycles (seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Segment count for distance rings in the detail overlay
pub const RING_SEGMENTS: usize = 100;

/// Segment count for low-resolution decorative rings (map highlight)
pub const DECORATIVE_RING_SEGMENTS: usize = 50;

/// Radius of the selection highlight ring on the map view (meters)
pub const HIGHLIGHT_RING_RADIUS_M: f64 = 1.5;

/// Minimum viewport padding applied on each axis (meters)
pub const MIN_VIEWPORT_PADDING_M: f64 = 2.0;

/// Fraction of the axis range added as padding on each side
pub const VIEWPORT_PADDING_FRACTION: f64 = 0.15;

/// Half extent of the fallback viewport when no finite points exist (meters)
pub const DEFAULT_VIEWPORT_HALF_EXTENT_M: f64 = 10.0;

/// Reference received power at 1 m for the log-distance path loss model (dBm)
pub const REFERENCE_POWER_DBM: f64 = -32.0;

/// Path loss exponent for indoor propagation
pub const PATH_LOSS_EXPONENT: f64 = 2.3;
