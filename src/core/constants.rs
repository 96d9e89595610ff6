//! Physical constants and numerical thresholds

/// Speed of light in vacuum (m/s), for time-of-flight to range conversion
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Distances below this are treated as degenerate geometry
pub const DEGENERATE_DISTANCE: f64 = 1e-12;

/// Determinants below this magnitude are treated as singular
pub const SINGULAR_DET: f64 = 1e-12;

/// MAD-to-standard-deviation consistency factor for Gaussian data
pub const MAD_CONSISTENCY: f64 = 0.6745;
