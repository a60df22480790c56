//! Core units, constants, and shared primitives for the powered-descent workspace.

pub mod buffer;

pub use buffer::{NodeBuffer, ShapeError};

/// Physical constants expressed in SI units.
pub mod constants {
    /// Standard gravity used to convert specific impulse into exhaust velocity (m/s²).
    pub const G0: f64 = 9.80665;
    /// Surface gravitational acceleration assumed by the default vehicle (m/s²).
    pub const SURFACE_GRAVITY: f64 = 9.81;
}

/// Basic unit conversion helpers.
pub mod units {
    /// Convert degrees to radians.
    #[inline]
    pub fn deg_to_rad(v: f64) -> f64 {
        v.to_radians()
    }

    /// Convert radians to degrees.
    #[inline]
    pub fn rad_to_deg(v: f64) -> f64 {
        v.to_degrees()
    }
}

/// Small helpers for planar vectors stored as `[x, y]`.
pub mod planar {
    /// Euclidean norm of a planar vector.
    #[inline]
    pub fn norm(x: f64, y: f64) -> f64 {
        x.hypot(y)
    }

    /// Distance between two planar points.
    #[inline]
    pub fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
        norm(a[0] - b[0], a[1] - b[1])
    }
}
