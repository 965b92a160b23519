use std::f64::consts::PI;

pub mod model;

pub use model::{Category, CategoryName, Glyph, Wheel, WheelError, resolve_category, segment_index};

pub const FULL_TURN: f64 = 2.0 * PI;
pub const POINTER_ANGLE: f64 = PI / 2.0; // pointer sits at the top of the wheel
pub const MIN_TURNS: f64 = 3.0;
pub const MAX_TURNS: f64 = 6.0;
pub const SPIN_DURATION_MS: u64 = 3000;

// Positions this close to a segment boundary (in segments) count as on it.
pub const BOUNDARY_EPSILON: f64 = 1e-12;
