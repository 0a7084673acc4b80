//! Clockwork - a physics-driven watchface
//!
//! Core modules:
//! - `clock`: Wall-clock / override time and digit dissection
//! - `sim`: Deterministic particle simulation (pools, layouts, forces, stages)
//! - `renderer`: Render sink boundary and the browser canvas sink
//! - `settings`: Data-driven configuration and presets
//! - `error`: Error taxonomy

pub mod clock;
pub mod error;
pub mod renderer;
pub mod settings;
pub mod sim;

pub use error::{Result, SimError};
pub use settings::{Preset, SimConfig};

use glam::Vec2;

/// Simulation constants and defaults
pub mod consts {
    /// Fixed simulation timestep (60 Hz, one step per animation frame)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Logical clock tick period (digits are recomputed once per second)
    pub const CLOCK_TICK_SECS: f32 = 1.0;

    /// Default watch face dimensions
    pub const FACE_WIDTH: f32 = 396.0;
    pub const FACE_HEIGHT: f32 = 484.0;

    /// Life a freed particle starts with, and how much it loses per step
    pub const FREED_LIFE: f32 = 255.0;
    pub const FREED_LIFE_DECAY: f32 = 3.0;

    /// Distance at which a seeking particle counts as having reached its target
    pub const CAPTURE_DISTANCE: f32 = 12.0;

    /// Orbit speed (control variable) defaults
    pub const ORBIT_SPEED_BASELINE: f32 = 0.002;
    pub const ORBIT_SPEED_INITIAL: f32 = 0.019;
    pub const ORBIT_SPEED_STEP: f32 = 0.0003;
    pub const ORBIT_SPEED_MAX: f32 = 0.18;
    pub const AGITATED_THRESHOLD: f32 = 0.10;
    pub const BREAKAWAY_THRESHOLD: f32 = 0.15;

    /// Maximum visual sparks alive at once
    pub const MAX_SPARKS: usize = 256;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Convert cartesian (x, y) to polar (r, theta)
#[inline]
pub fn cartesian_to_polar(pos: Vec2) -> (f32, f32) {
    (pos.length(), pos.y.atan2(pos.x))
}

/// Axis-aligned bounds of the watch face
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Center point of the face
    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// True when `pos` lies inside the face grown by `margin` on every side
    pub fn contains_with_margin(&self, pos: Vec2, margin: f32) -> bool {
        pos.x >= -margin
            && pos.x <= self.width + margin
            && pos.y >= -margin
            && pos.y <= self.height + margin
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(consts::FACE_WIDTH, consts::FACE_HEIGHT)
    }
}
